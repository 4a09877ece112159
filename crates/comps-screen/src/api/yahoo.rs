//! Yahoo Finance API client
//!
//! Talks to three Yahoo endpoints:
//! - `v1/finance/screener` for paginated equity screens,
//! - `v10/finance/quoteSummary` for per-symbol info records,
//! - `ws/fundamentals-timeseries` for statements and the trailing PEG ratio.
//!
//! All of them require a consent cookie plus a matching crumb, obtained once
//! per client and dropped again when Yahoo answers 401/403.

use crate::config::ScreenConfig;
use crate::error::{Result, ScreenError};
use crate::info::InfoRecord;
use crate::provider::{MarketDataProvider, ScreenPage, ScreenRequest};
use crate::statements::{FinancialStatements, Frequency, Statement, StatementKind};
use crate::symbols::SymbolRecord;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// quoteSummary modules merged into one info record; later modules win on key clashes
const INFO_MODULES: &[&str] = &[
    "price",
    "financialData",
    "quoteType",
    "defaultKeyStatistics",
    "assetProfile",
    "summaryDetail",
];

const TIMESERIES_PATH: &[&str] = &["ws", "fundamentals-timeseries", "v1", "finance", "timeseries"];

/// 2016-12-31T00:00:00Z, earliest period requested for statements
const STATEMENTS_START: i64 = 1_483_142_400;

/// Look-back window for the trailing PEG ratio series
const PEG_LOOKBACK_SECS: i64 = 365 * 24 * 60 * 60;

/// Cookie and crumb pair for one Yahoo session
#[derive(Debug, Clone)]
struct Session {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance API client
pub struct YahooFinanceClient {
    http: Client,
    config: ScreenConfig,
    session: Mutex<Option<Session>>,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: ScreenConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            config,
            session: Mutex::new(None),
        })
    }

    /// Create a client from defaults plus `COMPS_*` environment overrides
    pub fn from_env() -> Result<Self> {
        Self::new(ScreenConfig::default().with_env_overrides()?)
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.query_base_url)?;
        url.path_segments_mut()
            .map_err(|()| {
                ScreenError::ConfigError(format!(
                    "{} cannot be used as a base URL",
                    self.config.query_base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed_endpoint(
        &self,
        segments: &[&str],
        session: &Session,
        params: &[(&str, &str)],
    ) -> Result<Url> {
        let mut url = self.endpoint(segments)?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("crumb", &session.crumb);
        Ok(url)
    }

    async fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.fetch_session().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn fetch_session(&self) -> Result<Session> {
        // The consent host answers 404 but still sets the cookie
        let response = self.http.get(&self.config.cookie_url).send().await?;
        let cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect::<Vec<_>>()
            .join("; ");

        if cookie.is_empty() {
            return Err(ScreenError::YahooFinanceError(format!(
                "no cookie returned by {}",
                self.config.cookie_url
            )));
        }

        let url = self.endpoint(&["v1", "test", "getcrumb"])?;
        let response = self
            .http
            .get(url)
            .header(header::COOKIE, &cookie)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScreenError::ApiError {
                endpoint: "getcrumb".to_string(),
                status: status.as_u16(),
            });
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.contains('<') {
            return Err(ScreenError::YahooFinanceError(
                "invalid crumb returned by Yahoo".to_string(),
            ));
        }

        debug!("Obtained Yahoo session crumb");
        Ok(Session { cookie, crumb })
    }

    async fn clear_session(&self) {
        *self.session.lock().await = None;
    }

    async fn send_json(
        &self,
        endpoint: &str,
        request: RequestBuilder,
        session: &Session,
    ) -> Result<Value> {
        let response = request.header(header::COOKIE, &session.cookie).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(endpoint, status = status.as_u16(), "Yahoo rejected session, dropping crumb");
            self.clear_session().await;
        }

        if !status.is_success() {
            return Err(ScreenError::ApiError {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn trailing_peg_ratio(&self, symbol: &str, session: &Session) -> Result<Option<f64>> {
        let now = Utc::now().timestamp();
        let period1 = (now - PEG_LOOKBACK_SECS).to_string();
        let period2 = now.to_string();

        let mut segments = TIMESERIES_PATH.to_vec();
        segments.push(symbol);
        let url = self.authed_endpoint(
            &segments,
            session,
            &[
                ("symbol", symbol),
                ("type", "trailingPegRatio"),
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
            ],
        )?;

        let body = self.send_json("timeseries", self.http.get(url), session).await?;
        let series = parse_timeseries(&body, "")?;
        Ok(series
            .line_item("trailingPegRatio")
            .and_then(|points| points.values().next_back().copied()))
    }

    async fn fetch_statement(
        &self,
        symbol: &str,
        frequency: Frequency,
        kind: StatementKind,
        session: &Session,
    ) -> Result<Statement> {
        let prefix = frequency.series_prefix();
        let types = kind
            .line_items()
            .iter()
            .map(|item| format!("{prefix}{item}"))
            .collect::<Vec<_>>()
            .join(",");
        let period1 = STATEMENTS_START.to_string();
        let period2 = Utc::now().timestamp().to_string();

        let mut segments = TIMESERIES_PATH.to_vec();
        segments.push(symbol);
        let url = self.authed_endpoint(
            &segments,
            session,
            &[
                ("symbol", symbol),
                ("type", types.as_str()),
                ("merge", "false"),
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
            ],
        )?;

        debug!(symbol, ?kind, %frequency, "Requesting financial statement");
        let body = self.send_json("timeseries", self.http.get(url), session).await?;
        parse_timeseries(&body, prefix)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn screen(&self, request: &ScreenRequest) -> Result<ScreenPage> {
        let session = self.session().await?;
        let url = self.authed_endpoint(
            &["v1", "finance", "screener"],
            &session,
            &[
                ("lang", self.config.lang.as_str()),
                ("region", self.config.market_region.as_str()),
                ("formatted", "false"),
                ("corsDomain", "finance.yahoo.com"),
            ],
        )?;

        debug!(
            offset = request.offset,
            size = request.size,
            "Requesting screener page"
        );
        let body = self
            .send_json(
                "screener",
                self.http.post(url).json(&screen_body(request)),
                &session,
            )
            .await?;
        parse_screen_response(&body)
    }

    async fn info(&self, symbol: &str) -> Result<InfoRecord> {
        let session = self.session().await?;
        let modules = INFO_MODULES.join(",");
        let url = self.authed_endpoint(
            &["v10", "finance", "quoteSummary", symbol],
            &session,
            &[
                ("modules", modules.as_str()),
                ("formatted", "false"),
                ("lang", self.config.lang.as_str()),
                ("region", self.config.market_region.as_str()),
                ("corsDomain", "finance.yahoo.com"),
            ],
        )?;

        debug!(symbol, "Requesting quoteSummary");
        let body = match self
            .send_json("quoteSummary", self.http.get(url), &session)
            .await
        {
            Err(ScreenError::ApiError { status: 404, .. }) => {
                return Err(ScreenError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: "quote not found".to_string(),
                });
            }
            other => other?,
        };
        let mut info = flatten_quote_summary(symbol, &body)?;

        match self.trailing_peg_ratio(symbol, &session).await {
            Ok(Some(peg)) => {
                info.insert_if_absent("trailingPegRatio", json!(peg));
            }
            Ok(None) => debug!(symbol, "No trailingPegRatio reported"),
            Err(e) => warn!(symbol, error = %e, "trailingPegRatio lookup failed"),
        }

        Ok(info)
    }

    async fn financial_statements(
        &self,
        symbol: &str,
        frequency: Frequency,
    ) -> Result<FinancialStatements> {
        let session = self.session().await?;
        let mut statements = FinancialStatements::default();
        for kind in StatementKind::ALL {
            *statements.get_mut(kind) = self
                .fetch_statement(symbol, frequency, kind, &session)
                .await?;
        }
        Ok(statements)
    }
}

/// Screener POST body for one page
pub fn screen_body(request: &ScreenRequest) -> Value {
    let operands: Vec<Value> = request
        .filter
        .predicates()
        .iter()
        .map(|(field, value)| json!({ "operator": "eq", "operands": [field, value] }))
        .collect();

    json!({
        "offset": request.offset,
        "size": request.size,
        "sortField": "ticker",
        "sortType": "ASC",
        "quoteType": "EQUITY",
        "query": { "operator": "and", "operands": operands },
        "userId": "",
        "userIdType": "guid",
    })
}

/// Extract total and `(symbol, shortName)` pairs from a screener response
pub fn parse_screen_response(body: &Value) -> Result<ScreenPage> {
    let finance = body
        .get("finance")
        .ok_or_else(|| ScreenError::YahooFinanceError("screener response has no finance".into()))?;

    if let Some(error) = finance.get("error").filter(|e| !e.is_null()) {
        return Err(ScreenError::YahooFinanceError(format!(
            "screener error: {error}"
        )));
    }

    let result = finance
        .pointer("/result/0")
        .ok_or_else(|| ScreenError::YahooFinanceError("screener response has no result".into()))?;

    let total = result
        .get("total")
        .and_then(Value::as_u64)
        .and_then(|t| usize::try_from(t).ok())
        .ok_or_else(|| ScreenError::YahooFinanceError("screener result has no total".into()))?;

    let quotes: Vec<SymbolRecord> = match result.get("quotes") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(parse_quote).collect::<Result<_>>()?,
        Some(other) => {
            return Err(ScreenError::YahooFinanceError(format!(
                "screener quotes is not an array: {other}"
            )));
        }
    };

    Ok(ScreenPage { total, quotes })
}

fn parse_quote(quote: &Value) -> Result<SymbolRecord> {
    let symbol = quote
        .get("symbol")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ScreenError::YahooFinanceError(format!("screener quote without symbol: {quote}"))
        })?;
    let short_name = quote
        .get("shortName")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(SymbolRecord::new(symbol, short_name))
}

/// Merge quoteSummary modules into one flat info record
///
/// A null or empty field never replaces a value set by an earlier module.
pub fn flatten_quote_summary(symbol: &str, body: &Value) -> Result<InfoRecord> {
    let summary = body.get("quoteSummary").ok_or_else(|| {
        ScreenError::YahooFinanceError("response has no quoteSummary".to_string())
    })?;

    if let Some(error) = summary.get("error").filter(|e| !e.is_null()) {
        let reason = error
            .get("description")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(ScreenError::DataUnavailable {
            symbol: symbol.to_string(),
            reason,
        });
    }

    let modules = summary
        .pointer("/result/0")
        .and_then(Value::as_object)
        .ok_or_else(|| ScreenError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "empty quoteSummary result".to_string(),
        })?;

    let mut info = InfoRecord::default();
    for module in INFO_MODULES {
        let Some(fields) = modules.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in fields {
            if key == "maxAge" {
                continue;
            }
            if let Some(scalar) = scalar_value(value) {
                info.insert(key.clone(), scalar);
            }
        }
    }
    Ok(info)
}

/// Plain value for a quoteSummary field; `{raw, fmt}` pairs collapse to `raw`
fn scalar_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Array(_) => None,
        Value::Object(obj) => obj.get("raw").filter(|raw| !raw.is_null()).cloned(),
        other => Some(other.clone()),
    }
}

/// Turn a fundamentals-timeseries response into a statement, stripping `prefix`
/// from every series name
pub fn parse_timeseries(body: &Value, prefix: &str) -> Result<Statement> {
    let timeseries = body.get("timeseries").ok_or_else(|| {
        ScreenError::YahooFinanceError("response has no timeseries".to_string())
    })?;

    if let Some(error) = timeseries.get("error").filter(|e| !e.is_null()) {
        return Err(ScreenError::YahooFinanceError(format!(
            "timeseries error: {error}"
        )));
    }

    let mut statement = Statement::default();
    let Some(results) = timeseries.get("result").and_then(Value::as_array) else {
        return Ok(statement);
    };

    for series in results {
        let Some(series_type) = series.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let Some(points) = series.get(series_type).and_then(Value::as_array) else {
            continue;
        };
        let line_item = series_type.strip_prefix(prefix).unwrap_or(series_type);

        for point in points.iter().filter(|p| !p.is_null()) {
            let period = point
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            let value = point.pointer("/reportedValue/raw").and_then(Value::as_f64);
            if let (Some(period), Some(value)) = (period, value) {
                statement.insert(line_item, period, value);
            }
        }
    }

    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::EquityFilter;
    use tokio_test::{assert_err, assert_ok};

    fn request(offset: usize) -> ScreenRequest {
        ScreenRequest {
            filter: EquityFilter::new("us", "Technology", "Software & Services"),
            offset,
            size: 250,
        }
    }

    #[test]
    fn test_screen_body_shape() {
        let body = screen_body(&request(500));
        assert_eq!(body["offset"], 500);
        assert_eq!(body["size"], 250);
        assert_eq!(body["sortType"], "ASC");
        assert_eq!(body["sortField"], "ticker");
        assert_eq!(body["quoteType"], "EQUITY");
        assert_eq!(body["query"]["operator"], "and");
        assert_eq!(
            body["query"]["operands"],
            json!([
                { "operator": "eq", "operands": ["region", "us"] },
                { "operator": "eq", "operands": ["sector", "Technology"] },
                { "operator": "eq", "operands": ["peer_group", "Software & Services"] },
            ])
        );
    }

    #[test]
    fn test_from_env_without_overrides_uses_defaults() {
        if std::env::vars().any(|(key, _)| key.starts_with("COMPS_")) {
            return;
        }
        let client = assert_ok!(YahooFinanceClient::from_env());
        assert_eq!(client.config(), &ScreenConfig::default());
    }

    #[test]
    fn test_parse_screen_response() {
        let body = json!({
            "finance": {
                "result": [{
                    "start": 0,
                    "count": 2,
                    "total": 412,
                    "quotes": [
                        { "symbol": "AAPL", "shortName": "Apple Inc.", "regularMarketPrice": 190.1 },
                        { "symbol": "ACIW" }
                    ]
                }],
                "error": null
            }
        });

        let page = parse_screen_response(&body).unwrap();
        assert_eq!(page.total, 412);
        assert_eq!(
            page.quotes,
            vec![
                SymbolRecord::new("AAPL", Some("Apple Inc.".to_string())),
                SymbolRecord::new("ACIW", None),
            ]
        );
    }

    #[test]
    fn test_parse_screen_response_empty() {
        let body = json!({ "finance": { "result": [{ "total": 0, "quotes": [] }], "error": null } });
        let page = assert_ok!(parse_screen_response(&body));
        assert_eq!(page.total, 0);
        assert!(page.quotes.is_empty());
    }

    #[test]
    fn test_parse_screen_response_errors() {
        let body = json!({
            "finance": { "result": null, "error": { "code": "Bad Request", "description": "invalid sector" } }
        });
        assert_err!(parse_screen_response(&body));

        let body = json!({ "finance": { "result": [{ "quotes": [] }], "error": null } });
        assert_err!(parse_screen_response(&body));

        let body = json!({ "finance": { "result": [{ "total": 1, "quotes": [{ "shortName": "?" }] }] } });
        assert_err!(parse_screen_response(&body));
    }

    #[test]
    fn test_flatten_quote_summary() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "financialData": {
                        "maxAge": 86400,
                        "totalCash": { "raw": 8.0e10, "fmt": "80B" },
                        "totalRevenue": 2.4e11,
                        "profitMargins": 0.36,
                        "debtToEquity": null
                    },
                    "defaultKeyStatistics": {
                        "priceToBook": 12.4,
                        "profitMargins": 0.99,
                        "enterpriseToEbitda": {}
                    },
                    "summaryDetail": {
                        "trailingPE": 36.2,
                        "beta": 0.9
                    },
                    "assetProfile": {
                        "sector": "Technology",
                        "companyOfficers": [{ "name": "someone" }]
                    }
                }],
                "error": null
            }
        });

        let info = flatten_quote_summary("MSFT", &body).unwrap();
        assert_eq!(info.number("totalCash"), Ok(8.0e10));
        assert_eq!(info.number("totalRevenue"), Ok(2.4e11));
        assert_eq!(info.number("trailingPE"), Ok(36.2));
        assert_eq!(info.number("profitMargins"), Ok(0.99));
        assert_eq!(info.text("sector"), Ok("Technology"));
        assert!(info.get("maxAge").is_none());
        assert!(info.get("debtToEquity").is_none());
        assert!(info.get("enterpriseToEbitda").is_none());
        assert!(info.get("companyOfficers").is_none());
    }

    #[test]
    fn test_flatten_quote_summary_later_module_wins() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "price": { "shortName": "Microsoft", "marketCap": { "raw": 3.1e12 } },
                    "financialData": { "profitMargins": 0.36, "totalRevenue": 2.4e11 },
                    "defaultKeyStatistics": {
                        "beta": 1.4,
                        "profitMargins": 0.35,
                        "totalRevenue": null,
                        "marketCap": { "raw": null, "fmt": null }
                    },
                    "summaryDetail": { "beta": 0.9, "marketCap": { "raw": 3.2e12 } }
                }],
                "error": null
            }
        });

        let info = flatten_quote_summary("MSFT", &body).unwrap();
        assert_eq!(info.number("beta"), Ok(0.9));
        assert_eq!(info.number("profitMargins"), Ok(0.35));
        assert_eq!(info.number("marketCap"), Ok(3.2e12));
        assert_eq!(info.number("totalRevenue"), Ok(2.4e11));
        assert_eq!(info.text("shortName"), Ok("Microsoft"));
    }

    #[test]
    fn test_flatten_quote_summary_not_found() {
        let body = json!({
            "quoteSummary": {
                "result": null,
                "error": { "code": "Not Found", "description": "Quote not found for symbol: ZZZZ" }
            }
        });
        let err = flatten_quote_summary("ZZZZ", &body).unwrap_err();
        assert!(matches!(
            err,
            ScreenError::DataUnavailable { symbol, reason }
                if symbol == "ZZZZ" && reason.contains("not found")
        ));

        let body = json!({ "quoteSummary": { "result": [], "error": null } });
        assert!(matches!(
            flatten_quote_summary("ZZZZ", &body),
            Err(ScreenError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_parse_timeseries() {
        let body = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": { "symbol": ["MSFT"], "type": ["annualTotalRevenue"] },
                        "timestamp": [1656547200, 1688083200],
                        "annualTotalRevenue": [
                            { "asOfDate": "2022-06-30", "periodType": "12M",
                              "reportedValue": { "raw": 198_270_000_000.0_f64, "fmt": "198.27B" } },
                            null,
                            { "asOfDate": "2023-06-30", "periodType": "12M",
                              "reportedValue": { "raw": 211_915_000_000.0_f64, "fmt": "211.92B" } }
                        ]
                    },
                    {
                        "meta": { "symbol": ["MSFT"], "type": ["annualEBITDA"] }
                    }
                ],
                "error": null
            }
        });

        let statement = parse_timeseries(&body, "annual").unwrap();
        let revenue = statement.line_item("TotalRevenue").unwrap();
        assert_eq!(revenue.len(), 2);
        assert_eq!(
            statement.value(
                "TotalRevenue",
                NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()
            ),
            Some(211_915_000_000.0)
        );
        assert!(statement.line_item("EBITDA").is_none());
    }

    #[test]
    fn test_parse_timeseries_error() {
        let body = json!({ "timeseries": { "result": null, "error": { "code": "Bad Request" } } });
        assert!(parse_timeseries(&body, "quarterly").is_err());

        let body = json!({ "timeseries": { "result": null, "error": null } });
        assert!(parse_timeseries(&body, "quarterly").unwrap().is_empty());
    }

    #[test]
    fn test_endpoint_building() {
        let config = ScreenConfig::builder()
            .query_base_url("http://localhost:9000/yahoo/")
            .build()
            .unwrap();
        let client = YahooFinanceClient::new(config).unwrap();
        let session = Session {
            cookie: "A3=abc".to_string(),
            crumb: "crumb/1".to_string(),
        };

        let url = client
            .authed_endpoint(
                &["v10", "finance", "quoteSummary", "BRK B"],
                &session,
                &[("formatted", "false")],
            )
            .unwrap();

        assert_eq!(url.path(), "/yahoo/v10/finance/quoteSummary/BRK%20B");
        assert_eq!(url.query(), Some("formatted=false&crumb=crumb%2F1"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_screen_live() {
        let client = YahooFinanceClient::new(ScreenConfig::default()).unwrap();
        let page = client.screen(&request(0)).await.unwrap();
        assert!(page.total > 0);
        assert!(!page.quotes.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_info_live() {
        let client = YahooFinanceClient::new(ScreenConfig::default()).unwrap();
        let info = client.info("MSFT").await.unwrap();
        assert!(info.number("trailingPE").is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_financial_statements_live() {
        let client = YahooFinanceClient::new(ScreenConfig::default()).unwrap();
        let statements = client
            .financial_statements("MSFT", Frequency::Annual)
            .await
            .unwrap();
        assert!(!statements.income_statement.is_empty());
    }
}
