//! Valuation multiples for a single symbol
//!
//! Each supported [`Multiple`] is either read verbatim from one info field
//! or derived as the quotient of two. Resolution never fails the whole
//! call: a metric that cannot be produced becomes `None` in the output and
//! its [`MultipleFailure`] is reported to the observer.

use crate::error::Result;
use crate::events::{ScreenEvent, ScreenObserver, TracingObserver};
use crate::info::{FieldError, InfoRecord};
use crate::provider::MarketDataProvider;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Supported valuation multiples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Multiple {
    Per,
    Pbr,
    EvRevenue,
    EvEbitda,
    Peg,
    ProfitMargin,
    OperatingMargin,
    Roa,
    Roe,
    Beta,
    DebtEquity,
    CashRevenue,
    DebtRevenue,
}

/// How a multiple is pulled out of an info record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Read one field as-is
    Direct(&'static str),
    /// `numerator / denominator`
    Ratio {
        numerator: &'static str,
        denominator: &'static str,
    },
}

impl Multiple {
    /// Every multiple, in the default request order
    pub const ALL: [Multiple; 13] = [
        Multiple::Per,
        Multiple::Pbr,
        Multiple::EvRevenue,
        Multiple::EvEbitda,
        Multiple::Peg,
        Multiple::ProfitMargin,
        Multiple::OperatingMargin,
        Multiple::Roa,
        Multiple::Roe,
        Multiple::Beta,
        Multiple::DebtEquity,
        Multiple::CashRevenue,
        Multiple::DebtRevenue,
    ];

    /// Tag used in requests and output columns
    pub fn name(self) -> &'static str {
        match self {
            Multiple::Per => "PER",
            Multiple::Pbr => "PBR",
            Multiple::EvRevenue => "EV/Revenue",
            Multiple::EvEbitda => "EV/EBITDA",
            Multiple::Peg => "PEG",
            Multiple::ProfitMargin => "Profit Margin",
            Multiple::OperatingMargin => "Operating Margin",
            Multiple::Roa => "ROA",
            Multiple::Roe => "ROE",
            Multiple::Beta => "Beta",
            Multiple::DebtEquity => "Debt/Equity",
            Multiple::CashRevenue => "Cash/Revenue",
            Multiple::DebtRevenue => "Debt/Revenue",
        }
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        match self {
            Multiple::Per => "Price to Earnings Ratio",
            Multiple::Pbr => "Price to Book Ratio",
            Multiple::EvRevenue => "Enterprise Value to Revenue",
            Multiple::EvEbitda => "Enterprise Value to EBITDA",
            Multiple::Peg => "Price to Earnings Growth Ratio",
            Multiple::ProfitMargin => "Profit Margin",
            Multiple::OperatingMargin => "Operating Margin",
            Multiple::Roa => "Return on Assets",
            Multiple::Roe => "Return on Equity",
            Multiple::Beta => "Beta",
            Multiple::DebtEquity => "Debt to Equity",
            Multiple::CashRevenue => "Cash to Revenue",
            Multiple::DebtRevenue => "Debt to Revenue",
        }
    }

    /// Look up a multiple by its exact tag
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Info field(s) backing this multiple
    pub fn extraction(self) -> Extraction {
        match self {
            Multiple::Per => Extraction::Direct("trailingPE"),
            Multiple::Pbr => Extraction::Direct("priceToBook"),
            Multiple::EvRevenue => Extraction::Direct("enterpriseToRevenue"),
            Multiple::EvEbitda => Extraction::Direct("enterpriseToEbitda"),
            Multiple::Peg => Extraction::Direct("trailingPegRatio"),
            Multiple::ProfitMargin => Extraction::Direct("profitMargins"),
            Multiple::OperatingMargin => Extraction::Direct("operatingMargins"),
            Multiple::Roa => Extraction::Direct("returnOnAssets"),
            Multiple::Roe => Extraction::Direct("returnOnEquity"),
            Multiple::Beta => Extraction::Direct("beta"),
            Multiple::DebtEquity => Extraction::Direct("debtToEquity"),
            Multiple::CashRevenue => Extraction::Ratio {
                numerator: "totalCash",
                denominator: "totalRevenue",
            },
            Multiple::DebtRevenue => Extraction::Ratio {
                numerator: "totalDebt",
                denominator: "totalRevenue",
            },
        }
    }

    /// Recognized multiples in `names`, first occurrence order, unknown tags dropped
    pub fn parse_list(names: &[&str]) -> Vec<Multiple> {
        let mut out = Vec::with_capacity(names.len());
        for multiple in names.iter().filter_map(|n| Multiple::from_name(n)) {
            if !out.contains(&multiple) {
                out.push(multiple);
            }
        }
        out
    }
}

impl fmt::Display for Multiple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Multiple {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Why a multiple resolved to absence
#[derive(Debug, Clone, PartialEq)]
pub enum MultipleFailure {
    /// Field missing or null
    MissingField { field: &'static str },
    /// Field present but not a number
    NotNumeric { field: &'static str, value: String },
    /// Ratio denominator is exactly zero
    ZeroDenominator {
        numerator: &'static str,
        denominator: &'static str,
    },
}

impl fmt::Display for MultipleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultipleFailure::MissingField { field } => write!(f, "{field} returned None"),
            MultipleFailure::NotNumeric { field, value } => {
                write!(f, "{field} is not numeric ({value})")
            }
            MultipleFailure::ZeroDenominator {
                numerator,
                denominator,
            } => write!(
                f,
                "could not calculate ratio {numerator}/{denominator}: denominator is 0"
            ),
        }
    }
}

fn numeric_field(
    info: &InfoRecord,
    field: &'static str,
) -> std::result::Result<f64, MultipleFailure> {
    info.number(field).map_err(|e| match e {
        FieldError::NotFound => MultipleFailure::MissingField { field },
        FieldError::WrongType(value) => MultipleFailure::NotNumeric {
            field,
            value: value.to_string(),
        },
    })
}

/// Resolve one multiple against an info record
pub fn resolve(info: &InfoRecord, multiple: Multiple) -> std::result::Result<f64, MultipleFailure> {
    match multiple.extraction() {
        Extraction::Direct(field) => numeric_field(info, field),
        Extraction::Ratio {
            numerator,
            denominator,
        } => {
            let top = numeric_field(info, numerator)?;
            let bottom = numeric_field(info, denominator)?;
            if bottom == 0.0 {
                return Err(MultipleFailure::ZeroDenominator {
                    numerator,
                    denominator,
                });
            }
            Ok(top / bottom)
        }
    }
}

/// Resolved multiples for one symbol, in request order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Multiples {
    entries: Vec<(Multiple, Option<f64>)>,
}

impl Multiples {
    /// Value for `multiple`: `None` when not requested, `Some(None)` when unavailable
    pub fn get(&self, multiple: Multiple) -> Option<Option<f64>> {
        self.entries
            .iter()
            .find(|(m, _)| *m == multiple)
            .map(|(_, v)| *v)
    }

    /// Same as [`get`](Self::get) keyed by tag
    pub fn get_by_name(&self, name: &str) -> Option<Option<f64>> {
        Multiple::from_name(name).and_then(|m| self.get(m))
    }

    pub fn contains(&self, multiple: Multiple) -> bool {
        self.entries.iter().any(|(m, _)| *m == multiple)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Multiple, Option<f64>)> + '_ {
        self.entries.iter().copied()
    }

    /// Set a value, keeping the position of an earlier entry for the same multiple
    pub fn insert(&mut self, multiple: Multiple, value: Option<f64>) {
        match self.entries.iter_mut().find(|(m, _)| *m == multiple) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((multiple, value)),
        }
    }
}

impl Serialize for Multiples {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (multiple, value) in &self.entries {
            map.serialize_entry(multiple.name(), value)?;
        }
        map.end()
    }
}

/// Resolve `requested` against an already-fetched info record
///
/// Unknown tags are skipped without a diagnostic; every other failure is
/// reported to `observer` and stored as `None`.
pub fn extract_multiples(
    symbol: &str,
    info: &InfoRecord,
    requested: &[&str],
    observer: &dyn ScreenObserver,
) -> Multiples {
    let mut multiples = Multiples::default();
    for multiple in requested.iter().filter_map(|n| Multiple::from_name(n)) {
        let value = match resolve(info, multiple) {
            Ok(value) => Some(value),
            Err(failure) => {
                observer.on_event(&ScreenEvent::MetricUnavailable {
                    symbol: symbol.to_string(),
                    metric: multiple,
                    failure,
                });
                None
            }
        };
        multiples.insert(multiple, value);
    }
    multiples
}

/// Fetches info records and turns them into multiples
pub struct MultipleCalculator {
    pub(crate) provider: Arc<dyn MarketDataProvider>,
    pub(crate) observer: Arc<dyn ScreenObserver>,
}

impl MultipleCalculator {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Send diagnostics and progress to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn ScreenObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fetch one info record for `symbol` and resolve `requested` against it
    ///
    /// Only the info fetch can fail; per-metric problems become `None`.
    pub async fn get_multiples(&self, symbol: &str, requested: &[&str]) -> Result<Multiples> {
        let info = self.provider.info(symbol).await?;
        Ok(extract_multiples(
            symbol,
            &info,
            requested,
            self.observer.as_ref(),
        ))
    }
}
