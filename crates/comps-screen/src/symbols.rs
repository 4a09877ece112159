//! Symbol lister
//!
//! Pages through the provider's equity screener for a region / sector /
//! peer group filter and collects `(symbol, shortName)` pairs in the
//! provider's ascending order.

use crate::config::{MAX_PAGE_SIZE, ScreenConfig};
use crate::error::{Result, ScreenError};
use crate::events::{ScreenEvent, ScreenObserver, TracingObserver};
use crate::provider::{EquityFilter, MarketDataProvider, ScreenRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One screener hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    /// Exchange ticker
    pub symbol: String,
    /// Provider's short display name
    #[serde(default)]
    pub short_name: Option<String>,
}

impl SymbolRecord {
    pub fn new(symbol: impl Into<String>, short_name: Option<String>) -> Self {
        Self {
            symbol: symbol.into(),
            short_name,
        }
    }
}

/// Ordered symbol records, densely indexed from 0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    records: Vec<SymbolRecord>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of `{ "symbol", "shortName" }` objects
    pub fn from_json(input: &str) -> Result<Self> {
        let table: SymbolTable = serde_json::from_str(input)
            .map_err(|e| ScreenError::InvalidInput(format!("expected symbol table: {e}")))?;
        table.validate()?;
        Ok(table)
    }

    /// Reject rows that cannot be looked up
    pub fn validate(&self) -> Result<()> {
        if let Some(position) = self
            .records
            .iter()
            .position(|r| r.symbol.trim().is_empty())
        {
            return Err(ScreenError::InvalidInput(format!(
                "row {position} has an empty symbol"
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SymbolRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SymbolRecord> {
        self.records.iter()
    }
}

impl From<Vec<SymbolRecord>> for SymbolTable {
    fn from(records: Vec<SymbolRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<SymbolRecord> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = SymbolRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a SymbolRecord;
    type IntoIter = std::slice::Iter<'a, SymbolRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Paginated screener client
pub struct SymbolLister {
    provider: Arc<dyn MarketDataProvider>,
    observer: Arc<dyn ScreenObserver>,
    page_size: usize,
}

impl SymbolLister {
    /// Create a lister using the provider's maximum page size
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            observer: Arc::new(TracingObserver),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Take the page size from `config`
    pub fn with_config(self, config: &ScreenConfig) -> Self {
        self.with_page_size(config.page_size)
    }

    /// Override the page size (clamped to `1..=MAX_PAGE_SIZE`)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Send page events to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn ScreenObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// List every equity matching `region`, `sector` and `peer_group`
    pub async fn list_symbols(
        &self,
        region: &str,
        sector: &str,
        peer_group: &str,
    ) -> Result<SymbolTable> {
        self.list(&EquityFilter::new(region, sector, peer_group))
            .await
    }

    /// List every equity matching `filter`
    ///
    /// The number of page requests is driven by the `total` reported with the
    /// first page. Provider errors propagate unchanged.
    pub async fn list(&self, filter: &EquityFilter) -> Result<SymbolTable> {
        let mut request = ScreenRequest {
            filter: filter.clone(),
            offset: 0,
            size: self.page_size,
        };

        let first = self.provider.screen(&request).await?;
        let total = first.total;
        self.observer.on_event(&ScreenEvent::PageFetched {
            offset: 0,
            received: first.quotes.len(),
            total,
        });

        let mut records = first.quotes;
        while records.len() < total {
            request.offset += self.page_size;
            let page = self.provider.screen(&request).await?;
            self.observer.on_event(&ScreenEvent::PageFetched {
                offset: request.offset,
                received: page.quotes.len(),
                total,
            });

            // Provider shrank the result set between pages
            if page.quotes.is_empty() {
                warn!(
                    offset = request.offset,
                    fetched = records.len(),
                    total,
                    "Screener returned an empty page before reaching total"
                );
                break;
            }
            records.extend(page.quotes);
        }

        debug!(count = records.len(), total, "Symbol listing complete");
        Ok(SymbolTable::from(records))
    }
}
