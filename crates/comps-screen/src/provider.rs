//! Market data provider seam
//!
//! Everything the lister and calculators need from the outside world goes
//! through [`MarketDataProvider`]. [`YahooFinanceClient`](crate::api::YahooFinanceClient)
//! is the production implementation.

use crate::error::Result;
use crate::info::InfoRecord;
use crate::statements::{FinancialStatements, Frequency};
use crate::symbols::SymbolRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Conjunction of equality predicates used to select equities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityFilter {
    pub region: String,
    pub sector: String,
    pub peer_group: String,
}

impl EquityFilter {
    /// Create a filter; values are passed to the provider as-is
    pub fn new(
        region: impl Into<String>,
        sector: impl Into<String>,
        peer_group: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            sector: sector.into(),
            peer_group: peer_group.into(),
        }
    }

    /// `(field, value)` pairs in the provider's field vocabulary
    pub fn predicates(&self) -> [(&'static str, &str); 3] {
        [
            ("region", self.region.as_str()),
            ("sector", self.sector.as_str()),
            ("peer_group", self.peer_group.as_str()),
        ]
    }
}

/// One screener page request; results always come back in ascending ticker order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenRequest {
    pub filter: EquityFilter,
    pub offset: usize,
    pub size: usize,
}

/// One screener page response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenPage {
    /// Total number of matches across all pages
    pub total: usize,
    /// Records on this page, projected to symbol and short name
    pub quotes: Vec<SymbolRecord>,
}

/// Source of screener pages, info records and financial statements
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch one page of screener results
    async fn screen(&self, request: &ScreenRequest) -> Result<ScreenPage>;

    /// Fetch the current info record for `symbol`
    async fn info(&self, symbol: &str) -> Result<InfoRecord>;

    /// Fetch balance sheet, income statement and cash flow for `symbol`
    async fn financial_statements(
        &self,
        symbol: &str,
        frequency: Frequency,
    ) -> Result<FinancialStatements>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_predicates_order() {
        let filter = EquityFilter::new("us", "Technology", "Software & Services");
        assert_eq!(
            filter.predicates(),
            [
                ("region", "us"),
                ("sector", "Technology"),
                ("peer_group", "Software & Services"),
            ]
        );
    }
}
