//! Equity screening and valuation multiples
//!
//! This crate lists the equities of a peer group through a provider screener
//! and computes a fixed set of valuation multiples for each of them. It
//! includes:
//!
//! - A paginated symbol lister (`region` / `sector` / `peer_group` filter)
//! - A single-symbol multiples calculator with null-safe ratio handling
//! - A sequential batch calculator producing one row per symbol
//! - A financial statements helper (quarterly or annual)
//! - A Yahoo Finance implementation of the provider seam
//!
//! # Example
//!
//! ```rust,no_run
//! use comps_screen::{MultipleCalculator, ScreenConfig, SymbolLister, YahooFinanceClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(YahooFinanceClient::new(ScreenConfig::default())?);
//!
//!     let symbols = SymbolLister::new(provider.clone())
//!         .list_symbols("us", "Technology", "Software & Services")
//!         .await?;
//!
//!     let table = MultipleCalculator::new(provider)
//!         .get_multiples_for_symbols(&symbols, None)
//!         .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&table)?);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod info;
pub mod multiples;
pub mod provider;
pub mod statements;
pub mod symbols;

// Re-export main types for convenience
pub use api::YahooFinanceClient;
pub use batch::{ResultRow, ResultTable};
pub use config::ScreenConfig;
pub use error::{Result, ScreenError};
pub use events::{NoopObserver, ScreenEvent, ScreenObserver, TracingObserver};
pub use info::{FieldError, InfoRecord};
pub use multiples::{Multiple, MultipleCalculator, MultipleFailure, Multiples};
pub use provider::{EquityFilter, MarketDataProvider, ScreenPage, ScreenRequest};
pub use statements::{
    FinancialStatements, Frequency, Statement, StatementKind, get_financial_statements,
};
pub use symbols::{SymbolLister, SymbolRecord, SymbolTable};
