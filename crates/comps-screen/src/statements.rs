//! Financial statements helper
//!
//! Fetches the three primary statements for a symbol at quarterly or annual
//! frequency. The statements are returned as the provider reports them.

use crate::error::{Result, ScreenError};
use crate::provider::MarketDataProvider;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Reporting frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Quarterly,
    Annual,
}

impl Frequency {
    /// Prefix the timeseries API puts in front of every line item
    pub fn series_prefix(self) -> &'static str {
        match self {
            Frequency::Quarterly => "quarterly",
            Frequency::Annual => "annual",
        }
    }
}

impl FromStr for Frequency {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "q" | "quarterly" => Ok(Frequency::Quarterly),
            "y" | "a" | "annual" | "yearly" => Ok(Frequency::Annual),
            _ => Err(ScreenError::InvalidFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.series_prefix())
    }
}

/// The three statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::BalanceSheet,
        StatementKind::IncomeStatement,
        StatementKind::CashFlow,
    ];

    /// Line items requested for this statement, without frequency prefix
    pub fn line_items(self) -> &'static [&'static str] {
        match self {
            StatementKind::BalanceSheet => &[
                "TotalAssets",
                "CurrentAssets",
                "CashAndCashEquivalents",
                "CashCashEquivalentsAndShortTermInvestments",
                "Receivables",
                "Inventory",
                "NetPPE",
                "Goodwill",
                "TotalLiabilitiesNetMinorityInterest",
                "CurrentLiabilities",
                "AccountsPayable",
                "TotalDebt",
                "LongTermDebt",
                "CurrentDebt",
                "NetDebt",
                "StockholdersEquity",
                "RetainedEarnings",
                "WorkingCapital",
                "OrdinarySharesNumber",
            ],
            StatementKind::IncomeStatement => &[
                "TotalRevenue",
                "CostOfRevenue",
                "GrossProfit",
                "OperatingExpense",
                "ResearchAndDevelopment",
                "SellingGeneralAndAdministration",
                "OperatingIncome",
                "InterestExpense",
                "PretaxIncome",
                "TaxProvision",
                "NetIncome",
                "NetIncomeCommonStockholders",
                "EBIT",
                "EBITDA",
                "BasicEPS",
                "DilutedEPS",
                "BasicAverageShares",
                "DilutedAverageShares",
            ],
            StatementKind::CashFlow => &[
                "OperatingCashFlow",
                "InvestingCashFlow",
                "FinancingCashFlow",
                "FreeCashFlow",
                "CapitalExpenditure",
                "DepreciationAndAmortization",
                "StockBasedCompensation",
                "ChangeInWorkingCapital",
                "RepurchaseOfCapitalStock",
                "CashDividendsPaid",
                "IssuanceOfDebt",
                "RepaymentOfDebt",
                "EndCashPosition",
            ],
        }
    }
}

/// Line item -> period end date -> reported value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement {
    line_items: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl Statement {
    /// Record one reported value
    pub fn insert(&mut self, line_item: impl Into<String>, period: NaiveDate, value: f64) {
        self.line_items
            .entry(line_item.into())
            .or_default()
            .insert(period, value);
    }

    /// Values for one line item, keyed by period end
    pub fn line_item(&self, name: &str) -> Option<&BTreeMap<NaiveDate, f64>> {
        self.line_items.get(name)
    }

    /// Single value lookup
    pub fn value(&self, name: &str, period: NaiveDate) -> Option<f64> {
        self.line_items.get(name)?.get(&period).copied()
    }

    /// Line item names, sorted
    pub fn line_item_names(&self) -> impl Iterator<Item = &str> {
        self.line_items.keys().map(String::as_str)
    }

    /// Every period any line item reports, most recent first
    pub fn periods(&self) -> Vec<NaiveDate> {
        let mut periods: Vec<NaiveDate> = self
            .line_items
            .values()
            .flat_map(|series| series.keys().copied())
            .collect();
        periods.sort_unstable_by(|a, b| b.cmp(a));
        periods.dedup();
        periods
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

/// Balance sheet, income statement and cash flow for one symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub balance_sheet: Statement,
    pub income_statement: Statement,
    pub cash_flow: Statement,
}

impl FinancialStatements {
    pub fn get(&self, kind: StatementKind) -> &Statement {
        match kind {
            StatementKind::BalanceSheet => &self.balance_sheet,
            StatementKind::IncomeStatement => &self.income_statement,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    pub fn get_mut(&mut self, kind: StatementKind) -> &mut Statement {
        match kind {
            StatementKind::BalanceSheet => &mut self.balance_sheet,
            StatementKind::IncomeStatement => &mut self.income_statement,
            StatementKind::CashFlow => &mut self.cash_flow,
        }
    }
}

/// Fetch statements for `symbol`; `frequency` is `Q`/`quarterly` or `Y`/`annual`
///
/// An unrecognized frequency fails before any provider call is made.
pub async fn get_financial_statements(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    frequency: &str,
) -> Result<FinancialStatements> {
    let frequency: Frequency = frequency.parse()?;
    provider.financial_statements(symbol, frequency).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockMarketDataProvider;
    use mockall::predicate::eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("Q".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert_eq!("quarterly".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert_eq!("Y".parse::<Frequency>().unwrap(), Frequency::Annual);
        assert_eq!(" Annual ".parse::<Frequency>().unwrap(), Frequency::Annual);
        assert!(matches!(
            "M".parse::<Frequency>(),
            Err(ScreenError::InvalidFrequency(s)) if s == "M"
        ));
    }

    #[test]
    fn test_statement_periods_most_recent_first() {
        let mut statement = Statement::default();
        statement.insert("TotalRevenue", date(2023, 6, 30), 56.2e9);
        statement.insert("TotalRevenue", date(2024, 6, 30), 61.9e9);
        statement.insert("NetIncome", date(2024, 6, 30), 22.0e9);
        statement.insert("NetIncome", date(2022, 6, 30), 18.1e9);

        assert_eq!(
            statement.periods(),
            vec![date(2024, 6, 30), date(2023, 6, 30), date(2022, 6, 30)]
        );
        assert_eq!(statement.value("NetIncome", date(2024, 6, 30)), Some(22.0e9));
        assert_eq!(statement.value("NetIncome", date(2023, 6, 30)), None);
        assert_eq!(
            statement.line_item_names().collect::<Vec<_>>(),
            vec!["NetIncome", "TotalRevenue"]
        );
    }

    #[test]
    fn test_line_items_are_distinct_per_statement() {
        for kind in StatementKind::ALL {
            let items = kind.line_items();
            let mut sorted = items.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), items.len());
        }
    }

    #[tokio::test]
    async fn test_invalid_frequency_skips_provider() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_financial_statements().never();

        let result = get_financial_statements(&mock, "MSFT", "W").await;
        assert!(matches!(result, Err(ScreenError::InvalidFrequency(_))));
    }

    #[tokio::test]
    async fn test_statements_passed_through() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_financial_statements()
            .with(eq("MSFT"), eq(Frequency::Annual))
            .times(1)
            .returning(|_, _| {
                let mut statements = FinancialStatements::default();
                statements
                    .income_statement
                    .insert("TotalRevenue", NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(), 245.1e9);
                Ok(statements)
            });

        let statements = get_financial_statements(&mock, "MSFT", "Y").await.unwrap();
        assert_eq!(
            statements
                .get(StatementKind::IncomeStatement)
                .value("TotalRevenue", date(2024, 6, 30)),
            Some(245.1e9)
        );
        assert!(statements.balance_sheet.is_empty());
    }
}
