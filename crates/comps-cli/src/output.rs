//! Rendering of command results for stdout

use clap::ValueEnum;
use comfy_table::{Table, presets::UTF8_FULL};
use comps_screen::{FinancialStatements, Multiple, Multiples, ResultTable, StatementKind, SymbolTable};
use serde::Serialize;

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Box-drawn table
    Table,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header.into_iter().map(Into::into).collect::<Vec<String>>());
    table
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

pub fn render_symbols(symbols: &SymbolTable, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(symbols),
        OutputFormat::Table => {
            let mut table = new_table(["#", "symbol", "shortName"]);
            for (index, record) in symbols.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    record.symbol.clone(),
                    record.short_name.clone().unwrap_or_default(),
                ]);
            }
            Ok(table.to_string())
        }
    }
}

pub fn render_multiples(
    symbol: &str,
    multiples: &Multiples,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(multiples),
        OutputFormat::Table => {
            let mut table = new_table(["multiple", symbol]);
            for (multiple, value) in multiples.iter() {
                table.add_row(vec![multiple.name().to_string(), cell(value)]);
            }
            Ok(table.to_string())
        }
    }
}

pub fn render_results(results: &ResultTable, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(results),
        OutputFormat::Table => {
            let header = ["symbol", "shortName"]
                .into_iter()
                .chain(results.columns().iter().map(|m| m.name()));
            let mut table = new_table(header);
            for row in results.iter() {
                let mut cells = vec![row.symbol.clone(), row.short_name.clone().unwrap_or_default()];
                cells.extend(
                    results
                        .columns()
                        .iter()
                        .map(|m| cell(row.multiples.get(*m).flatten())),
                );
                table.add_row(cells);
            }
            Ok(table.to_string())
        }
    }
}

pub fn render_statements(
    statements: &FinancialStatements,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(statements),
        OutputFormat::Table => {
            let mut sections = Vec::with_capacity(StatementKind::ALL.len());
            for kind in StatementKind::ALL {
                let statement = statements.get(kind);
                let periods = statement.periods();
                let header = std::iter::once("line item".to_string())
                    .chain(periods.iter().map(ToString::to_string));
                let mut table = new_table(header);
                for name in statement.line_item_names() {
                    let mut cells = vec![name.to_string()];
                    cells.extend(
                        periods
                            .iter()
                            .map(|period| cell(statement.value(name, *period))),
                    );
                    table.add_row(cells);
                }
                sections.push(format!("{kind:?}\n{table}"));
            }
            Ok(sections.join("\n\n"))
        }
    }
}

pub fn render_metric_catalog(format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let names: Vec<&str> = Multiple::ALL.iter().map(|m| m.name()).collect();
            to_json(&names)
        }
        OutputFormat::Table => {
            let mut table = new_table(["multiple", "description"]);
            for multiple in Multiple::ALL {
                table.add_row(vec![multiple.name(), multiple.description()]);
            }
            Ok(table.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comps_screen::SymbolRecord;

    fn symbols() -> SymbolTable {
        SymbolTable::from(vec![
            SymbolRecord::new("ADBE", Some("Adobe Inc.".to_string())),
            SymbolRecord::new("CRM", None),
        ])
    }

    #[test]
    fn test_symbols_json() {
        let rendered = render_symbols(&symbols(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed[0]["symbol"], "ADBE");
        assert_eq!(parsed[0]["shortName"], "Adobe Inc.");
        assert!(parsed[1]["shortName"].is_null());
    }

    #[test]
    fn test_symbols_json_round_trips_into_batch_input() {
        let rendered = render_symbols(&symbols(), OutputFormat::Json).unwrap();
        assert_eq!(SymbolTable::from_json(&rendered).unwrap(), symbols());
    }

    #[test]
    fn test_symbols_table() {
        let rendered = render_symbols(&symbols(), OutputFormat::Table).unwrap();
        assert!(rendered.contains("shortName"));
        assert!(rendered.contains("Adobe Inc."));
        assert!(rendered.contains("CRM"));
    }

    #[test]
    fn test_multiples_table_marks_absent_values() {
        let mut multiples = Multiples::default();
        multiples.insert(Multiple::Per, Some(31.25));
        multiples.insert(Multiple::Peg, None);

        let rendered = render_multiples("MSFT", &multiples, OutputFormat::Table).unwrap();
        assert!(rendered.contains("31.2500"));
        assert!(rendered.contains("PEG"));
        assert!(rendered.contains('-'));
    }

    #[test]
    fn test_metric_catalog_lists_all() {
        let rendered = render_metric_catalog(OutputFormat::Json).unwrap();
        let names: Vec<String> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(names.len(), 13);
        assert_eq!(names[0], "PER");
        assert_eq!(names[12], "Debt/Revenue");
    }

    #[test]
    fn test_empty_statements_table() {
        let rendered =
            render_statements(&FinancialStatements::default(), OutputFormat::Table).unwrap();
        assert!(rendered.contains("BalanceSheet"));
        assert!(rendered.contains("CashFlow"));
    }
}
