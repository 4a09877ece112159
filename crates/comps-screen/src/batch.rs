//! Batch multiples over a symbol table

use crate::error::Result;
use crate::events::ScreenEvent;
use crate::multiples::{Multiple, MultipleCalculator, Multiples};
use crate::symbols::{SymbolRecord, SymbolTable};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One output row: the symbol record plus its multiples
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub symbol: String,
    pub short_name: Option<String>,
    pub multiples: Multiples,
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.multiples.len()))?;
        map.serialize_entry("symbol", &self.symbol)?;
        map.serialize_entry("shortName", &self.short_name)?;
        for (multiple, value) in self.multiples.iter() {
            map.serialize_entry(multiple.name(), &value)?;
        }
        map.end()
    }
}

/// Rows in symbol-table order; serializes as a JSON array of row objects
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    #[serde(skip)]
    columns: Vec<Multiple>,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Multiple columns, in request order
    pub fn columns(&self) -> &[Multiple] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }
}

fn default_request() -> Vec<&'static str> {
    Multiple::ALL.iter().map(|m| m.name()).collect()
}

impl MultipleCalculator {
    /// Compute multiples for every row of `symbols`, sequentially
    ///
    /// `requested` defaults to all thirteen multiples. A provider failure on
    /// any row aborts the run and discards the rows computed so far.
    pub async fn get_multiples_for_symbols(
        &self,
        symbols: &SymbolTable,
        requested: Option<&[&str]>,
    ) -> Result<ResultTable> {
        symbols.validate()?;

        let defaults;
        let requested = match requested {
            Some(names) => names,
            None => {
                defaults = default_request();
                defaults.as_slice()
            }
        };

        let total = symbols.len();
        let mut rows = Vec::with_capacity(total);
        for (index, SymbolRecord { symbol, short_name }) in symbols.iter().enumerate() {
            let multiples = self.get_multiples(symbol, requested).await?;
            rows.push(ResultRow {
                symbol: symbol.clone(),
                short_name: short_name.clone(),
                multiples,
            });
            self.observer.on_event(&ScreenEvent::RowProcessed {
                position: index + 1,
                total,
                symbol: symbol.clone(),
            });
        }

        Ok(ResultTable {
            columns: Multiple::parse_list(requested),
            rows,
        })
    }
}
