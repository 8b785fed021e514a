use ahash::AHashMap;

use crate::table::{Row, Table, Value};

/// Columnar, numerically converted view of the merged micrographs table.
/// Every column has one value per micrograph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    columns: AHashMap<String, Vec<Value>>,
    len: usize,
}

impl Dataset {
    pub fn from_table(table: &Table) -> Self {
        let names = table.columns();
        let mut columns: AHashMap<String, Vec<Value>> = names
            .iter()
            .map(|name| (name.clone(), Vec::with_capacity(table.len())))
            .collect();

        for row in table.rows() {
            for name in &names {
                let value = row
                    .get(name)
                    .map_or_else(|| Value::Text(String::new()), Value::numeric);
                if let Some(column) = columns.get_mut(name) {
                    column.push(value);
                }
            }
        }

        Self {
            names,
            columns,
            len: table.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Numeric column; non-numeric cells become `None`.
    pub fn numbers(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.column(name)
            .map(|values| values.iter().map(Value::as_f64).collect())
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        if index >= self.len {
            return None;
        }
        Some(
            self.names
                .iter()
                .filter_map(|name| {
                    let value = self.columns.get(name)?.get(index)?;
                    Some((name.clone(), value.clone()))
                })
                .collect(),
        )
    }
}
