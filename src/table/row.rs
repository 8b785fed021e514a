use serde::ser::{Serialize, SerializeMap, Serializer};

use super::Value;

/// Ordered mapping of field name to value. Field order is the column order
/// used when the row is written back out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Sets `name`, keeping its original position if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Field union with `other`; fields of `other` win on collision.
    pub fn extend_from(&mut self, other: &Row) {
        for (name, value) in &other.fields {
            self.insert(name.clone(), value.clone());
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Ordered sequence of rows sharing a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Column names in first-seen order across all rows.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for name in row.names() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut row: Row = [("a", "1"), ("b", "2")].into_iter().collect();
        row.insert("a", "3");
        let names: Vec<&str> = row.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::from("3")));
    }

    #[test]
    fn test_extend_from_right_side_wins() {
        let mut left: Row = [("name", "x"), ("defocus", "1")].into_iter().collect();
        let right: Row = [("defocus", "2"), ("motion", "0.5")].into_iter().collect();
        left.extend_from(&right);
        assert_eq!(left.len(), 3);
        assert_eq!(left.get("defocus"), Some(&Value::from("2")));
        assert_eq!(left.get("motion"), Some(&Value::from("0.5")));
    }

    #[test]
    fn test_columns_first_seen_order() {
        let table = Table::from_rows(vec![
            [("a", "1"), ("b", "2")].into_iter().collect(),
            [("a", "1"), ("c", "2")].into_iter().collect(),
        ]);
        assert_eq!(table.columns(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_row_serializes_as_ordered_map() {
        let row: Row = [("z", "1"), ("a", "2")].into_iter().collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"z":"1","a":"2"}"#);
    }
}
