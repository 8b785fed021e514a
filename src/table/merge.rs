use log::debug;

use crate::core::MvfError;

use super::{Row, Table};

/// Result of an incremental merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub table: Table,
    /// Number of rows appended to the existing table.
    pub appended: usize,
}

/// Appends the rows both sources have produced beyond `existing`.
///
/// Row `i` of the output is `source_a[i]` extended with `source_b[i]`
/// (fields of `source_b` win). Rows already in `existing` are never touched,
/// and the merge stops at the shorter source: a micrograph is complete only
/// once both stages have emitted it.
///
/// When `key` is given, any pair of rows that both carry that field must
/// agree on it, otherwise the merge fails and nothing is appended.
pub fn merge(
    existing: Table,
    source_a: &[Row],
    source_b: &[Row],
    key: Option<&str>,
) -> Result<MergeOutcome, MvfError> {
    let start = existing.len();
    let end = source_a.len().min(source_b.len());
    if end <= start {
        return Ok(MergeOutcome {
            table: existing,
            appended: 0,
        });
    }

    let mut new_rows = Vec::with_capacity(end - start);
    for (offset, (a, b)) in source_a[start..end].iter().zip(&source_b[start..end]).enumerate() {
        if let Some(key) = key {
            check_key(start + offset, key, a, b)?;
        }
        let mut row = a.clone();
        row.extend_from(b);
        new_rows.push(row);
    }

    debug!("merged {} new rows after {} existing", new_rows.len(), start);

    let appended = new_rows.len();
    let mut table = existing;
    for row in new_rows {
        table.push(row);
    }
    Ok(MergeOutcome { table, appended })
}

fn check_key(index: usize, key: &str, a: &Row, b: &Row) -> Result<(), MvfError> {
    match (a.get(key), b.get(key)) {
        (Some(va), Some(vb)) if va != vb => Err(MvfError::MergeError(format!(
            "sources disagree on '{key}' at row {index}: '{va}' vs '{vb}'"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn ctf_row(i: usize) -> Row {
        [
            ("rlnMicrographName", format!("MotionCorr/job002/Movies/m{i}.mrc")),
            ("rlnDefocusU", format!("{}", 10000 + i)),
            ("rlnOpticsGroup", "1".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn moco_row(i: usize) -> Row {
        [
            ("rlnMicrographName", format!("MotionCorr/job002/Movies/m{i}.mrc")),
            ("rlnAccumMotionTotal", format!("{}.5", i)),
            ("rlnOpticsGroup", "2".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn sources(n: usize) -> (Vec<Row>, Vec<Row>) {
        ((0..n).map(ctf_row).collect(), (0..n).map(moco_row).collect())
    }

    #[test]
    fn test_merge_into_empty_table() {
        let (a, b) = sources(4);
        let outcome = merge(Table::new(), &a, &b, Some("rlnMicrographName")).unwrap();

        assert_eq!(outcome.appended, 4);
        assert_eq!(outcome.table.len(), 4);
        for (i, row) in outcome.table.rows().iter().enumerate() {
            assert_eq!(row.len(), 4);
            assert_eq!(row.get("rlnDefocusU"), Some(&Value::Text(format!("{}", 10000 + i))));
            assert_eq!(row.get("rlnAccumMotionTotal"), Some(&Value::Text(format!("{i}.5"))));
            // second source wins on collision
            assert_eq!(row.get("rlnOpticsGroup"), Some(&Value::from("2")));
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (a, b) = sources(3);
        let first = merge(Table::new(), &a, &b, None).unwrap();
        let second = merge(first.table.clone(), &a, &b, None).unwrap();

        assert_eq!(second.appended, 0);
        assert_eq!(second.table, first.table);
    }

    #[test]
    fn test_merge_stops_at_shorter_source() {
        let (a, _) = sources(5);
        let (_, b) = sources(2);
        let outcome = merge(Table::new(), &a, &b, None).unwrap();
        assert_eq!(outcome.appended, 2);

        let (_, b) = sources(4);
        let outcome = merge(outcome.table, &a, &b, None).unwrap();
        assert_eq!(outcome.appended, 2);
        assert_eq!(outcome.table.len(), 4);
    }

    #[test]
    fn test_merge_preserves_existing_rows() {
        let (a, b) = sources(3);
        let mut existing = Table::new();
        existing.push([("rlnMicrographName", "kept")].into_iter().collect());

        let outcome = merge(existing, &a, &b, None).unwrap();
        assert_eq!(outcome.table.len(), 3);
        assert_eq!(
            outcome.table.get(0).unwrap().get("rlnMicrographName"),
            Some(&Value::from("kept"))
        );
        assert_eq!(outcome.table.get(0).unwrap().len(), 1);
    }

    #[test]
    fn test_merge_existing_longer_than_sources() {
        let (a, b) = sources(1);
        let (ea, eb) = sources(2);
        let existing = merge(Table::new(), &ea, &eb, None).unwrap().table;
        let outcome = merge(existing.clone(), &a, &b, None).unwrap();
        assert_eq!(outcome.appended, 0);
        assert_eq!(outcome.table, existing);
    }

    #[test]
    fn test_merge_rejects_misaligned_sources() {
        let (a, mut b) = sources(3);
        b.swap(1, 2);
        let err = merge(Table::new(), &a, &b, Some("rlnMicrographName")).unwrap_err();
        assert!(matches!(err, MvfError::MergeError(msg) if msg.contains("row 1")));
    }

    #[test]
    fn test_merge_without_key_field_joins_blindly() {
        let a: Vec<Row> = vec![[("x", "1")].into_iter().collect()];
        let b: Vec<Row> = vec![[("y", "2")].into_iter().collect()];
        let outcome = merge(Table::new(), &a, &b, Some("rlnMicrographName")).unwrap();
        assert_eq!(outcome.appended, 1);
    }
}
