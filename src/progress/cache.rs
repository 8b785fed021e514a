use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::core::MvfError;
use crate::star;
use crate::table::Table;

use super::hint::{ProgressHint, read_hint};

/// Block of the merged table the dashboard displays.
pub const MICROGRAPHS_BLOCK: &str = "micrographs";

/// Tracks the last `(table path, row count)` signature seen in the hint file
/// and reloads the merged table only when it changes.
///
/// Signatures are compared by value: a table rewritten in place with the
/// same row count goes unnoticed until the next count or path change.
#[derive(Debug, Clone)]
pub struct ProgressCache {
    hint_path: PathBuf,
    last_file: Option<PathBuf>,
    last_count: usize,
}

impl ProgressCache {
    pub fn new(hint_path: impl Into<PathBuf>) -> Self {
        Self {
            hint_path: hint_path.into(),
            last_file: None,
            last_count: 0,
        }
    }

    pub fn hint_path(&self) -> &Path {
        &self.hint_path
    }

    /// Path of the table last loaded, if any.
    pub fn table_path(&self) -> Option<&Path> {
        self.last_file.as_deref()
    }

    pub fn last_count(&self) -> usize {
        self.last_count
    }

    /// Returns the freshly loaded table when the hint signature changed
    /// since the previous successful load, `None` otherwise.
    pub fn check_and_reload(&mut self) -> Result<Option<Table>, MvfError> {
        let Some(hint) = read_hint(&self.hint_path)? else {
            return Ok(None);
        };
        let file = self.resolve(&hint);
        if self.last_file.as_ref() == Some(&file) && self.last_count == hint.row_count {
            return Ok(None);
        }
        self.load(file, hint.row_count)
    }

    /// Reloads the table named by the current hint regardless of the last
    /// signature.
    pub fn force_reload(&mut self) -> Result<Option<Table>, MvfError> {
        let Some(hint) = read_hint(&self.hint_path)? else {
            return Ok(None);
        };
        let file = self.resolve(&hint);
        self.load(file, hint.row_count)
    }

    fn load(&mut self, file: PathBuf, row_count: usize) -> Result<Option<Table>, MvfError> {
        if !file.is_file() {
            debug!("hinted table {} not present yet", file.display());
            return Ok(None);
        }
        let mut star = star::read(&file, Some(&[MICROGRAPHS_BLOCK]))?;
        let table = star
            .take(MICROGRAPHS_BLOCK)
            .map(|block| block.table)
            .unwrap_or_default();

        info!(
            "loaded {} micrographs from {} (hint count {})",
            table.len(),
            file.display(),
            row_count
        );
        self.last_file = Some(file);
        self.last_count = row_count;
        Ok(Some(table))
    }

    /// Relative table paths are relative to the directory holding the hint.
    fn resolve(&self, hint: &ProgressHint) -> PathBuf {
        if hint.table_path.is_absolute() {
            return hint.table_path.clone();
        }
        match self.hint_path.parent() {
            Some(dir) => dir.join(&hint.table_path),
            None => hint.table_path.clone(),
        }
    }
}
