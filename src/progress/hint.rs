use std::path::{Path, PathBuf};

use crate::core::MvfError;

/// Default hint file name, placed in the Relion project directory.
pub const HINT_FILE_NAME: &str = ".mvf_progress_hint";

/// `(merged table path, row count)` as announced by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressHint {
    pub table_path: PathBuf,
    pub row_count: usize,
}

/// Overwrites the hint file with `"<table_path> <row_count>\n"`.
pub fn write_hint(path: &Path, table_path: &Path, row_count: usize) -> Result<(), MvfError> {
    let line = format!("{} {}\n", table_path.display(), row_count);
    // readers never see a half-written hint
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, line)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| MvfError::IoError(format!("writing {}: {}", path.display(), e)))
}

/// Reads the hint file. A missing file means no data yet.
pub fn read_hint(path: &Path) -> Result<Option<ProgressHint>, MvfError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(MvfError::IoError(format!("reading {}: {}", path.display(), e)));
        }
    };

    let line = text.lines().next().unwrap_or("");
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [table_path, count] = tokens.as_slice() else {
        return Err(MvfError::ParseError(format!(
            "{}: expected '<path> <count>', got '{}'",
            path.display(),
            line
        )));
    };
    let row_count = count.parse::<usize>().map_err(|e| {
        MvfError::ParseError(format!(
            "{}: invalid row count '{}': {}",
            path.display(),
            count,
            e
        ))
    })?;

    Ok(Some(ProgressHint {
        table_path: PathBuf::from(table_path),
        row_count,
    }))
}
