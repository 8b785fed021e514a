use std::fmt::Write as _;
use std::path::Path;

use crate::core::MvfError;
use crate::table::Value;

use super::Block;

/// Overwrites `path` with the given blocks.
pub fn write(path: &Path, blocks: &[Block]) -> Result<(), MvfError> {
    std::fs::write(path, render(blocks))
        .map_err(|e| MvfError::IoError(format!("writing {}: {}", path.display(), e)))
}

/// Serializes blocks to STAR text.
pub fn render(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        let _ = write!(out, "\n# version 30001\n\ndata_{}\n\n", block.name);
        if block.is_loop {
            render_loop(&mut out, block);
        } else if let Some(row) = block.table.get(0) {
            for (name, value) in row.iter() {
                let _ = writeln!(out, "_{} {}", name, token(value));
            }
        }
        out.push('\n');
    }
    out
}

fn render_loop(out: &mut String, block: &Block) {
    let columns = block.table.columns();
    out.push_str("loop_ \n");
    for (i, name) in columns.iter().enumerate() {
        let _ = writeln!(out, "_{} #{}", name, i + 1);
    }
    for row in block.table.rows() {
        let line: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map_or_else(|| "\"\"".to_string(), token))
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
}

fn token(value: &Value) -> String {
    let text = value.to_string();
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        format!("\"{text}\"")
    } else {
        text
    }
}
