use std::path::Path;

use crate::core::MvfError;
use crate::table::{Row, Table, Value};

use super::{Block, StarFile};

/// Reads a STAR file. When `block_names` is given, other blocks are dropped.
pub fn read(path: &Path, block_names: Option<&[&str]>) -> Result<StarFile, MvfError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| MvfError::IoError(format!("reading {}: {}", path.display(), e)))?;
    parse(&text, block_names)
        .map_err(|e| MvfError::StarError(format!("{}: {}", path.display(), inner_message(e))))
}

fn inner_message(err: MvfError) -> String {
    match err {
        MvfError::StarError(msg) => msg,
        other => other.to_string(),
    }
}

enum State {
    Pairs,
    LoopHeader,
    LoopBody,
}

struct Builder {
    name: String,
    is_loop: bool,
    columns: Vec<String>,
    pending: Vec<String>,
    table: Table,
    pairs: Row,
}

impl Builder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_loop: false,
            columns: Vec::new(),
            pending: Vec::new(),
            table: Table::new(),
            pairs: Row::new(),
        }
    }

    fn push_tokens(&mut self, tokens: Vec<String>, line_no: usize) -> Result<(), MvfError> {
        if self.columns.is_empty() {
            return Err(MvfError::StarError(format!(
                "line {line_no}: loop data without column labels in block '{}'",
                self.name
            )));
        }
        self.pending.extend(tokens);
        while self.pending.len() >= self.columns.len() {
            let values: Vec<String> = self.pending.drain(..self.columns.len()).collect();
            let row: Row = self
                .columns
                .iter()
                .cloned()
                .zip(values.into_iter().map(Value::Text))
                .collect();
            self.table.push(row);
        }
        Ok(())
    }

    fn finish(self) -> Result<Block, MvfError> {
        if !self.pending.is_empty() {
            return Err(MvfError::StarError(format!(
                "block '{}' ends with an incomplete row ({} of {} values)",
                self.name,
                self.pending.len(),
                self.columns.len()
            )));
        }
        let table = if self.is_loop {
            self.table
        } else {
            Table::from_rows(vec![self.pairs])
        };
        Ok(Block {
            name: self.name,
            table,
            is_loop: self.is_loop,
        })
    }
}

/// Parses STAR text into its blocks.
pub fn parse(text: &str, block_names: Option<&[&str]>) -> Result<StarFile, MvfError> {
    let mut blocks = Vec::new();
    let mut current: Option<Builder> = None;
    let mut state = State::Pairs;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix("data_") {
            if let Some(builder) = current.take() {
                blocks.push(builder.finish()?);
            }
            current = Some(Builder::new(name.trim()));
            state = State::Pairs;
            continue;
        }

        let builder = current.as_mut().ok_or_else(|| {
            MvfError::StarError(format!("line {line_no}: content before the first data_ block"))
        })?;

        if line.starts_with("loop_") {
            if builder.is_loop || !builder.pairs.is_empty() {
                return Err(MvfError::StarError(format!(
                    "line {line_no}: block '{}' holds more than one table",
                    builder.name
                )));
            }
            builder.is_loop = true;
            state = State::LoopHeader;
            continue;
        }

        let tokens = tokenize(line, line_no)?;
        match state {
            State::Pairs => {
                let mut iter = tokens.into_iter();
                let (Some(label), Some(value), None) = (iter.next(), iter.next(), iter.next())
                else {
                    return Err(MvfError::StarError(format!(
                        "line {line_no}: expected '_label value'"
                    )));
                };
                let label = label.strip_prefix('_').ok_or_else(|| {
                    MvfError::StarError(format!("line {line_no}: label must start with '_'"))
                })?;
                builder.pairs.insert(label, value);
            }
            State::LoopHeader if line.starts_with('_') => {
                // "_rlnMicrographName #1": the index annotation is ignored
                builder.columns.push(tokens[0][1..].to_string());
            }
            State::LoopHeader | State::LoopBody => {
                state = State::LoopBody;
                builder.push_tokens(tokens, line_no)?;
            }
        }
    }

    if let Some(builder) = current.take() {
        blocks.push(builder.finish()?);
    }

    if let Some(names) = block_names {
        blocks.retain(|b| names.contains(&b.name.as_str()));
    }

    Ok(StarFile::new(blocks))
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<String>, MvfError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' || c == '\'' {
            chars.next();
            let mut token = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                if ch == c && chars.peek().is_none_or(|n| n.is_whitespace()) {
                    closed = true;
                    break;
                }
                token.push(ch);
            }
            if !closed {
                return Err(MvfError::StarError(format!(
                    "line {line_no}: unterminated quoted value"
                )));
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
            tokens.push(token);
        }
    }
    Ok(tokens)
}
