//! Reader and writer for the block-structured STAR tables Relion uses for
//! metadata interchange.
//!
//! Only the subset Relion 3.1 writes is understood: `data_<name>` blocks
//! holding either a single `loop_` table or a list of `_label value` pairs.
//! Values are kept as text.

mod read;
mod write;

pub use read::{parse, read};
pub use write::{render, write};

use crate::table::Table;

/// One `data_` block. Key/value blocks are stored as a single-row table.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub table: Table,
    pub is_loop: bool,
}

impl Block {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
            is_loop: true,
        }
    }
}

/// Ordered collection of blocks, as found in a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarFile {
    blocks: Vec<Block>,
}

impl StarFile {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Removes and returns the named block.
    pub fn take(&mut self, name: &str) -> Option<Block> {
        let pos = self.blocks.iter().position(|b| b.name == name)?;
        Some(self.blocks.remove(pos))
    }
}
