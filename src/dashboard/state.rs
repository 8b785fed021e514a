use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::preview::PREVIEWS_DIR;
use crate::progress::ProgressCache;
use crate::table::{Row, Table};

use super::figures::{FigureSet, counter_text};
use super::Dataset;

/// Everything the views render after a change, tagged with the generation
/// it was published under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub generation: u64,
    pub counter: String,
    #[serde(flatten)]
    pub figures: FigureSet,
}

/// Dashboard application state. Handlers receive it by reference and return
/// the next state; it is never mutated in place behind their back.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub(super) cache: ProgressCache,
    dataset: Option<Arc<Dataset>>,
    view: Option<Arc<ProgressView>>,
    generation: u64,
}

impl DashboardState {
    pub fn new(hint_path: impl Into<PathBuf>) -> Self {
        Self {
            cache: ProgressCache::new(hint_path),
            dataset: None,
            view: None,
            generation: 0,
        }
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    pub fn view(&self) -> Option<&Arc<ProgressView>> {
        self.view.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn micrograph_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, |d| d.len())
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        self.dataset.as_ref()?.row(index)
    }

    /// `Previews/` next to the loaded merged table.
    pub fn previews_dir(&self) -> Option<PathBuf> {
        let table = self.cache.table_path()?;
        Some(table.parent().unwrap_or(Path::new("")).join(PREVIEWS_DIR))
    }

    /// Replaces the dataset wholesale and publishes a new view.
    pub(super) fn publish(&mut self, table: &Table) -> Arc<ProgressView> {
        let dataset = Dataset::from_table(table);
        self.generation += 1;
        let view = Arc::new(ProgressView {
            generation: self.generation,
            counter: counter_text(dataset.len()),
            figures: FigureSet::from_dataset(&dataset),
        });
        self.dataset = Some(Arc::new(dataset));
        self.view = Some(Arc::clone(&view));
        view
    }
}
