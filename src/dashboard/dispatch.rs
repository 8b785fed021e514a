use std::sync::Arc;

use ahash::AHashMap;
use log::debug;
use serde::Serialize;

use crate::core::MvfError;
use crate::table::Row;

use super::{DashboardState, ProgressView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    IntervalTimer,
    MicrographTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Tick,
    Select,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Poll timer fired; `n_intervals` counts from 0 after (re)initialization.
    Tick { n_intervals: u64 },
    /// A micrograph row was selected in the table view.
    Select { index: usize },
}

impl Event {
    pub fn source(&self) -> EventSource {
        match self {
            Event::Tick { .. } => EventSource::IntervalTimer,
            Event::Select { .. } => EventSource::MicrographTable,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Tick { .. } => EventKind::Tick,
            Event::Select { .. } => EventKind::Select,
        }
    }
}

/// Instruction for the views. An empty list means "no update".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Render {
    Progress { view: Arc<ProgressView> },
    Selection { index: usize, row: Row },
}

pub type Transition = (DashboardState, Vec<Render>);

pub type Handler = fn(&DashboardState, &Event) -> Result<Transition, MvfError>;

/// Maps `(source, kind)` to the handler that computes the next state.
pub struct Dispatcher {
    handlers: AHashMap<(EventSource, EventKind), Handler>,
}

impl Dispatcher {
    pub fn empty() -> Self {
        Self {
            handlers: AHashMap::new(),
        }
    }

    pub fn register(&mut self, source: EventSource, kind: EventKind, handler: Handler) {
        self.handlers.insert((source, kind), handler);
    }

    pub fn dispatch(&self, state: &DashboardState, event: &Event) -> Result<Transition, MvfError> {
        let handler = self
            .handlers
            .get(&(event.source(), event.kind()))
            .ok_or_else(|| {
                MvfError::NotFound(format!(
                    "no handler for {:?}/{:?}",
                    event.source(),
                    event.kind()
                ))
            })?;
        handler(state, event)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(EventSource::IntervalTimer, EventKind::Tick, on_tick);
        dispatcher.register(EventSource::MicrographTable, EventKind::Select, on_select);
        dispatcher
    }
}

/// Reloads when the hint signature changed. The first tick after
/// (re)initialization always renders, reloading if needed.
pub fn on_tick(state: &DashboardState, event: &Event) -> Result<Transition, MvfError> {
    let &Event::Tick { n_intervals } = event else {
        return Err(unexpected(event));
    };
    let mut next = state.clone();

    let mut table = next.cache.check_and_reload()?;
    if table.is_none() && n_intervals == 0 {
        table = next.cache.force_reload()?;
    }

    let renders = match table {
        Some(table) => {
            let view = next.publish(&table);
            debug!("published generation {} ({})", view.generation, view.counter);
            vec![Render::Progress { view }]
        }
        None if n_intervals == 0 => next
            .view()
            .map(|view| Render::Progress {
                view: Arc::clone(view),
            })
            .into_iter()
            .collect(),
        None => Vec::new(),
    };
    Ok((next, renders))
}

/// Looks up the selected row; on a miss reloads out of band and retries once.
pub fn on_select(state: &DashboardState, event: &Event) -> Result<Transition, MvfError> {
    let &Event::Select { index } = event else {
        return Err(unexpected(event));
    };
    if let Some(row) = state.row(index) {
        return Ok((state.clone(), vec![Render::Selection { index, row }]));
    }

    let mut next = state.clone();
    let mut renders = Vec::new();
    if let Some(table) = next.cache.force_reload()? {
        let view = next.publish(&table);
        renders.push(Render::Progress { view });
    }
    let row = next.row(index).ok_or(MvfError::IndexOutOfRange {
        index,
        len: next.micrograph_count(),
    })?;
    renders.push(Render::Selection { index, row });
    Ok((next, renders))
}

fn unexpected(event: &Event) -> MvfError {
    MvfError::NotFound(format!("handler received unexpected event {event:?}"))
}
