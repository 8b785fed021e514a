//! Dashboard logic without a UI runtime: an explicit state value, and a
//! dispatch table from UI events to pure handlers that return the next
//! state plus rendering instructions.

mod dataset;
mod dispatch;
mod figures;
mod state;

pub use dataset::Dataset;
pub use dispatch::{
    Dispatcher, Event, EventKind, EventSource, Handler, Render, Transition, on_select, on_tick,
};
pub use figures::{
    Bin, CTF_COLUMNS, Figure, FigureSet, Histogram, MOTION_COLUMNS, Series, bin, counter_text,
};
pub use state::{DashboardState, ProgressView};
