mod args;
mod error;
mod logger;

pub use args::{DashboardArgs, WatcherArgs};
pub use error::MvfError;
pub use logger::setup_logging;
