pub mod api;
pub mod conf;
pub mod core;
pub mod dashboard;
pub mod mrc;
pub mod preview;
pub mod progress;
pub mod service;
pub mod star;
pub mod table;
pub mod watcher;

#[cfg(feature = "testutil")]
pub mod testutil;
