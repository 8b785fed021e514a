mod config;
mod dashboard;

pub use config::Config;
pub use dashboard::DashboardConfig;
