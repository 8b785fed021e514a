use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::progress::HINT_FILE_NAME;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default = "DashboardConfig::default_host")]
    pub host: String,
    #[serde(default = "DashboardConfig::default_port")]
    pub port: u16,
    #[serde(default = "DashboardConfig::default_project_dir")]
    pub project_dir: PathBuf,
    #[serde(
        with = "humantime_serde",
        default = "DashboardConfig::default_poll_interval"
    )]
    pub poll_interval: Duration,
    #[serde(default = "DashboardConfig::default_hint_file")]
    pub hint_file: String,
}

impl DashboardConfig {
    fn default_host() -> String {
        String::from("127.0.0.1")
    }

    fn default_port() -> u16 {
        8050
    }

    fn default_project_dir() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    fn default_poll_interval() -> Duration {
        Duration::from_secs(10)
    }

    fn default_hint_file() -> String {
        String::from(HINT_FILE_NAME)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn hint_path(&self) -> PathBuf {
        self.project_dir.join(&self.hint_file)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            project_dir: Self::default_project_dir(),
            poll_interval: Self::default_poll_interval(),
            hint_file: Self::default_hint_file(),
        }
    }
}
