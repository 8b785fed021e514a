use std::collections::HashMap;

use config::{Config as CConfig, ConfigBuilder, Environment, builder::DefaultState};
use serde::{Deserialize, Serialize};

use crate::{
    conf::DashboardConfig,
    core::{
        DashboardArgs,
        MvfError::{self, ConfigParsingError},
    },
};

const ENV_PREFIX: &str = "MVF";

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, MvfError> {
        let config = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Layers defaults, the optional `--config` file, `MVF_` environment
    /// variables and CLI flags, later sources winning.
    pub fn load(args: &DashboardArgs) -> Result<Config, MvfError> {
        Self::load_with_env(args, None)
    }

    /// Like [`Config::load`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        args: &DashboardArgs,
        env: Option<HashMap<String, String>>,
    ) -> Result<Config, MvfError> {
        let mut builder = CConfig::builder();
        if let Some(path) = &args.config {
            builder = builder.add_source(
                config::File::from(path.as_path()).format(config::FileFormat::Toml),
            );
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        let config = apply_cli(builder, args)?
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), MvfError> {
        if self.dashboard.poll_interval.is_zero() {
            return Err(ConfigParsingError(
                "dashboard.poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn apply_cli(
    builder: ConfigBuilder<DefaultState>,
    args: &DashboardArgs,
) -> Result<ConfigBuilder<DefaultState>, MvfError> {
    builder
        .set_override_option(
            "dashboard.project_dir",
            args.project_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )
        .and_then(|b| {
            b.set_override_option("dashboard.poll_interval", args.cfreq.map(|s| format!("{s}s")))
        })
        .and_then(|b| b.set_override_option("dashboard.host", args.host.clone()))
        .and_then(|b| b.set_override_option("dashboard.port", args.port.map(i64::from)))
        .map_err(|e| ConfigParsingError(e.to_string()))
}
