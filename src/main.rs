use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;

use mvf::api::DashboardApi;
use mvf::conf::Config;
use mvf::core::{DashboardArgs, setup_logging};
use mvf::service::DashboardService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = DashboardArgs::parse();
    info!(args = args; "mvf dashboard starting");

    let config = Config::load(&args).context("loading configuration")?;
    let dashboard = config.dashboard;
    info!(
        "watching {} every {:?}",
        dashboard.hint_path().display(),
        dashboard.poll_interval
    );

    let service = Arc::new(DashboardService::new(dashboard.hint_path()));
    tokio::spawn(Arc::clone(&service).run_poller(dashboard.poll_interval));

    DashboardApi::new(service)
        .serve(&dashboard.addr())
        .await
        .context("serving dashboard")?;
    Ok(())
}
