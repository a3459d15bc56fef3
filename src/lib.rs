pub mod cli;
pub mod core;
pub mod providers;

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::core::config::AppConfig;
use crate::core::dashboard::Dashboard;
use crate::providers::yahoo_finance::YahooFinanceProvider;

pub enum AppCommand {
    Summary { period: Option<String> },
    Export { period: Option<String> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let yahoo = config.providers.yahoo.clone().unwrap_or_default();
    let provider = Arc::new(YahooFinanceProvider::new(&yahoo)?);
    let dashboard = Dashboard::new(config, provider);

    match command {
        AppCommand::Summary { period } => {
            let period = dashboard.config().resolve_period(period.as_deref());
            cli::summary::run(&dashboard, period).await
        }
        AppCommand::Export { period } => {
            let period = dashboard.config().resolve_period(period.as_deref());
            cli::export::run(&dashboard, period).await
        }
    }
}
