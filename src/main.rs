use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use sheet_image_fill::cli::Cli;
use sheet_image_fill::infrastructure::{ConfigManager, init_logging_with_config};
use sheet_image_fill::runner;

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let manager = ConfigManager::new(cli.config.clone());
    let mut config = manager.load_config()?;
    cli.apply(&mut config);

    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    if let Some(path) = manager.loaded_from() {
        info!("Loaded configuration from {:?}", path);
    }

    let report = match runner::run(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };

    if cli.json_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize summary")?
        );
    } else {
        println!("{report}");
    }
    Ok(())
}
