mod acquire;
mod cli;
mod config;
mod ledger;
mod locate;
mod model;
mod verify;
mod workflow;

use std::{env, process};

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;

/// Logs go to stderr so they never mix with command output.
/// `WAYBILL_LOG` sets the filter (default `warn`); `WAYBILL_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("WAYBILL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = matches!(
        env::var("WAYBILL_LOG_JSON").as_deref(),
        Ok("1" | "true" | "yes")
    );

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli, &config).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
