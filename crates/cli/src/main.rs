//! `lpgen` -- command-line client for the landing-page generation API.
//!
//! # Environment variables
//!
//! | Variable                 | Default                     | Description                      |
//! |--------------------------|-----------------------------|----------------------------------|
//! | `LPGEN_API_URL`          | `http://localhost:8000/api` | API base URL                     |
//! | `REQUEST_TIMEOUT_SECS`   | `30`                        | Per-request timeout              |
//! | `POLL_INTERVAL_MS`       | `3000`                      | Delay between status checks      |
//! | `POLL_MAX_FAILURES`      | `5`                         | Failed checks in a row, `0` = no cap |
//! | `POLL_MAX_DURATION_SECS` | `600`                       | Time limit per job, `0` = no cap |
//! | `RUST_LOG`               | see [`DEFAULT_LOG_FILTER`]  | Log filter                       |

mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use commands::{cmd_download, cmd_generate, cmd_jobs, cmd_retry, cmd_status, AppConfig};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str =
    "lpgen=info,lpgen_client=info,lpgen_session=info,lpgen_preview=info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean for reports and JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.api_url.as_deref())?;
    tracing::debug!(api_url = %config.client.api_url, "Configuration loaded");

    match cli.command {
        Commands::Generate {
            request,
            fields,
            output,
        } => cmd_generate(&config, request.as_deref(), fields, &output).await,
        Commands::Status { job_id, json } => cmd_status(&config, &job_id, json).await,
        Commands::Retry { job_id, output } => cmd_retry(&config, &job_id, &output).await,
        Commands::Download { job_id, out } => cmd_download(&config, &job_id, &out).await,
        Commands::Jobs { json } => cmd_jobs(&config, json).await,
    }
}
