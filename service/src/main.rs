//! `quizbank-service` entry point.
//!
//! ## Modes
//!
//! - **Service mode** (default): load configuration, make sure the data
//!   layout exists, serve the HTTP API until Ctrl+C.
//! - **`--hash-password <plain>`**: print a password hash suitable for
//!   `api.password_hash` and exit.
//!
//! `--config <path>` selects a configuration file explicitly.

use std::path::PathBuf;

use anyhow::{Context, bail};
use quizbank_service::auth::hash_password;
use quizbank_service::{AppState, ConfigLoader, build_router, ensure_data_layout};
use tracing_subscriber::EnvFilter;

enum Mode {
    Serve { config: Option<PathBuf> },
    HashPassword(String),
}

fn parse_args() -> anyhow::Result<Mode> {
    let mut args = std::env::args().skip(1);
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--hash-password" => {
                let plain = args.next().context("--hash-password needs a password")?;
                return Ok(Mode::HashPassword(plain));
            }
            "--config" => {
                config = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(Mode::Serve { config })
}

fn main() -> anyhow::Result<()> {
    match parse_args()? {
        Mode::HashPassword(plain) => {
            let hash =
                hash_password(&plain).map_err(|e| anyhow::anyhow!("hashing password: {e}"))?;
            println!("{hash}");
            Ok(())
        }
        Mode::Serve { config } => run_service(config),
    }
}

#[tokio::main]
async fn run_service(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!("loaded environment from {}", path.display());
    }

    tracing::info!("quizbank-service v{} starting", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::load_from(config_path).context("loading configuration")?;
    ensure_data_layout(&config.data).context("preparing data directory")?;
    tracing::info!(
        "data in {}, images in {}",
        config.data.data_dir.display(),
        config.data.images_dir.display()
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let app = build_router(AppState::new(config));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("signal received, shutting down");
        })
        .await?;

    tracing::info!("quizbank-service exiting cleanly");
    Ok(())
}
