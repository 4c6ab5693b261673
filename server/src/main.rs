use anyhow::{Context, Result};
use axum::Router;
use catalog::{Config, Store};
use catalog_server::{build_app, watch, AppState};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Site config (YAML); defaults apply when the file is missing
    #[arg(long, default_value = "site.yaml")]
    config: PathBuf,
    /// Source directory, overrides build.source_dir
    #[arg(long)]
    source: Option<PathBuf>,
    /// Index path, overrides build.index_path
    #[arg(long)]
    index: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Do not rebuild when sources change
    #[arg(long, default_value_t = false)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut cfg = Config::load_or_default(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;
    if let Some(dir) = args.source {
        cfg.build.source_dir = dir;
    }
    if let Some(path) = args.index {
        cfg.build.index_path = path;
    }

    let store = Arc::new(Store::open(&cfg.build.index_path).context("open index")?);
    let state = Arc::new(AppState::new(cfg, store));
    let initial = {
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || state.refresh()).await??
    };
    tracing::info!(articles = initial.articles, warnings = initial.warnings, "initial build done");

    let _watcher = if args.no_watch {
        None
    } else {
        Some(watch::spawn(Arc::clone(&state), &state.config.build.source_dir, watch::DEBOUNCE_WINDOW)?)
    };

    let app: Router = build_app(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
