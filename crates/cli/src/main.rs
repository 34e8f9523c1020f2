mod config_commands;
mod host;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    passvault_ipc::Dispatcher,
    passvault_vault::Vault,
    serde_json::json,
    tokio::io::BufReader,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::host::Host;

#[derive(Parser)]
#[command(name = "passvault", about = "passvault: local credential vault", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "PASSVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the vault files (overrides config value).
    #[arg(long, global = true, env = "PASSVAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the channel dispatcher over stdin/stdout (default).
    Serve,
    /// Print whether the vault is initialized and where its files live.
    Status,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Logs go to stderr; stdout carries replies only.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn open_vault(config: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<Vault> {
    let loaded = config_commands::load(config, data_dir)?;
    if let Some(path) = &loaded.path {
        info!(path = %path.display(), "config loaded");
    }
    config_commands::ensure_valid(&loaded.config)?;
    Vault::from_config(&loaded.config).context("failed to set up vault")
}

/// Install the global Prometheus recorder; the host renders it on request.
#[cfg(feature = "metrics")]
fn install_metrics() -> anyhow::Result<Option<host::MetricsRender>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;
    info!("metrics recorder installed");
    Ok(Some(Arc::new(move || handle.render())))
}

#[cfg(not(feature = "metrics"))]
#[allow(clippy::unnecessary_wraps)]
fn install_metrics() -> anyhow::Result<Option<host::MetricsRender>> {
    Ok(None)
}

async fn serve(vault: Arc<Vault>, metrics: Option<host::MetricsRender>) -> anyhow::Result<()> {
    let mut host = Host::new(Dispatcher::new(Arc::clone(&vault)));
    if let Some(render) = metrics {
        host = host.with_metrics(render);
    }
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let outcome = tokio::select! {
        result = host.serve(stdin, stdout) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted");
            Ok(())
        },
    };

    vault.lock().await;
    outcome
}

async fn status(vault: &Vault) -> anyhow::Result<()> {
    let status = vault.status().await?;
    let report = json!({
        "status": status,
        "config": vault.config_path(),
        "database": vault.database_path(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "passvault starting");

    let Cli {
        command,
        config,
        data_dir,
        ..
    } = cli;

    match command {
        None | Some(Commands::Serve) => {
            let metrics = install_metrics()?;
            let vault = open_vault(config.as_deref(), data_dir)?;
            serve(Arc::new(vault), metrics).await
        },
        Some(Commands::Status) => {
            let vault = open_vault(config.as_deref(), data_dir)?;
            status(&vault).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, config.as_deref(), data_dir)
        },
    }
}
