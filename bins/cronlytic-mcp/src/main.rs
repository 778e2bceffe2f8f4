mod jsonrpc;
mod module;
mod server;
mod stdio;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cronlytic_core::cfg::{self, ConfigOverrides};
use cronlytic_core::monitor::PerformanceMonitor;
use cronlytic_core::{logx, ApiClient};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::module::{Module, ModuleCtx};
use crate::server::McpServer;
use crate::stdio::StdioServer;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version, about = "Cronlytic MCP server over stdio")]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Cronlytic API key.
    #[arg(long)]
    api_key: Option<String>,
    /// Cronlytic user id.
    #[arg(long)]
    user_id: Option<String>,
    /// Cronlytic API base URL.
    #[arg(long)]
    base_url: Option<String>,
    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write an example configuration file and exit.
    InitConfig {
        /// Destination (defaults to ~/.cronlytic/config.json).
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

/// Grace period for runtime tasks after the server stops. The stdin reader
/// sits on a blocking thread that only returns on EOF, so the runtime must
/// not wait for it.
const RUNTIME_SHUTDOWN: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = rt.block_on(run());
    rt.shutdown_timeout(RUNTIME_SHUTDOWN);
    result
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logx::init(logx::level_for(cli.debug));

    if let Some(Command::InitConfig { path }) = cli.cmd {
        let written = cfg::write_example(path.as_deref())?;
        println!("Example configuration written to {}", written.display());
        return Ok(());
    }

    let overrides = ConfigOverrides {
        api_key: cli.api_key,
        user_id: cli.user_id,
        base_url: cli.base_url,
        config_file: cli.config,
    };
    let config = cfg::load(&overrides).context("loading configuration")?;
    info!(base_url = config.base_url(), "{} boot", env!("CARGO_PKG_NAME"));

    let client = Arc::new(ApiClient::new(config));
    let monitor = Arc::new(PerformanceMonitor::new());

    let health = client.health_check().await;
    if health["status"] == "healthy" {
        info!(response_time_ms = ?health["response_time_ms"].as_f64(), "API connectivity check passed");
    } else {
        warn!(error = ?health["error"].as_str(), "API connectivity check failed");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctx = ModuleCtx { shutdown: shutdown_rx };
    let stdio: Box<dyn Module> = Box::new(StdioServer::new(Arc::new(McpServer::new(client.clone(), monitor))));
    let name = stdio.name();
    let mut handle = stdio.spawn(ctx);
    info!("module {name} started");

    let result = tokio::select! {
        res = &mut handle => res,
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
            let _ = shutdown_tx.send(true);
            handle.await
        }
    };

    client.close().await;
    info!("{} stopped", env!("CARGO_PKG_NAME"));
    result.context("stdio task")?
}
