//! Demo server: one greeting route served until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use serde::{Deserialize, Serialize};
use toolkit_core::{
    CancellationToken, LifecycleCoordinator, Process, ShutdownSignal, ShutdownSignals,
};
use toolkit_server::config::DEFAULT_CONFIG_DIR;
use toolkit_server::{
    init_tracing, ConfigError, ConfigLoader, HttpServer, LogFormat, Route, ServerConfig,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "toolkit-server")]
#[command(about = "Demo HTTP server with graceful shutdown")]
#[command(version)]
struct Cli {
    /// Configuration name, loaded from `<config-dir>/<config>.toml`
    #[arg(long, env = "TOOLKIT_CONFIG", default_value = "server")]
    config: String,

    /// Directory holding configuration files
    #[arg(long, env = "TOOLKIT_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Port to listen on, overriding the configuration
    #[arg(short, long, env = "TOOLKIT_PORT")]
    port: Option<u16>,

    /// Log output format
    #[arg(long, value_enum, env = "TOOLKIT_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    server: ServerConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let loader = ConfigLoader::new(cli.config_dir.clone()).with_list_key("server.cors_origins");
    let defaults = AppConfig::default();

    let mut config = match loader.load(&cli.config, &defaults) {
        Ok(config) => config,
        Err(ConfigError::NotFound { path }) => {
            warn!(path = %path.display(), "config file not found, using defaults");
            defaults
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

async fn hello() -> &'static str {
    "Hello"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = load_config(&cli)?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        base_path = %config.server.base_path,
        "configuration loaded"
    );

    let server = Arc::new(HttpServer::new(config.server));
    server.add_route(Route::new(Method::GET, "hello", hello))?;
    server.add_route(Route::raw(Method::GET, "hello/raw", hello))?;

    let coordinator = LifecycleCoordinator::new(
        ShutdownSignals::default().with(ShutdownSignal::Terminate),
    );
    let ctx = CancellationToken::new();
    let wait = coordinator.start(&ctx, Process::from_runnable(server))?;

    wait.wait().await?;
    info!("server exited");
    Ok(())
}
