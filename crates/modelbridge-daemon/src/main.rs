//! ModelBridge Daemon - serves an external solver as a UM-Bridge model
//!
//! The daemon provides:
//! - UM-Bridge HTTP endpoints (`/Info`, `/InputSizes`, `/OutputSizes`, `/ModelInfo`, `/Evaluate`)
//! - Single-flight evaluation through the shared exchange directory
//! - Health endpoint for orchestration

use clap::Parser;
use modelbridge_daemon::error::{DaemonError, DaemonResult};
use modelbridge_daemon::{DaemonConfig, Server};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ModelBridge Daemon CLI
#[derive(Parser)]
#[command(name = "modelbridged")]
#[command(about = "ModelBridge Daemon - serve an external solver over UM-Bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: u16,

    /// Directory shared with the solver for inputs.txt / outputs.txt
    #[arg(short, long, env = "SHARED_DIR")]
    shared_dir: PathBuf,

    /// Pause before each solver launch, in milliseconds
    #[arg(long, env = "TEST_DELAY")]
    test_delay: Option<u64>,

    /// Listen host
    #[arg(long, env = "MODELBRIDGE_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Configuration file path
    #[arg(short, long, env = "MODELBRIDGE_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "MODELBRIDGE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "MODELBRIDGE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    config.server.listen_addr = SocketAddr::new(cli.host, cli.port);
    config.exchange.shared_dir = Some(cli.shared_dir);
    if cli.test_delay.is_some() {
        config.solver.test_delay_ms = cli.test_delay;
    }
    config.logging.level = cli.log_level;
    config.logging.json = cli.json;

    // Print startup banner
    println!(
        r#"
  ModelBridge - UM-Bridge model server
  Version: {}
  Model: {} (inputs {:?}, outputs {:?})
  Shared dir: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.model.name,
        config.model.input_sizes,
        config.model.output_sizes,
        config
            .exchange
            .shared_dir
            .as_deref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default(),
        config.server.listen_addr
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
