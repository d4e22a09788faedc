//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use modelbridge_engine::{EvaluationEngine, FileExchange, ProcessSupervisor};
use std::sync::Arc;
use tokio::net::TcpListener;

/// ModelBridge daemon server
pub struct Server {
    config: DaemonConfig,
    engine: Arc<EvaluationEngine>,
}

impl Server {
    /// Create a new server; fails on any configuration problem
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let shape = config.model.shape()?;
        let shared_dir = config.shared_dir()?;
        let registry = Arc::new(config.solver.registry()?);
        let engine_config = config
            .solver
            .engine_config(config.exchange.discard_stale_output)?;

        tracing::info!(
            shared_dir = %shared_dir.display(),
            input_sizes = ?shape.input_sizes(),
            output_sizes = ?shape.output_sizes(),
            "Evaluation engine configured"
        );
        for spec in registry.iter() {
            tracing::debug!(
                level = spec.level.level(),
                command = %spec.command_line(),
                working_dir = %spec.working_dir.display(),
                "Solver variant registered"
            );
        }

        let engine = Arc::new(EvaluationEngine::new(
            shape,
            registry,
            Arc::new(FileExchange::new(shared_dir)),
            Arc::new(ProcessSupervisor::new()),
            engine_config,
        ));

        Ok(Self { config, engine })
    }

    /// Shared evaluation engine
    pub fn engine(&self) -> Arc<EvaluationEngine> {
        self.engine.clone()
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.engine.clone(), self.config.model.name.clone());
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DaemonError::Server(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!("ModelBridge daemon listening on {}", addr);
        tracing::info!("Serving model '{}'", self.config.model.name);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!(
            completed = self.engine.evaluations_completed(),
            failed = self.engine.evaluations_failed(),
            "ModelBridge daemon shutting down"
        );

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
