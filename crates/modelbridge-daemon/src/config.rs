//! Configuration for modelbridged

use crate::error::DaemonError;
use modelbridge_engine::registry::DEFAULT_SOLVER_ROOT;
use modelbridge_engine::{
    EngineConfig, ExitStatusPolicy, LogFilterFiles, PreStepPolicy, TimeHorizon, VariantRegistry,
    VariantSpec,
};
use modelbridge_types::ShapeDescriptor;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Served model
    #[serde(default)]
    pub model: ModelConfig,

    /// Shared directory used to exchange data with the solver
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Solver variants and supervision
    #[serde(default)]
    pub solver: SolverConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 4242)),
            enable_cors: true,
        }
    }
}

/// Model identity and shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name clients address the model by
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_input_sizes")]
    pub input_sizes: Vec<usize>,

    #[serde(default = "default_output_sizes")]
    pub output_sizes: Vec<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            input_sizes: default_input_sizes(),
            output_sizes: default_output_sizes(),
        }
    }
}

impl ModelConfig {
    pub fn shape(&self) -> Result<ShapeDescriptor, DaemonError> {
        ShapeDescriptor::new(self.input_sizes.clone(), self.output_sizes.clone())
            .map_err(|e| DaemonError::Config(format!("Invalid model shape: {}", e)))
    }
}

/// Exchange directory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Shared directory; required, normally from `SHARED_DIR`
    #[serde(default)]
    pub shared_dir: Option<PathBuf>,

    /// Remove `outputs.txt` before each solver launch
    #[serde(default)]
    pub discard_stale_output: bool,
}

/// Solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Application root used when no variants are listed explicitly
    #[serde(default = "default_solver_root")]
    pub root: PathBuf,

    /// Explicit variants; empty means the ExaHyPE layout under `root`
    #[serde(default)]
    pub variants: Vec<VariantSpec>,

    #[serde(default)]
    pub log_filter: LogFilterFiles,

    #[serde(default)]
    pub time_horizon: TimeHorizon,

    /// Default solver timeout in seconds; unset means unbounded
    #[serde(default)]
    pub timeout_secs: Option<f64>,

    /// Pause before each launch, in milliseconds
    #[serde(default)]
    pub test_delay_ms: Option<u64>,

    #[serde(default)]
    pub pre_step_policy: PreStepPolicy,

    #[serde(default)]
    pub exit_status_policy: ExitStatusPolicy,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            root: default_solver_root(),
            variants: Vec::new(),
            log_filter: LogFilterFiles::default(),
            time_horizon: TimeHorizon::default(),
            timeout_secs: None,
            test_delay_ms: None,
            pre_step_policy: PreStepPolicy::default(),
            exit_status_policy: ExitStatusPolicy::default(),
        }
    }
}

impl SolverConfig {
    /// Build and validate the variant registry
    pub fn registry(&self) -> Result<VariantRegistry, DaemonError> {
        let variants = if self.variants.is_empty() {
            VariantRegistry::exahype(&self.root).variants
        } else {
            self.variants.clone()
        };

        let registry = VariantRegistry {
            variants,
            log_filter: self.log_filter.clone(),
            time_horizon: self.time_horizon.clone(),
        };
        registry
            .validate()
            .map_err(|e| DaemonError::Config(format!("Invalid solver registry: {}", e)))?;
        Ok(registry)
    }

    /// Engine settings derived from this section
    pub fn engine_config(&self, discard_stale_output: bool) -> Result<EngineConfig, DaemonError> {
        let default_timeout = match self.timeout_secs {
            None => None,
            Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(secs) => {
                return Err(DaemonError::Config(format!(
                    "solver.timeout_secs must be positive, got {}",
                    secs
                )))
            }
        };

        Ok(EngineConfig {
            pre_step_policy: self.pre_step_policy,
            exit_status_policy: self.exit_status_policy,
            default_timeout,
            test_delay: self
                .test_delay_ms
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
            discard_stale_output,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_model_name() -> String {
    "forward".to_string()
}

fn default_input_sizes() -> Vec<usize> {
    vec![2]
}

fn default_output_sizes() -> Vec<usize> {
    vec![4]
}

fn default_solver_root() -> PathBuf {
    PathBuf::from(DEFAULT_SOLVER_ROOT)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `MODELBRIDGE__SECTION__KEY` environment variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MODELBRIDGE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Shared directory, which must exist
    pub fn shared_dir(&self) -> Result<PathBuf, DaemonError> {
        let dir = self.exchange.shared_dir.clone().ok_or_else(|| {
            DaemonError::Config("shared directory not set (SHARED_DIR)".to_string())
        })?;
        if !dir.is_dir() {
            return Err(DaemonError::Config(format!(
                "shared directory {} does not exist",
                dir.display()
            )));
        }
        Ok(dir)
    }
}
