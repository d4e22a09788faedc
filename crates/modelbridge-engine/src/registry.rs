//! Variant registry: how each solver level is launched
//!
//! Variants are data loaded once at startup rather than command strings
//! assembled per request. The default registry mirrors the ExaHyPE tsunami
//! application layout.

use modelbridge_types::SolverVariant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default application root of the ExaHyPE SWE build
pub const DEFAULT_SOLVER_ROOT: &str = "/ExaHyPE-Tsunami/ApplicationExamples/SWE";

/// Registry validation errors, all fatal at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no solver registered for {0}")]
    MissingVariant(SolverVariant),

    #[error("{0} registered more than once")]
    DuplicateVariant(SolverVariant),

    #[error("solver program for {0} is empty")]
    EmptyProgram(SolverVariant),

    #[error("time horizon snippets must be non-empty and must not contain each other")]
    AmbiguousTimeHorizon,

    #[error("log filter file names must be non-empty")]
    EmptyLogFilter,
}

/// Launch description of one solver variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Level this entry serves
    pub level: SolverVariant,

    /// Directory the solver runs in
    pub working_dir: PathBuf,

    /// Executable; paths with a separator resolve against `working_dir`
    pub program: String,

    /// Command line arguments, normally the configuration file
    #[serde(default)]
    pub args: Vec<String>,

    /// Static configuration artifact patched by the time-horizon pre-step
    pub config_file: PathBuf,
}

impl VariantSpec {
    /// Program path as it will be spawned.
    ///
    /// `./ExaHyPE-SWE` becomes `<working_dir>/./ExaHyPE-SWE`, matching
    /// `cd <working_dir> && ./ExaHyPE-SWE`; bare names are left for `PATH` lookup.
    pub fn resolved_program(&self) -> PathBuf {
        let program = Path::new(&self.program);
        let has_separator = program.components().count() > 1
            || matches!(program.components().next(), Some(Component::CurDir | Component::ParentDir));
        if program.is_relative() && has_separator {
            self.working_dir.join(program)
        } else {
            program.to_path_buf()
        }
    }

    /// `program args...` for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Log filter files inside every variant working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilterFiles {
    /// Filter used when the request asks for verbose output
    #[serde(default = "default_debug_filter")]
    pub debug: String,

    /// Filter used otherwise
    #[serde(default = "default_release_filter")]
    pub release: String,

    /// File the solver actually reads
    #[serde(default = "default_active_filter")]
    pub active: String,
}

impl Default for LogFilterFiles {
    fn default() -> Self {
        Self {
            debug: default_debug_filter(),
            release: default_release_filter(),
            active: default_active_filter(),
        }
    }
}

/// Simulated end time snippets swapped in the variant configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeHorizon {
    /// Short run used for visualization output
    #[serde(default = "default_short_horizon")]
    pub short: String,

    /// Production run
    #[serde(default = "default_long_horizon")]
    pub long: String,
}

impl Default for TimeHorizon {
    fn default() -> Self {
        Self {
            short: default_short_horizon(),
            long: default_long_horizon(),
        }
    }
}

/// All solver variants plus the shared pre-step data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRegistry {
    pub variants: Vec<VariantSpec>,

    #[serde(default)]
    pub log_filter: LogFilterFiles,

    #[serde(default)]
    pub time_horizon: TimeHorizon,
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::exahype(DEFAULT_SOLVER_ROOT)
    }
}

impl VariantRegistry {
    /// Registry for the ExaHyPE SWE layout under `root`:
    /// `<root>/SWE_asagi_limited_l{n}/ExaHyPE-SWE ../SWE_asagi_limited_l{n}.exahype2`
    pub fn exahype(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let variants = SolverVariant::ALL
            .into_iter()
            .map(|level| {
                let name = format!("SWE_asagi_limited_l{}", level.level());
                VariantSpec {
                    level,
                    working_dir: root.join(&name),
                    program: "./ExaHyPE-SWE".to_string(),
                    args: vec![format!("../{name}.exahype2")],
                    config_file: root.join(format!("{name}.exahype2")),
                }
            })
            .collect();

        Self {
            variants,
            log_filter: LogFilterFiles::default(),
            time_horizon: TimeHorizon::default(),
        }
    }

    /// Check that every level is registered exactly once and the pre-step
    /// data cannot produce non-idempotent substitutions
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = BTreeSet::new();
        for spec in &self.variants {
            if !seen.insert(spec.level) {
                return Err(RegistryError::DuplicateVariant(spec.level));
            }
            if spec.program.trim().is_empty() {
                return Err(RegistryError::EmptyProgram(spec.level));
            }
        }
        if let Some(missing) = SolverVariant::ALL.into_iter().find(|v| !seen.contains(v)) {
            return Err(RegistryError::MissingVariant(missing));
        }

        let TimeHorizon { short, long } = &self.time_horizon;
        if short.is_empty() || long.is_empty() || short.contains(long.as_str()) || long.contains(short.as_str()) {
            return Err(RegistryError::AmbiguousTimeHorizon);
        }

        let filters = &self.log_filter;
        if [&filters.debug, &filters.release, &filters.active]
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(RegistryError::EmptyLogFilter);
        }
        Ok(())
    }

    pub fn get(&self, level: SolverVariant) -> Option<&VariantSpec> {
        self.variants.iter().find(|spec| spec.level == level)
    }

    /// Variants in level order
    pub fn iter(&self) -> impl Iterator<Item = &VariantSpec> {
        SolverVariant::ALL
            .into_iter()
            .filter_map(move |level| self.get(level))
    }
}

fn default_debug_filter() -> String {
    "exahype_debug.log-filter".to_string()
}

fn default_release_filter() -> String {
    "exahype_release.log-filter".to_string()
}

fn default_active_filter() -> String {
    "exahype.log-filter".to_string()
}

fn default_short_horizon() -> String {
    r#""time": 1.0,"#.to_string()
}

fn default_long_horizon() -> String {
    r#""time": 10000.0,"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_layout() {
        let registry = VariantRegistry::default();
        registry.validate().unwrap();

        let l1 = registry.get(SolverVariant::Level1).unwrap();
        assert_eq!(
            l1.working_dir,
            PathBuf::from("/ExaHyPE-Tsunami/ApplicationExamples/SWE/SWE_asagi_limited_l1")
        );
        assert_eq!(l1.command_line(), "./ExaHyPE-SWE ../SWE_asagi_limited_l1.exahype2");
        assert_eq!(
            l1.config_file,
            PathBuf::from("/ExaHyPE-Tsunami/ApplicationExamples/SWE/SWE_asagi_limited_l1.exahype2")
        );
        assert_eq!(
            l1.resolved_program(),
            PathBuf::from("/ExaHyPE-Tsunami/ApplicationExamples/SWE/SWE_asagi_limited_l1/./ExaHyPE-SWE")
        );
    }

    #[test]
    fn test_bare_program_uses_path_lookup() {
        let mut spec = VariantRegistry::default().variants.remove(0);
        spec.program = "sh".to_string();
        assert_eq!(spec.resolved_program(), PathBuf::from("sh"));

        spec.program = "/usr/bin/env".to_string();
        assert_eq!(spec.resolved_program(), PathBuf::from("/usr/bin/env"));

        spec.program = "bin/solver".to_string();
        assert_eq!(spec.resolved_program(), spec.working_dir.join("bin/solver"));
    }

    #[test]
    fn test_missing_and_duplicate_levels() {
        let mut registry = VariantRegistry::default();
        registry.variants.retain(|spec| spec.level != SolverVariant::Level2);
        assert_eq!(
            registry.validate(),
            Err(RegistryError::MissingVariant(SolverVariant::Level2))
        );

        let mut registry = VariantRegistry::default();
        let dup = registry.variants[0].clone();
        registry.variants.push(dup);
        assert_eq!(
            registry.validate(),
            Err(RegistryError::DuplicateVariant(SolverVariant::Level0))
        );
    }

    #[test]
    fn test_overlapping_horizons_rejected() {
        let mut registry = VariantRegistry::default();
        registry.time_horizon.short = "1.0".to_string();
        registry.time_horizon.long = "11.0".to_string();
        assert_eq!(registry.validate(), Err(RegistryError::AmbiguousTimeHorizon));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = serde_json::json!({
            "variants": [
                {"level": 0, "working_dir": "/s/l0", "program": "./run", "config_file": "/s/l0.cfg"},
                {"level": 1, "working_dir": "/s/l1", "program": "./run", "config_file": "/s/l1.cfg"},
                {"level": 2, "working_dir": "/s/l2", "program": "./run", "args": ["x"], "config_file": "/s/l2.cfg"}
            ]
        });
        let registry: VariantRegistry = serde_json::from_value(json).unwrap();
        registry.validate().unwrap();
        assert_eq!(registry.log_filter, LogFilterFiles::default());
        assert_eq!(registry.time_horizon, TimeHorizon::default());
        assert!(registry.get(SolverVariant::Level0).unwrap().args.is_empty());
        assert_eq!(
            registry.iter().map(|s| s.level).collect::<Vec<_>>(),
            SolverVariant::ALL.to_vec()
        );
    }
}
