//! Maps request configuration onto a solver variant and its pre-steps

use crate::prestep::PreStep;
use crate::registry::{VariantRegistry, VariantSpec};
use modelbridge_types::{Configuration, EvaluationError, EvaluationResult, SolverVariant};
use std::sync::Arc;

/// Outcome of resolving a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub variant: SolverVariant,

    /// Launch description of `variant`
    pub spec: VariantSpec,

    /// File mutations to apply before launch, in order
    pub pre_steps: Vec<PreStep>,
}

/// Pure resolver over a fixed registry
#[derive(Debug, Clone)]
pub struct VariantSelector {
    registry: Arc<VariantRegistry>,
}

impl VariantSelector {
    pub fn new(registry: Arc<VariantRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    /// Resolve `config` into a variant plus pre-steps.
    ///
    /// The log filter and time horizon steps target every registered variant,
    /// not only the selected one, so all levels stay in the same state.
    pub fn resolve(&self, config: &Configuration) -> EvaluationResult<Resolution> {
        let variant = SolverVariant::try_from(config.level()?)?;
        let verbose = config.verbosity()?;
        let vtk_output = config.vtk_output()?;

        let spec = self.registry.get(variant).cloned().ok_or_else(|| {
            EvaluationError::InvalidConfiguration(format!("no solver registered for {variant}"))
        })?;

        let mut pre_steps = self.log_filter_steps(verbose);
        pre_steps.extend(self.time_horizon_steps(vtk_output));

        Ok(Resolution {
            variant,
            spec,
            pre_steps,
        })
    }

    fn log_filter_steps(&self, verbose: bool) -> Vec<PreStep> {
        let filters = &self.registry.log_filter;
        let source = if verbose {
            &filters.debug
        } else {
            &filters.release
        };

        self.registry
            .iter()
            .map(|spec| PreStep::CopyFile {
                from: spec.working_dir.join(source),
                to: spec.working_dir.join(&filters.active),
            })
            .collect()
    }

    fn time_horizon_steps(&self, vtk_output: bool) -> Vec<PreStep> {
        let horizon = &self.registry.time_horizon;
        let (find, replace) = if vtk_output {
            (&horizon.long, &horizon.short)
        } else {
            (&horizon.short, &horizon.long)
        };

        self.registry
            .iter()
            .map(|spec| PreStep::Substitute {
                path: spec.config_file.clone(),
                find: find.clone(),
                replace: replace.clone(),
            })
            .collect()
    }
}
