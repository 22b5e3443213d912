use crate::config::ExecutionMode;
use crate::registry::{CategoryRegistry, ModuleRef};
use analysis_core::{AnalysisContext, AnalysisError, AnalysisResult, ResultStatus};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Runs every registered module against one context.
pub struct AnalysisRunner {
    registry: Arc<CategoryRegistry>,
    mode: ExecutionMode,
}

impl AnalysisRunner {
    pub fn new(registry: Arc<CategoryRegistry>, mode: ExecutionMode) -> Self {
        Self { registry, mode }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// One result per module, in registry order regardless of mode.
    pub fn run(&self, ctx: &AnalysisContext) -> Vec<AnalysisResult> {
        let modules: Vec<&ModuleRef> = self.registry.modules().collect();
        let results: Vec<AnalysisResult> = match self.mode {
            ExecutionMode::Sequential => modules.iter().map(|m| run_guarded(m, ctx)).collect(),
            // indexed collect keeps input order
            ExecutionMode::Parallel => modules.par_iter().map(|m| run_guarded(m, ctx)).collect(),
        };

        for result in results.iter().filter(|r| r.is_degraded()) {
            tracing::debug!(
                module = %result.id,
                status = ?result.status,
                "degraded: {}",
                result.final_evaluation.interpretation
            );
        }
        results
    }
}

/// Invoke one module, turning a panic into a failed degraded result.
pub fn run_guarded(module: &ModuleRef, ctx: &AnalysisContext) -> AnalysisResult {
    let info = module.info();
    match panic::catch_unwind(AssertUnwindSafe(|| module.run(ctx))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(module = info.id, "module panicked: {}", message);
            let err = AnalysisError::ModulePanicked(message);
            AnalysisResult::degraded(info.id, info.name, ResultStatus::Failed, err.to_string())
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
