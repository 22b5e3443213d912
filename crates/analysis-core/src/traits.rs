use crate::{AnalysisContext, AnalysisResult, Category};

/// Static description of a module, used by the registry and by the runner
/// when it has to synthesize a result on the module's behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub min_periods: usize,
}

impl ModuleInfo {
    pub const fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        category: Category,
        min_periods: usize,
    ) -> Self {
        Self {
            id,
            name,
            description,
            category,
            min_periods,
        }
    }
}

/// Contract shared by every analysis.
///
/// `run` must be total: insufficient input produces a degraded result, never
/// a panic or an error.
pub trait AnalysisModule: Send + Sync {
    fn info(&self) -> &ModuleInfo;

    fn run(&self, ctx: &AnalysisContext) -> AnalysisResult;
}
