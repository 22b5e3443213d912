use analysis_core::{
    AnalysisContext, AnalysisError, AnalysisModule, AnalysisResult, Category, ModuleInfo,
};

use crate::rules::degraded;

/// Registered member of the taxonomy whose subject cannot be measured from
/// financial statements. Always reports `not-implemented`.
pub struct Placeholder {
    info: ModuleInfo,
}

impl Placeholder {
    pub fn new(id: &'static str, name: &'static str, category: Category) -> Self {
        Self {
            info: ModuleInfo::new(id, name, "Reserved analysis without a data source yet", category, 0),
        }
    }

    pub fn boxed(id: &'static str, name: &'static str, category: Category) -> Box<dyn AnalysisModule> {
        Box::new(Self::new(id, name, category))
    }
}

impl AnalysisModule for Placeholder {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn run(&self, _ctx: &AnalysisContext) -> AnalysisResult {
        degraded(&self.info, &AnalysisError::NotImplemented(self.info.name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Rating, ResultStatus};

    #[test]
    fn placeholder_is_honest_about_coverage() {
        let p = Placeholder::new("cyber-risk", "Cyber risk", Category::Portfolio);
        let r = p.run(&AnalysisContext::new(Vec::new()));
        assert_eq!(r.status, ResultStatus::NotImplemented);
        assert_eq!(r.id, "cyber-risk");
        assert!(r.is_degraded());
        assert_eq!(r.final_evaluation.rating, Rating::Weak);
        assert!(r.final_evaluation.interpretation.contains("Cyber risk"));
    }
}
