//! The financial analysis catalogues, one module per category.
//!
//! Every analysis is an [`AnalysisModule`]; most are [`rules::RuleModule`]s
//! that pair a compute step with a static scoring and narrative table.

pub mod common;
pub mod fields;
pub mod placeholder;
pub mod rules;

pub mod comparative;
pub mod flow;
pub mod intelligent;
pub mod modeling;
pub mod performance;
pub mod portfolio;
pub mod ratios;
pub mod statistical;
pub mod structural;
pub mod valuation;

#[cfg(test)]
mod tests;

use analysis_core::{AnalysisModule, Category};

/// Modules of one category in execution order.
pub fn catalogue(category: Category) -> Vec<Box<dyn AnalysisModule>> {
    match category {
        Category::Structural => structural::modules(),
        Category::Ratios => ratios::modules(),
        Category::Flow => flow::modules(),
        Category::Comparative => comparative::modules(),
        Category::Valuation => valuation::modules(),
        Category::Performance => performance::modules(),
        Category::Modeling => modeling::modules(),
        Category::Statistical => statistical::modules(),
        Category::Portfolio => portfolio::modules(),
        Category::Intelligent => intelligent::modules(),
    }
}

#[cfg(test)]
mod catalogue_tests {
    use super::*;
    use crate::tests::{company_statements, market};
    use analysis_core::AnalysisContext;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_across_categories() {
        let mut seen = HashSet::new();
        for category in Category::ALL {
            for m in catalogue(category) {
                assert!(seen.insert(m.info().id), "duplicate id {}", m.info().id);
                assert_eq!(m.info().category, category);
            }
        }
        assert_eq!(seen.len(), Category::expected_total());
    }

    #[test]
    fn completed_results_carry_swot_outlook() {
        let ctx = AnalysisContext::new(company_statements()).with_market(Some(market()));
        let mut completed = 0;
        for category in Category::ALL {
            for m in catalogue(category) {
                let r = m.run(&ctx);
                if r.is_degraded() {
                    continue;
                }
                completed += 1;
                assert!(
                    !r.swot.opportunities.is_empty() || !r.swot.threats.is_empty(),
                    "{} has no opportunities or threats",
                    r.id
                );
            }
        }
        assert!(completed > 50);
    }
}
