use analysis_core::{AnalysisError, AnalysisModule, Category};
use std::sync::Arc;

pub type ModuleRef = Arc<dyn AnalysisModule>;

/// Immutable category -> modules table, built once and shared with runners.
pub struct CategoryRegistry {
    entries: Vec<(Category, Vec<ModuleRef>)>,
}

impl CategoryRegistry {
    /// The full catalogue, checked against the declared per-category counts.
    pub fn standard() -> Result<Self, AnalysisError> {
        let entries = Category::ALL
            .into_iter()
            .map(|category| {
                let modules = financial_analyses::catalogue(category)
                    .into_iter()
                    .map(ModuleRef::from)
                    .collect();
                (category, modules)
            })
            .collect();
        let registry = Self { entries };
        registry.verify()?;
        Ok(registry)
    }

    /// Unchecked registry over arbitrary modules, grouped by their category
    /// in category order. Relative order inside a category is kept.
    pub fn from_modules(modules: Vec<Box<dyn AnalysisModule>>) -> Self {
        let mut modules: Vec<ModuleRef> = modules.into_iter().map(ModuleRef::from).collect();
        let entries = Category::ALL
            .into_iter()
            .map(|category| {
                let (mine, rest): (Vec<_>, Vec<_>) = modules
                    .drain(..)
                    .partition(|m| m.info().category == category);
                modules = rest;
                (category, mine)
            })
            .collect();
        Self { entries }
    }

    fn verify(&self) -> Result<(), AnalysisError> {
        let mut mismatches = Vec::new();
        for (category, modules) in &self.entries {
            if modules.len() != category.expected_count() {
                mismatches.push(format!(
                    "{} has {} modules, expected {}",
                    category,
                    modules.len(),
                    category.expected_count()
                ));
            }
        }
        if self.len() != Category::expected_total() {
            mismatches.push(format!(
                "{} modules in total, expected {}",
                self.len(),
                Category::expected_total()
            ));
        }
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::Taxonomy(mismatches.join("; ")))
        }
    }

    /// Modules in execution order: category order, then declaration order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleRef> {
        self.entries.iter().flat_map(|(_, modules)| modules.iter())
    }

    pub fn category(&self, category: Category) -> &[ModuleRef] {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, modules)| modules.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, modules)| modules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_matches_taxonomy() {
        let registry = CategoryRegistry::standard().unwrap();
        assert_eq!(registry.len(), 181);
        assert_eq!(registry.category(Category::Portfolio).len(), 35);
        assert_eq!(registry.category(Category::Ratios).len(), 30);

        let first = registry.modules().next().unwrap();
        assert_eq!(first.info().category, Category::Structural);
        let last = registry.modules().last().unwrap();
        assert_eq!(last.info().category, Category::Intelligent);
    }

    #[test]
    fn custom_registry_fails_verification() {
        let registry = CategoryRegistry::from_modules(financial_analyses::catalogue(Category::Flow));
        assert_eq!(registry.len(), 10);
        assert!(matches!(registry.verify(), Err(AnalysisError::Taxonomy(_))));
    }
}
