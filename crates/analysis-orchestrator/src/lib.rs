//! Runs the full analysis catalogue and folds the results into an
//! executive summary.

pub mod aggregator;
pub mod config;
pub mod registry;
pub mod runner;
pub mod summary;

#[cfg(test)]
mod tests;

pub use config::{EngineConfig, ExecutionMode};
pub use registry::CategoryRegistry;
pub use runner::AnalysisRunner;
pub use summary::{ExecutiveSummaryBuilder, StrategicCatalog};

use analysis_core::{
    AnalysisContext, BenchmarkData, Company, ExecutiveSummary, FinancialStatement, MarketData,
};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct AnalysisOrchestrator {
    runner: AnalysisRunner,
    builder: ExecutiveSummaryBuilder,
    outlier_threshold: f64,
}

impl AnalysisOrchestrator {
    /// Build the standard registry and load the strategy catalog named in
    /// the config.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let registry = CategoryRegistry::standard().context("building analysis registry")?;
        let catalog = match &config.strategy_catalog {
            Some(path) => StrategicCatalog::from_json_file(path)?,
            None => StrategicCatalog::default(),
        };
        tracing::info!(
            modules = registry.len(),
            mode = config.execution_mode.as_str(),
            "analysis registry ready"
        );
        Ok(Self::with_parts(Arc::new(registry), catalog, &config))
    }

    pub fn with_parts(
        registry: Arc<CategoryRegistry>,
        catalog: StrategicCatalog,
        config: &EngineConfig,
    ) -> Self {
        Self {
            runner: AnalysisRunner::new(registry, config.execution_mode),
            builder: ExecutiveSummaryBuilder::new(catalog),
            outlier_threshold: config.outlier_threshold,
        }
    }

    pub fn module_count(&self) -> usize {
        self.runner.registry().len()
    }

    /// Never fails: insufficient input degrades individual results.
    pub fn run_all_analyses(
        &self,
        statements: Vec<FinancialStatement>,
        company: Option<Company>,
        market: Option<MarketData>,
        benchmark: Option<BenchmarkData>,
    ) -> ExecutiveSummary {
        tracing::info!(
            periods = statements.len(),
            modules = self.module_count(),
            "starting analysis run"
        );

        let ctx = AnalysisContext::new(statements)
            .with_company(company)
            .with_market(market)
            .with_benchmark(benchmark)
            .with_outlier_threshold(self.outlier_threshold);

        let results = self.runner.run(&ctx);
        let summary = self.builder.build(results);

        let evaluation = &summary.final_evaluation;
        tracing::info!(
            rating = evaluation.rating.to_label(),
            average = evaluation.average_score,
            completed = evaluation.completed_modules,
            degraded = evaluation.degraded_modules,
            risk_level = %evaluation.risk_level,
            "analysis run complete"
        );
        summary
    }

    /// Same as [`run_all_analyses`](Self::run_all_analyses), off the async
    /// executor's worker threads.
    pub async fn analyze(
        self: Arc<Self>,
        statements: Vec<FinancialStatement>,
        company: Option<Company>,
        market: Option<MarketData>,
        benchmark: Option<BenchmarkData>,
    ) -> Result<ExecutiveSummary> {
        tokio::task::spawn_blocking(move || {
            self.run_all_analyses(statements, company, market, benchmark)
        })
        .await
        .context("analysis task did not complete")
    }
}
