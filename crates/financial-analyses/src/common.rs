//! Small helpers shared by the catalogues.

use analysis_core::statements::{period_labels, require_latest, require_pair};
use analysis_core::{AnalysisContext, AnalysisError, Chart, ChartPoint, FinancialStatement};

pub type Item = fn(&FinancialStatement) -> f64;

pub fn latest(ctx: &AnalysisContext) -> Result<&FinancialStatement, AnalysisError> {
    require_latest(&ctx.statements)
}

pub fn pair(
    ctx: &AnalysisContext,
) -> Result<(&FinancialStatement, &FinancialStatement), AnalysisError> {
    require_pair(&ctx.statements)
}

/// Rejects a non-positive base that every ratio of the module divides by.
pub fn positive(value: f64, what: &str) -> Result<f64, AnalysisError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(AnalysisError::InvalidData(format!("{} must be positive", what)))
    }
}

pub fn composition(title: &str, parts: &[(&str, f64)]) -> Chart {
    Chart::pie(
        title,
        parts.iter().map(|(l, v)| ChartPoint::new(*l, *v)).collect(),
    )
}

pub fn bars(title: &str, parts: &[(&str, f64)]) -> Chart {
    Chart::bar(
        title,
        parts.iter().map(|(l, v)| ChartPoint::new(*l, *v)).collect(),
    )
}

/// One line item across every period.
pub fn trend(title: &str, statements: &[FinancialStatement], item: Item) -> Chart {
    let points = period_labels(statements)
        .into_iter()
        .zip(statements.iter().map(item))
        .map(|(label, value)| ChartPoint::new(label, value))
        .collect();
    Chart::line(title, points)
}
