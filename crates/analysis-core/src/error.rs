use thiserror::Error;

use crate::Section;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("{} data is not available", .0.label())]
    MissingSection(Section),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Analysis is not implemented yet: {0}")]
    NotImplemented(String),

    #[error("Module panicked: {0}")]
    ModulePanicked(String),

    #[error("Taxonomy mismatch: {0}")]
    Taxonomy(String),
}

impl AnalysisError {
    /// Minimum-history guard failure, phrased the way results report it.
    pub fn needs_periods(required: usize, available: usize) -> Self {
        let noun = if required == 1 { "period" } else { "periods" };
        AnalysisError::InsufficientData(format!(
            "needs at least {} reporting {} (got {})",
            required, noun, available
        ))
    }
}
