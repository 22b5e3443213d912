use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// How the runner walks the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Sequential,
}

impl ExecutionMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(ExecutionMode::Parallel),
            "sequential" => Ok(ExecutionMode::Sequential),
            other => bail!("unknown execution mode '{}' (expected parallel or sequential)", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Sequential => "sequential",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub execution_mode: ExecutionMode,
    /// JSON strategic-decision catalog; `None` uses the built-in one
    pub strategy_catalog: Option<PathBuf>,
    pub outlier_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Parallel,
            strategy_catalog: None,
            outlier_threshold: 2.0,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let execution_mode = match env::var("ANALYSIS_EXECUTION_MODE") {
            Ok(v) => ExecutionMode::parse(&v).context("ANALYSIS_EXECUTION_MODE")?,
            Err(_) => ExecutionMode::default(),
        };

        let strategy_catalog = env::var("ANALYSIS_STRATEGY_CATALOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let outlier_threshold = env::var("ANALYSIS_OUTLIER_THRESHOLD")
            .unwrap_or_else(|_| "2.0".to_string())
            .parse::<f64>()
            .context("ANALYSIS_OUTLIER_THRESHOLD must be a number")?;

        let config = Self {
            execution_mode,
            strategy_catalog,
            outlier_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            bail!(
                "outlier threshold must be positive (got {})",
                self.outlier_threshold
            );
        }
        Ok(())
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_case_insensitively() {
        assert_eq!(ExecutionMode::parse("Sequential").unwrap(), ExecutionMode::Sequential);
        assert_eq!(ExecutionMode::parse(" parallel ").unwrap(), ExecutionMode::Parallel);
        assert!(ExecutionMode::parse("threaded").is_err());
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());
        config.outlier_threshold = 0.0;
        assert!(config.validate().is_err());
        config.outlier_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }
}
