//! Safe accessors over a chronologically ordered statement series.
//!
//! Absent fields are "not reported"; arithmetic treats them as zero through
//! [`field`]. Guards return [`AnalysisError`] so modules can bail with `?`.

use crate::{AnalysisError, FinancialStatement, Section};

/// Most recent period (last element).
pub fn latest(statements: &[FinancialStatement]) -> Option<&FinancialStatement> {
    statements.last()
}

/// Second-to-last period, `None` when fewer than two periods exist.
pub fn previous(statements: &[FinancialStatement]) -> Option<&FinancialStatement> {
    if statements.len() < 2 {
        return None;
    }
    statements.get(statements.len() - 2)
}

/// Field value coalesced to zero.
pub fn field(statement: &FinancialStatement, section: Section, name: &str) -> f64 {
    field_or(statement, section, name, 0.0)
}

pub fn field_or(statement: &FinancialStatement, section: Section, name: &str, default: f64) -> f64 {
    statement.get(section, name).unwrap_or(default)
}

/// First reported field among `names`, zero when none is reported.
pub fn first_of(statement: &FinancialStatement, section: Section, names: &[&str]) -> f64 {
    names
        .iter()
        .find_map(|n| statement.get(section, n))
        .unwrap_or(0.0)
}

/// One field across every period, oldest first, absent values as zero.
pub fn series(statements: &[FinancialStatement], section: Section, name: &str) -> Vec<f64> {
    statements.iter().map(|s| field(s, section, name)).collect()
}

/// Chart labels for each period: the reported period name or "Period N".
pub fn period_labels(statements: &[FinancialStatement]) -> Vec<String> {
    statements
        .iter()
        .enumerate()
        .map(|(i, s)| s.period.clone().unwrap_or_else(|| format!("Period {}", i + 1)))
        .collect()
}

pub fn require_periods(statements: &[FinancialStatement], required: usize) -> Result<(), AnalysisError> {
    if statements.len() < required {
        return Err(AnalysisError::needs_periods(required, statements.len()));
    }
    Ok(())
}

/// Fails unless every one of the last `periods` statements carries `section`.
pub fn require_section(
    statements: &[FinancialStatement],
    section: Section,
    periods: usize,
) -> Result<(), AnalysisError> {
    let start = statements.len().saturating_sub(periods.max(1));
    let tail = &statements[start..];
    if tail.is_empty() || tail.iter().any(|s| s.section(section).is_none()) {
        return Err(AnalysisError::MissingSection(section));
    }
    Ok(())
}

/// Latest statement, or an insufficient-data error for an empty series.
pub fn require_latest(statements: &[FinancialStatement]) -> Result<&FinancialStatement, AnalysisError> {
    latest(statements).ok_or_else(|| AnalysisError::needs_periods(1, 0))
}

/// Latest and previous statements.
pub fn require_pair(
    statements: &[FinancialStatement],
) -> Result<(&FinancialStatement, &FinancialStatement), AnalysisError> {
    match (latest(statements), previous(statements)) {
        (Some(cur), Some(prev)) => Ok((cur, prev)),
        _ => Err(AnalysisError::needs_periods(2, statements.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(revenue: f64) -> FinancialStatement {
        FinancialStatement::default().with_value(Section::IncomeStatement, "totalRevenue", revenue)
    }

    #[test]
    fn latest_and_previous() {
        let s = vec![stmt(1.0), stmt(2.0), stmt(3.0)];
        assert_eq!(field(latest(&s).unwrap(), Section::IncomeStatement, "totalRevenue"), 3.0);
        assert_eq!(field(previous(&s).unwrap(), Section::IncomeStatement, "totalRevenue"), 2.0);
    }

    #[test]
    fn previous_absent_for_single_period() {
        let s = vec![stmt(1.0)];
        assert!(previous(&s).is_none());
        assert!(previous(&[]).is_none());
        assert!(latest(&[]).is_none());
    }

    #[test]
    fn missing_field_coalesces_to_default() {
        let s = stmt(5.0);
        assert_eq!(field(&s, Section::BalanceSheet, "totalAssets"), 0.0);
        assert_eq!(field_or(&s, Section::IncomeStatement, "netProfit", -1.0), -1.0);
        assert_eq!(first_of(&s, Section::IncomeStatement, &["revenue", "totalRevenue"]), 5.0);
    }

    #[test]
    fn guards_report_reason() {
        let err = require_periods(&[stmt(1.0)], 2).unwrap_err();
        assert!(err.to_string().contains("at least 2"));
        let err = require_section(&[stmt(1.0)], Section::BalanceSheet, 1).unwrap_err();
        assert_eq!(err, AnalysisError::MissingSection(Section::BalanceSheet));
        assert!(require_section(&[], Section::IncomeStatement, 1).is_err());
        assert!(require_pair(&[stmt(1.0), stmt(2.0)]).is_ok());
    }

    #[test]
    fn labels_fall_back_to_index() {
        let s = vec![stmt(1.0).with_period("FY2023"), stmt(2.0)];
        assert_eq!(period_labels(&s), vec!["FY2023".to_string(), "Period 2".to_string()]);
    }
}
