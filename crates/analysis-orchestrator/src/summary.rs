use crate::aggregator;
use analysis_core::{AggregateEvaluation, AnalysisResult, ExecutiveSummary, StrategicDecisions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Horizon-keyed strategic decision lists. Static text, not derived from the
/// company's figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicCatalog {
    #[serde(default)]
    pub short_term: Vec<String>,
    #[serde(default)]
    pub medium_term: Vec<String>,
    #[serde(default)]
    pub long_term: Vec<String>,
    #[serde(default)]
    pub emergency: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for StrategicCatalog {
    fn default() -> Self {
        Self {
            short_term: owned(&[
                "Review current financial policies",
                "Improve cash-flow management",
                "Tighten control over operating expenses",
                "Follow up on overdue receivables",
            ]),
            medium_term: owned(&[
                "Restructure the capital mix toward sustainable leverage",
                "Develop new revenue sources",
                "Upgrade financial reporting and internal controls",
            ]),
            long_term: owned(&[
                "Invest in innovation and digital transformation",
                "Expand into new markets",
                "Build a sustainable competitive advantage",
            ]),
            emergency: owned(&[
                "Secure a contingency liquidity line",
                "Freeze non-essential capital spending",
                "Prepare a crisis communication plan for lenders and investors",
            ]),
        }
    }
}

impl StrategicCatalog {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading strategy catalog {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing strategy catalog {}", path.display()))
    }

    fn decisions(&self) -> StrategicDecisions {
        StrategicDecisions {
            short_term: self.short_term.clone(),
            medium_term: self.medium_term.clone(),
            long_term: self.long_term.clone(),
            emergency: self.emergency.clone(),
        }
    }
}

pub struct ExecutiveSummaryBuilder {
    catalog: StrategicCatalog,
}

impl ExecutiveSummaryBuilder {
    pub fn new(catalog: StrategicCatalog) -> Self {
        Self { catalog }
    }

    pub fn build(&self, results: Vec<AnalysisResult>) -> ExecutiveSummary {
        let all_recommendations = aggregator::all_recommendations(&results);
        let recommendations = aggregator::categorize_recommendations(&all_recommendations);
        let risks = aggregator::all_risks(&results);
        let predictions = aggregator::all_predictions(&results);
        let swot = aggregator::merge_swot(&results);

        let (average_score, degraded_modules) = aggregator::average_score(&results);
        let rating = analysis_core::Rating::from_average(average_score);
        let total_risks = aggregator::total_risk_count(&results);
        let risk_level = aggregator::risk_level(total_risks).to_string();

        let detailed_evaluation = format!(
            "Overall rating: {}. Analyses run: {} ({} completed, {} degraded), average score {:.2} out of 5. Risk level: {} ({} risks reported, {} distinct). Recommendations issued: {}.",
            rating.to_label(),
            results.len(),
            results.len() - degraded_modules,
            degraded_modules,
            average_score,
            risk_level,
            total_risks,
            risks.len(),
            all_recommendations.len()
        );

        let final_evaluation = AggregateEvaluation {
            rating,
            average_score,
            completed_modules: results.len() - degraded_modules,
            degraded_modules,
            total_risks,
            distinct_risks: risks.len(),
            risk_level,
            detailed_evaluation,
        };

        ExecutiveSummary {
            results,
            recommendations,
            all_recommendations,
            risks,
            predictions,
            swot,
            final_evaluation,
            strategic_decisions: self.catalog.decisions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Rating, ResultStatus};

    #[test]
    fn catalog_loads_partial_json() {
        let path = std::env::temp_dir().join("strategy-catalog-test.json");
        std::fs::write(&path, r#"{"shortTerm": ["Cut costs"], "emergency": ["Raise cash"]}"#).unwrap();
        let catalog = StrategicCatalog::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(catalog.short_term, vec!["Cut costs"]);
        assert!(catalog.medium_term.is_empty());
        assert_eq!(catalog.emergency, vec!["Raise cash"]);
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let path = std::env::temp_dir().join("no-such-strategy-catalog.json");
        assert!(StrategicCatalog::from_json_file(&path).is_err());
    }

    #[test]
    fn empty_batch_builds_neutral_summary() {
        let summary = ExecutiveSummaryBuilder::new(StrategicCatalog::default()).build(Vec::new());
        assert_eq!(summary.final_evaluation.rating, Rating::Good);
        assert_eq!(summary.final_evaluation.risk_level, "low");
        assert_eq!(summary.recommendations.len(), 4);
        assert_eq!(summary.strategic_decisions.short_term[0], "Review current financial policies");
    }

    #[test]
    fn narrative_mentions_rating_and_counts() {
        let results = vec![AnalysisResult::degraded("x", "X", ResultStatus::InsufficientData, "none")];
        let summary = ExecutiveSummaryBuilder::new(StrategicCatalog::default()).build(results);
        let text = &summary.final_evaluation.detailed_evaluation;
        assert!(text.contains("Good"));
        assert!(text.contains("Analyses run: 1 (0 completed, 1 degraded)"));
        assert!(text.contains("Risk level: low (0 risks reported, 0 distinct)"));
    }

    #[test]
    fn risk_level_counts_repeated_risks() {
        let results: Vec<AnalysisResult> = (0..6)
            .map(|i| {
                let mut r = AnalysisResult::degraded("m", "M", ResultStatus::InsufficientData, "none");
                r.id = format!("module-{}", i);
                r.risks = vec!["Leverage is above the sector norm".to_string()];
                r
            })
            .collect();
        let summary = ExecutiveSummaryBuilder::new(StrategicCatalog::default()).build(results);
        let evaluation = &summary.final_evaluation;
        assert_eq!(evaluation.total_risks, 6);
        assert_eq!(evaluation.distinct_risks, 1);
        assert_eq!(evaluation.risk_level, "high");
        assert_eq!(summary.risks.len(), 1);
        assert!(evaluation.detailed_evaluation.contains("6 risks reported, 1 distinct"));
    }
}
