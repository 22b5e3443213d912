//! Reduces a batch of module results into the summary fields.

use analysis_core::{AnalysisResult, Rating, RecommendationSection, Swot};
use std::collections::HashSet;

/// Audience buckets in report order: (audience key, title, keywords).
const AUDIENCES: [(&str, &str, &[&str]); 4] = [
    (
        "owners-and-management",
        "Owners and management",
        &["management", "strategy", "improve"],
    ),
    (
        "lenders-and-financial-institutions",
        "Lenders and financial institutions",
        &["credit", "loan", "financing"],
    ),
    ("investors", "Investors", &["investment", "return", "risk"]),
    (
        "appraisers-and-analysts",
        "Appraisers and analysts",
        &["valuation", "analysis", "comparison"],
    ),
];

/// Average score used when no module produced a usable evaluation.
const NEUTRAL_SCORE: f64 = 3.0;

/// First-seen order, exact string equality.
pub fn dedup<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

pub fn all_recommendations(results: &[AnalysisResult]) -> Vec<String> {
    dedup(results.iter().flat_map(|r| &r.recommendations))
}

pub fn all_risks(results: &[AnalysisResult]) -> Vec<String> {
    dedup(results.iter().flat_map(|r| &r.risks))
}

pub fn all_predictions(results: &[AnalysisResult]) -> Vec<String> {
    dedup(results.iter().flat_map(|r| &r.predictions))
}

/// Keyword bucketing; a recommendation may land in several sections or none.
/// Every section is emitted, even when empty.
pub fn categorize_recommendations(recommendations: &[String]) -> Vec<RecommendationSection> {
    AUDIENCES
        .iter()
        .map(|(audience, title, keywords)| {
            let items = recommendations
                .iter()
                .filter(|rec| {
                    let lower = rec.to_lowercase();
                    keywords.iter().any(|k| lower.contains(k))
                })
                .cloned()
                .collect();
            RecommendationSection {
                audience: audience.to_string(),
                title: title.to_string(),
                items,
            }
        })
        .collect()
}

pub fn merge_swot(results: &[AnalysisResult]) -> Swot {
    Swot {
        strengths: dedup(results.iter().flat_map(|r| &r.swot.strengths)),
        weaknesses: dedup(results.iter().flat_map(|r| &r.swot.weaknesses)),
        opportunities: dedup(results.iter().flat_map(|r| &r.swot.opportunities)),
        threats: dedup(results.iter().flat_map(|r| &r.swot.threats)),
    }
}

/// Mean 1-5 score over non-degraded results, with the number of results
/// left out of the average.
pub fn average_score(results: &[AnalysisResult]) -> (f64, usize) {
    let valid: Vec<f64> = results
        .iter()
        .filter(|r| !r.is_degraded())
        .map(|r| r.final_evaluation.rating.to_score() as f64)
        .collect();
    let degraded = results.len() - valid.len();
    if valid.is_empty() {
        return (NEUTRAL_SCORE, degraded);
    }
    (valid.iter().sum::<f64>() / valid.len() as f64, degraded)
}

pub fn aggregate_rating(results: &[AnalysisResult]) -> Rating {
    Rating::from_average(average_score(results).0)
}

/// Risks emitted across all modules, counted before dedup.
pub fn total_risk_count(results: &[AnalysisResult]) -> usize {
    results.iter().map(|r| r.risks.len()).sum()
}

/// Coarse bucketing of the total risk count.
pub fn risk_level(total_risks: usize) -> &'static str {
    match total_risks {
        0 => "low",
        1..=5 => "medium",
        6..=10 => "high",
        _ => "very high",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{FinalEvaluation, ResultStatus};

    fn result(id: &str, rating: Rating, recs: &[&str], risks: &[&str]) -> AnalysisResult {
        AnalysisResult {
            id: id.to_string(),
            name: id.to_string(),
            category: "ratios".to_string(),
            description: String::new(),
            status: ResultStatus::Completed,
            results: serde_json::json!({}),
            charts: Vec::new(),
            recommendations: recs.iter().map(|s| s.to_string()).collect(),
            risks: risks.iter().map(|s| s.to_string()).collect(),
            predictions: Vec::new(),
            swot: Swot {
                strengths: vec!["Strong margins".to_string()],
                ..Swot::default()
            },
            final_evaluation: FinalEvaluation {
                rating,
                score: 0,
                interpretation: String::new(),
            },
        }
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let items: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(dedup(&items), vec!["b", "a", "c"]);
    }

    #[test]
    fn buckets_by_keyword_and_may_double_count() {
        let recs = vec![
            "Improve credit control".to_string(),
            "Hold for the long run".to_string(),
            "Compare the valuation with peers".to_string(),
        ];
        let sections = categorize_recommendations(&recs);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].audience, "owners-and-management");
        assert_eq!(sections[0].items, vec!["Improve credit control"]);
        assert_eq!(sections[1].items, vec!["Improve credit control"]);
        assert!(sections[2].items.is_empty());
        assert_eq!(sections[3].items, vec!["Compare the valuation with peers"]);
    }

    #[test]
    fn degraded_results_are_excluded_from_average() {
        let results = vec![
            result("a", Rating::Excellent, &[], &[]),
            result("b", Rating::VeryGood, &[], &[]),
            AnalysisResult::degraded("c", "C", ResultStatus::InsufficientData, "no data"),
        ];
        let (avg, degraded) = average_score(&results);
        assert!((avg - 4.5).abs() < 1e-12);
        assert_eq!(degraded, 1);
        assert_eq!(aggregate_rating(&results), Rating::Excellent);
    }

    #[test]
    fn no_valid_results_defaults_to_good() {
        let results = vec![AnalysisResult::degraded("c", "C", ResultStatus::NotImplemented, "todo")];
        assert_eq!(average_score(&results), (3.0, 1));
        assert_eq!(aggregate_rating(&results), Rating::Good);
        assert_eq!(aggregate_rating(&[]), Rating::Good);
    }

    #[test]
    fn risk_level_is_monotonic() {
        assert_eq!(risk_level(0), "low");
        assert_eq!(risk_level(5), "medium");
        assert_eq!(risk_level(6), "high");
        assert_eq!(risk_level(10), "high");
        assert_eq!(risk_level(11), "very high");
    }

    #[test]
    fn swot_merge_dedups_per_bucket() {
        let results = vec![
            result("a", Rating::Good, &[], &["Debt is high"]),
            result("b", Rating::Good, &[], &["Debt is high"]),
        ];
        let swot = merge_swot(&results);
        assert_eq!(swot.strengths, vec!["Strong margins"]);
        assert!(swot.threats.is_empty());
        assert_eq!(all_risks(&results), vec!["Debt is high"]);
        assert_eq!(total_risk_count(&results), 2);
    }
}
