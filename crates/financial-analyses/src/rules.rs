//! Declarative scoring and narrative evaluation.
//!
//! A module is a compute step producing named metrics plus a static
//! [`RuleSet`] describing how those metrics score and what they say. The
//! evaluator owns the guard, the scoring arithmetic, the rating breakpoints
//! and the result assembly so catalogue entries only describe what differs.

use std::collections::BTreeMap;

use analysis_core::statements::{require_periods, require_section};
use analysis_core::{
    AnalysisContext, AnalysisError, AnalysisModule, AnalysisResult, Chart, FinalEvaluation,
    ModuleInfo, Rating, ResultStatus, Section, Swot,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Threshold test against one metric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Above(f64),
    AtLeast(f64),
    Below(f64),
    AtMost(f64),
    /// Inclusive on both ends.
    Between(f64, f64),
    AbsBelow(f64),
    AbsAbove(f64),
}

impl Condition {
    pub fn holds(&self, v: f64) -> bool {
        match *self {
            Condition::Above(t) => v > t,
            Condition::AtLeast(t) => v >= t,
            Condition::Below(t) => v < t,
            Condition::AtMost(t) => v <= t,
            Condition::Between(lo, hi) => v >= lo && v <= hi,
            Condition::AbsBelow(t) => v.abs() < t,
            Condition::AbsAbove(t) => v.abs() > t,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub when: Condition,
    pub points: u32,
}

pub const fn tier(when: Condition, points: u32) -> Tier {
    Tier { when, points }
}

/// One weighted sub-check. Tiers are tried in order; the first match scores.
#[derive(Debug)]
pub struct ScoreCheck {
    pub metric: &'static str,
    pub tiers: &'static [Tier],
}

impl ScoreCheck {
    pub fn max_points(&self) -> u32 {
        self.tiers.iter().map(|t| t.points).max().unwrap_or(0)
    }

    /// Points for a value; an unreported metric scores nothing.
    pub fn points(&self, value: Option<f64>) -> u32 {
        value
            .and_then(|v| self.tiers.iter().find(|t| t.when.holds(v)))
            .map(|t| t.points)
            .unwrap_or(0)
    }
}

/// Narrative fragment. Templates may use `{value}`, `{abs}` and `{name}`.
#[derive(Debug, Clone, Copy)]
pub enum Emit {
    Recommend(&'static str),
    Risk(&'static str),
    Predict(&'static str),
    Strength(&'static str),
    Weakness(&'static str),
    Opportunity(&'static str),
    Threat(&'static str),
    Note(&'static str),
}

#[derive(Debug)]
pub struct NarrativeRule {
    pub metric: &'static str,
    pub when: Condition,
    pub emits: &'static [Emit],
}

#[derive(Debug)]
pub struct RuleSet {
    pub checks: &'static [ScoreCheck],
    pub rules: &'static [NarrativeRule],
    /// Module-invariant SWOT entries appended to every completed result.
    pub opportunities: &'static [&'static str],
    pub threats: &'static [&'static str],
}

impl RuleSet {
    pub fn max_score(&self) -> u32 {
        self.checks.iter().map(|c| c.max_points()).sum()
    }
}

/// Text accumulated for one result.
#[derive(Debug, Clone, Default)]
pub struct Narrative {
    pub recommendations: Vec<String>,
    pub risks: Vec<String>,
    pub predictions: Vec<String>,
    pub swot: Swot,
    pub notes: Vec<String>,
}

impl Narrative {
    fn emit(&mut self, emit: &Emit, value: f64, name: &str) {
        let render = |t: &str| {
            t.replace("{value}", &format!("{:.1}", value))
                .replace("{abs}", &format!("{:.1}", value.abs()))
                .replace("{name}", name)
        };
        match emit {
            Emit::Recommend(t) => self.recommendations.push(render(t)),
            Emit::Risk(t) => self.risks.push(render(t)),
            Emit::Predict(t) => self.predictions.push(render(t)),
            Emit::Strength(t) => self.swot.strengths.push(render(t)),
            Emit::Weakness(t) => self.swot.weaknesses.push(render(t)),
            Emit::Opportunity(t) => self.swot.opportunities.push(render(t)),
            Emit::Threat(t) => self.swot.threats.push(render(t)),
            Emit::Note(t) => self.notes.push(render(t)),
        }
    }

    fn append(&mut self, other: Narrative) {
        self.recommendations.extend(other.recommendations);
        self.risks.extend(other.risks);
        self.predictions.extend(other.predictions);
        self.swot.strengths.extend(other.swot.strengths);
        self.swot.weaknesses.extend(other.swot.weaknesses);
        self.swot.opportunities.extend(other.swot.opportunities);
        self.swot.threats.extend(other.swot.threats);
        self.notes.extend(other.notes);
    }
}

/// Output of a compute step: scored metrics, free-form details, charts and
/// any narrative the static rules cannot express.
#[derive(Debug, Clone, Default)]
pub struct Computed {
    metrics: BTreeMap<&'static str, f64>,
    details: Map<String, Value>,
    charts: Vec<Chart>,
    pub narrative: Narrative,
}

impl Computed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a metric. Non-finite values are stored as 0.
    pub fn metric(mut self, key: &'static str, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &'static str, value: f64) {
        self.metrics.insert(key, if value.is_finite() { value } else { 0.0 });
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn detail(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.details.insert(key.to_string(), value);
        self
    }

    pub fn chart(mut self, chart: Chart) -> Self {
        self.charts.push(chart);
        self
    }

    fn payload(&self) -> Value {
        let mut out = self.details.clone();
        for (k, v) in &self.metrics {
            out.insert((*k).to_string(), Value::from(*v));
        }
        Value::Object(out)
    }
}

pub type ComputeFn =
    Box<dyn Fn(&AnalysisContext) -> Result<Computed, AnalysisError> + Send + Sync>;

/// Generic module: guard, compute, score, narrate.
pub struct RuleModule {
    info: ModuleInfo,
    sections: &'static [Section],
    rules: &'static RuleSet,
    compute: ComputeFn,
}

impl RuleModule {
    pub fn new<F>(
        info: ModuleInfo,
        sections: &'static [Section],
        rules: &'static RuleSet,
        compute: F,
    ) -> Self
    where
        F: Fn(&AnalysisContext) -> Result<Computed, AnalysisError> + Send + Sync + 'static,
    {
        Self {
            info,
            sections,
            rules,
            compute: Box::new(compute),
        }
    }

    pub fn boxed(self) -> Box<dyn AnalysisModule> {
        Box::new(self)
    }

    fn guard(&self, ctx: &AnalysisContext) -> Result<(), AnalysisError> {
        require_periods(&ctx.statements, self.info.min_periods)?;
        for section in self.sections {
            require_section(&ctx.statements, *section, self.info.min_periods)?;
        }
        Ok(())
    }

    fn evaluate(&self, ctx: &AnalysisContext) -> Result<AnalysisResult, AnalysisError> {
        self.guard(ctx)?;
        let computed = (self.compute)(ctx)?;
        let name = self.info.name;

        let score: u32 = self
            .rules
            .checks
            .iter()
            .map(|c| c.points(computed.get(c.metric)))
            .sum();
        let max_score = self.rules.max_score();
        let rating = Rating::from_score(score, max_score);

        let mut narrative = Narrative::default();
        for rule in self.rules.rules {
            if let Some(v) = computed.get(rule.metric) {
                if rule.when.holds(v) {
                    for emit in rule.emits {
                        narrative.emit(emit, v, name);
                    }
                }
            }
        }
        let payload = computed.payload();
        let Computed {
            charts,
            narrative: extra,
            ..
        } = computed;
        narrative.append(extra);
        narrative
            .swot
            .opportunities
            .extend(self.rules.opportunities.iter().map(|s| s.to_string()));
        narrative
            .swot
            .threats
            .extend(self.rules.threats.iter().map(|s| s.to_string()));

        let mut interpretation = format!(
            "{} is rated {} with a score of {}/{}.",
            name,
            rating.to_label(),
            score,
            max_score
        );
        for note in &narrative.notes {
            interpretation.push(' ');
            interpretation.push_str(note);
        }

        Ok(AnalysisResult {
            id: self.info.id.to_string(),
            name: name.to_string(),
            category: self.info.category.as_str().to_string(),
            description: self.info.description.to_string(),
            status: ResultStatus::Completed,
            results: payload,
            charts,
            recommendations: narrative.recommendations,
            risks: narrative.risks,
            predictions: narrative.predictions,
            swot: narrative.swot,
            final_evaluation: FinalEvaluation {
                rating,
                score,
                interpretation,
            },
        })
    }
}

impl AnalysisModule for RuleModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn run(&self, ctx: &AnalysisContext) -> AnalysisResult {
        self.evaluate(ctx)
            .unwrap_or_else(|err| degraded(&self.info, &err))
    }
}

pub fn status_for(err: &AnalysisError) -> ResultStatus {
    match err {
        AnalysisError::NotImplemented(_) => ResultStatus::NotImplemented,
        AnalysisError::ModulePanicked(_) | AnalysisError::CalculationError(_) => {
            ResultStatus::Failed
        }
        _ => ResultStatus::InsufficientData,
    }
}

pub fn degraded(info: &ModuleInfo, err: &AnalysisError) -> AnalysisResult {
    AnalysisResult::degraded(info.id, info.name, status_for(err), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Category, FinancialStatement};

    static GROWTH: RuleSet = RuleSet {
        checks: &[
            ScoreCheck {
                metric: "growth",
                tiers: &[
                    Tier { when: Condition::Above(10.0), points: 3 },
                    Tier { when: Condition::Above(0.0), points: 1 },
                ],
            },
            ScoreCheck {
                metric: "margin",
                tiers: &[Tier { when: Condition::AtLeast(20.0), points: 2 }],
            },
        ],
        rules: &[NarrativeRule {
            metric: "growth",
            when: Condition::Below(0.0),
            emits: &[
                Emit::Risk("{name} shows a decline of {abs}%"),
                Emit::Note("Growth was {value}%."),
            ],
        }],
        opportunities: &["Expand into adjacent markets"],
        threats: &[],
    };

    fn module(growth: f64) -> RuleModule {
        RuleModule::new(
            ModuleInfo::new("toy", "Toy analysis", "test module", Category::Performance, 1),
            &[Section::IncomeStatement],
            &GROWTH,
            move |_| Ok(Computed::new().metric("growth", growth)),
        )
    }

    fn ctx() -> AnalysisContext {
        AnalysisContext::new(vec![FinancialStatement::default().with_value(
            Section::IncomeStatement,
            "totalRevenue",
            1.0,
        )])
    }

    #[test]
    fn first_matching_tier_scores_and_missing_metric_is_zero() {
        let r = module(12.0).run(&ctx());
        assert_eq!(r.final_evaluation.score, 3);
        assert_eq!(GROWTH.max_score(), 5);
        assert_eq!(r.final_evaluation.rating, Rating::Good);
        assert_eq!(r.results["growth"], 12.0);
        assert_eq!(r.status, ResultStatus::Completed);
    }

    #[test]
    fn templates_render_value_and_name() {
        let r = module(-4.3).run(&ctx());
        assert_eq!(r.risks, vec!["Toy analysis shows a decline of 4.3%".to_string()]);
        assert!(r.final_evaluation.interpretation.ends_with("Growth was -4.3%."));
        assert_eq!(r.swot.opportunities, vec!["Expand into adjacent markets".to_string()]);
        assert_eq!(r.final_evaluation.rating, Rating::Weak);
    }

    #[test]
    fn guard_degrades_before_compute() {
        let r = module(50.0).run(&AnalysisContext::new(Vec::new()));
        assert!(r.is_degraded());
        assert_eq!(r.status, ResultStatus::InsufficientData);
        assert_eq!(r.final_evaluation.score, 0);

        let no_income = AnalysisContext::new(vec![FinancialStatement::default().with_value(
            Section::BalanceSheet,
            "totalAssets",
            1.0,
        )]);
        let r = module(50.0).run(&no_income);
        assert!(r.final_evaluation.interpretation.contains("income statement"));
    }

    #[test]
    fn compute_errors_degrade() {
        let m = RuleModule::new(
            ModuleInfo::new("bad", "Bad", "", Category::Ratios, 1),
            &[],
            &GROWTH,
            |_| Err(AnalysisError::CalculationError("division".into())),
        );
        let r = m.run(&ctx());
        assert_eq!(r.status, ResultStatus::Failed);
        assert!(r.is_degraded());
    }

    #[test]
    fn non_finite_metrics_are_zeroed() {
        let c = Computed::new().metric("x", f64::NAN);
        assert_eq!(c.get("x"), Some(0.0));
    }
}
