use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category string carried by every degraded result.
pub const DEGRADED_CATEGORY: &str = "error";

/// One reported section: field name -> optional value (`None` = not reported).
pub type StatementSection = BTreeMap<String, Option<f64>>;

/// The three sections a reporting period may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    BalanceSheet,
    IncomeStatement,
    CashFlowStatement,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Section::BalanceSheet => "balance sheet",
            Section::IncomeStatement => "income statement",
            Section::CashFlowStatement => "cash flow statement",
        }
    }
}

/// One reporting period of financial statements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStatement {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub balance_sheet: Option<StatementSection>,
    #[serde(default)]
    pub income_statement: Option<StatementSection>,
    #[serde(default)]
    pub cash_flow_statement: Option<StatementSection>,
}

impl FinancialStatement {
    pub fn section(&self, section: Section) -> Option<&StatementSection> {
        match section {
            Section::BalanceSheet => self.balance_sheet.as_ref(),
            Section::IncomeStatement => self.income_statement.as_ref(),
            Section::CashFlowStatement => self.cash_flow_statement.as_ref(),
        }
    }

    /// Reported value of a field, `None` when the section or field is absent.
    pub fn get(&self, section: Section, name: &str) -> Option<f64> {
        self.section(section)
            .and_then(|s| s.get(name).copied().flatten())
            .filter(|v| v.is_finite())
    }

    /// Builder used by fixtures and the CLI when assembling statements by hand.
    pub fn with_value(mut self, section: Section, name: &str, value: f64) -> Self {
        let slot = match section {
            Section::BalanceSheet => &mut self.balance_sheet,
            Section::IncomeStatement => &mut self.income_statement,
            Section::CashFlowStatement => &mut self.cash_flow_statement,
        };
        slot.get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), Some(value));
        self
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }
}

/// Company profile supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub employees: Option<u64>,
}

/// Coarse market risk regime used to adjust discount rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketRiskLevel {
    Low,
    Normal,
    High,
}

/// Market context for valuation and risk modules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    #[serde(default)]
    pub current_price: Option<f64>,
    /// Per-period market returns aligned with the company's period returns.
    #[serde(default)]
    pub market_returns: Vec<f64>,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    #[serde(default)]
    pub expected_market_return: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<MarketRiskLevel>,
}

/// Aggregate statistics for one comparison group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerGroup {
    #[serde(default)]
    pub averages: BTreeMap<String, f64>,
    #[serde(default)]
    pub samples: BTreeMap<String, Vec<f64>>,
}

/// Benchmark statistics keyed by group name (`peers`, `industry`, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkData {
    #[serde(default)]
    pub groups: BTreeMap<String, PeerGroup>,
}

impl BenchmarkData {
    pub fn group(&self, name: &str) -> Option<&PeerGroup> {
        self.groups.get(name)
    }

    /// Industry average for a metric, when the caller supplied one.
    pub fn industry_average(&self, metric: &str) -> Option<f64> {
        self.group("industry")
            .and_then(|g| g.averages.get(metric).copied())
    }
}

/// Everything a module may read. Built once per run and shared read-only.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub statements: Vec<FinancialStatement>,
    pub company: Option<Company>,
    pub market: Option<MarketData>,
    pub benchmark: Option<BenchmarkData>,
    /// z-score threshold for outlier-style modules
    pub outlier_threshold: f64,
}

impl AnalysisContext {
    pub fn new(statements: Vec<FinancialStatement>) -> Self {
        Self {
            statements,
            company: None,
            market: None,
            benchmark: None,
            outlier_threshold: 2.0,
        }
    }

    pub fn with_company(mut self, company: Option<Company>) -> Self {
        self.company = company;
        self
    }

    pub fn with_market(mut self, market: Option<MarketData>) -> Self {
        self.market = market;
        self
    }

    pub fn with_benchmark(mut self, benchmark: Option<BenchmarkData>) -> Self {
        self.benchmark = benchmark;
        self
    }

    pub fn with_outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = threshold;
        self
    }
}

/// The ten fixed analysis families, in registry execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Structural,
    Ratios,
    Flow,
    Comparative,
    Valuation,
    Performance,
    Modeling,
    Statistical,
    Portfolio,
    Intelligent,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Structural,
        Category::Ratios,
        Category::Flow,
        Category::Comparative,
        Category::Valuation,
        Category::Performance,
        Category::Modeling,
        Category::Statistical,
        Category::Portfolio,
        Category::Intelligent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Structural => "structural-analysis",
            Category::Ratios => "ratio-analysis",
            Category::Flow => "flow-analysis",
            Category::Comparative => "comparative-analysis",
            Category::Valuation => "valuation-analysis",
            Category::Performance => "performance-analysis",
            Category::Modeling => "modeling-analysis",
            Category::Statistical => "statistical-analysis",
            Category::Portfolio => "portfolio-analysis",
            Category::Intelligent => "intelligent-analysis",
        }
    }

    /// Declared module count per family. The registry refuses to build otherwise.
    pub fn expected_count(&self) -> usize {
        match self {
            Category::Structural => 15,
            Category::Ratios => 30,
            Category::Flow => 10,
            Category::Comparative => 10,
            Category::Valuation => 16,
            Category::Performance => 12,
            Category::Modeling => 15,
            Category::Statistical => 20,
            Category::Portfolio => 35,
            Category::Intelligent => 18,
        }
    }

    pub fn expected_total() -> usize {
        Self::ALL.iter().map(|c| c.expected_count()).sum()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Five-step rating, ordered low to high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Weak,
    Acceptable,
    Good,
    VeryGood,
    Excellent,
}

impl Rating {
    /// Numeric score used by the aggregate (1 to 5)
    pub fn to_score(&self) -> u8 {
        match self {
            Rating::Weak => 1,
            Rating::Acceptable => 2,
            Rating::Good => 3,
            Rating::VeryGood => 4,
            Rating::Excellent => 5,
        }
    }

    /// Bucket an averaged 1-5 score back to a rating.
    pub fn from_average(average: f64) -> Self {
        match average {
            a if a >= 4.5 => Rating::Excellent,
            a if a >= 3.5 => Rating::VeryGood,
            a if a >= 2.5 => Rating::Good,
            a if a >= 1.5 => Rating::Acceptable,
            _ => Rating::Weak,
        }
    }

    /// Map a module score to a rating using breakpoints at 90/70/50/30% of
    /// the maximum attainable score.
    pub fn from_score(score: u32, max_score: u32) -> Self {
        if max_score == 0 {
            return Rating::Weak;
        }
        let share = score as f64 / max_score as f64;
        match share {
            s if s >= 0.9 => Rating::Excellent,
            s if s >= 0.7 => Rating::VeryGood,
            s if s >= 0.5 => Rating::Good,
            s if s >= 0.3 => Rating::Acceptable,
            _ => Rating::Weak,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Rating::Weak => "Weak",
            Rating::Acceptable => "Acceptable",
            Rating::Good => "Good",
            Rating::VeryGood => "Very Good",
            Rating::Excellent => "Excellent",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Declarative chart descriptor rendered by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub data: Vec<ChartPoint>,
}

impl Chart {
    pub fn new(kind: ChartKind, title: impl Into<String>, data: Vec<ChartPoint>) -> Self {
        Self {
            kind,
            title: title.into(),
            data,
        }
    }

    pub fn bar(title: impl Into<String>, data: Vec<ChartPoint>) -> Self {
        Self::new(ChartKind::Bar, title, data)
    }

    pub fn line(title: impl Into<String>, data: Vec<ChartPoint>) -> Self {
        Self::new(ChartKind::Line, title, data)
    }

    pub fn pie(title: impl Into<String>, data: Vec<ChartPoint>) -> Self {
        Self::new(ChartKind::Pie, title, data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Swot {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

impl Swot {
    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
            && self.weaknesses.is_empty()
            && self.opportunities.is_empty()
            && self.threats.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalEvaluation {
    pub rating: Rating,
    pub score: u32,
    pub interpretation: String,
}

/// Why a result is (or is not) degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultStatus {
    Completed,
    InsufficientData,
    NotImplemented,
    Failed,
}

/// Output of one analysis module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub status: ResultStatus,
    pub results: serde_json::Value,
    pub charts: Vec<Chart>,
    pub recommendations: Vec<String>,
    pub risks: Vec<String>,
    pub predictions: Vec<String>,
    pub swot: Swot,
    pub final_evaluation: FinalEvaluation,
}

impl AnalysisResult {
    /// Degraded result: no narrative, weak rating, score 0, reason in the
    /// interpretation.
    pub fn degraded(
        id: &str,
        name: &str,
        status: ResultStatus,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: DEGRADED_CATEGORY.to_string(),
            description: reason.clone(),
            status,
            results: serde_json::json!({ "error": reason }),
            charts: Vec::new(),
            recommendations: Vec::new(),
            risks: Vec::new(),
            predictions: Vec::new(),
            swot: Swot::default(),
            final_evaluation: FinalEvaluation {
                rating: Rating::Weak,
                score: 0,
                interpretation: reason,
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.category == DEGRADED_CATEGORY
    }
}

/// Recommendations grouped for one audience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSection {
    pub audience: String,
    pub title: String,
    pub items: Vec<String>,
}

/// Strategic decisions per horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicDecisions {
    pub short_term: Vec<String>,
    pub medium_term: Vec<String>,
    pub long_term: Vec<String>,
    pub emergency: Vec<String>,
}

/// Combined evaluation across all modules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEvaluation {
    pub rating: Rating,
    pub average_score: f64,
    pub completed_modules: usize,
    pub degraded_modules: usize,
    /// Risk statements summed over every module, duplicates included
    pub total_risks: usize,
    pub distinct_risks: usize,
    pub risk_level: String,
    pub detailed_evaluation: String,
}

/// Executive report built once per engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub results: Vec<AnalysisResult>,
    pub recommendations: Vec<RecommendationSection>,
    pub all_recommendations: Vec<String>,
    pub risks: Vec<String>,
    pub predictions: Vec<String>,
    pub swot: Swot,
    pub final_evaluation: AggregateEvaluation,
    pub strategic_decisions: StrategicDecisions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_order_is_low_to_high() {
        assert!(Rating::Weak < Rating::Acceptable);
        assert!(Rating::VeryGood < Rating::Excellent);
        assert_eq!(Rating::Excellent.to_score(), 5);
    }

    #[test]
    fn rating_from_average_breakpoints() {
        assert_eq!(Rating::from_average(4.5), Rating::Excellent);
        assert_eq!(Rating::from_average(4.49), Rating::VeryGood);
        assert_eq!(Rating::from_average(2.5), Rating::Good);
        assert_eq!(Rating::from_average(1.5), Rating::Acceptable);
        assert_eq!(Rating::from_average(1.0), Rating::Weak);
    }

    #[test]
    fn rating_from_score_is_proportional() {
        assert_eq!(Rating::from_score(9, 10), Rating::Excellent);
        assert_eq!(Rating::from_score(7, 10), Rating::VeryGood);
        assert_eq!(Rating::from_score(5, 10), Rating::Good);
        assert_eq!(Rating::from_score(3, 10), Rating::Acceptable);
        assert_eq!(Rating::from_score(2, 10), Rating::Weak);
        assert_eq!(Rating::from_score(0, 0), Rating::Weak);
    }

    #[test]
    fn rating_serializes_kebab_case() {
        let json = serde_json::to_string(&Rating::VeryGood).unwrap();
        assert_eq!(json, "\"very-good\"");
    }

    #[test]
    fn statement_deserializes_nulls_as_unreported() {
        let raw = r#"{"balanceSheet":{"totalAssets":100.0,"cash":null}}"#;
        let stmt: FinancialStatement = serde_json::from_str(raw).unwrap();
        assert_eq!(stmt.get(Section::BalanceSheet, "totalAssets"), Some(100.0));
        assert_eq!(stmt.get(Section::BalanceSheet, "cash"), None);
        assert!(stmt.income_statement.is_none());
    }

    #[test]
    fn chart_kind_serializes_under_type() {
        let chart = Chart::pie("mix", vec![ChartPoint::new("a", 1.0)]);
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["type"], "pie");
    }

    #[test]
    fn degraded_result_shape() {
        let r = AnalysisResult::degraded("x", "X", ResultStatus::InsufficientData, "needs two periods");
        assert!(r.is_degraded());
        assert_eq!(r.final_evaluation.score, 0);
        assert_eq!(r.final_evaluation.rating, Rating::Weak);
        assert!(r.recommendations.is_empty());
        assert_eq!(r.final_evaluation.interpretation, "needs two periods");
    }

    #[test]
    fn taxonomy_total_is_181() {
        assert_eq!(Category::expected_total(), 181);
    }
}
