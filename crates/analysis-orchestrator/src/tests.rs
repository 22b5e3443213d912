use crate::aggregator;
use crate::*;
use analysis_core::{
    AnalysisModule, AnalysisResult, Category, FinalEvaluation, ModuleInfo, Rating, ResultStatus,
    Section, Swot,
};
use approx::assert_relative_eq;

fn statement(period: &str, revenue: f64, profit: f64) -> FinancialStatement {
    FinancialStatement::default()
        .with_period(period)
        .with_value(Section::BalanceSheet, "totalAssets", revenue * 2.0)
        .with_value(Section::BalanceSheet, "currentAssets", revenue * 0.6)
        .with_value(Section::BalanceSheet, "cash", revenue * 0.2)
        .with_value(Section::BalanceSheet, "currentLiabilities", revenue * 0.4)
        .with_value(Section::BalanceSheet, "totalLiabilities", revenue)
        .with_value(Section::BalanceSheet, "shareholdersEquity", revenue)
        .with_value(Section::IncomeStatement, "totalRevenue", revenue)
        .with_value(Section::IncomeStatement, "costOfGoodsSold", revenue * 0.6)
        .with_value(Section::IncomeStatement, "operatingExpenses", revenue * 0.2)
        .with_value(Section::IncomeStatement, "netIncome", profit)
        .with_value(Section::IncomeStatement, "netProfit", profit)
        .with_value(Section::CashFlowStatement, "operatingCashFlow", profit * 1.3)
        .with_value(Section::CashFlowStatement, "capitalExpenditures", -profit * 0.5)
}

fn history() -> Vec<FinancialStatement> {
    vec![
        statement("FY2021", 900.0, 80.0),
        statement("FY2022", 1000.0, 95.0),
        statement("FY2023", 1150.0, 110.0),
    ]
}

fn engine(mode: ExecutionMode) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(EngineConfig::default().with_execution_mode(mode)).unwrap()
}

/// Test double with a fixed rating, or a panic.
struct Fixed {
    info: ModuleInfo,
    rating: Option<Rating>,
}

impl Fixed {
    fn boxed(id: &'static str, category: Category, rating: Option<Rating>) -> Box<dyn AnalysisModule> {
        Box::new(Self {
            info: ModuleInfo::new(id, id, "", category, 0),
            rating,
        })
    }
}

impl AnalysisModule for Fixed {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn run(&self, _ctx: &AnalysisContext) -> AnalysisResult {
        let Some(rating) = self.rating else {
            panic!("boom in {}", self.info.id);
        };
        AnalysisResult {
            id: self.info.id.to_string(),
            name: self.info.name.to_string(),
            category: self.info.category.as_str().to_string(),
            description: String::new(),
            status: ResultStatus::Completed,
            results: serde_json::json!({}),
            charts: Vec::new(),
            recommendations: vec!["Improve credit control".to_string()],
            risks: vec![format!("Risk from {}", self.info.id)],
            predictions: Vec::new(),
            swot: Swot::default(),
            final_evaluation: FinalEvaluation {
                rating,
                score: 1,
                interpretation: String::new(),
            },
        }
    }
}

fn custom(modules: Vec<Box<dyn AnalysisModule>>, mode: ExecutionMode) -> AnalysisOrchestrator {
    let config = EngineConfig::default().with_execution_mode(mode);
    AnalysisOrchestrator::with_parts(
        Arc::new(CategoryRegistry::from_modules(modules)),
        StrategicCatalog::default(),
        &config,
    )
}

#[test]
fn every_input_yields_one_result_per_module() {
    let engine = engine(ExecutionMode::Parallel);
    let inputs = vec![
        Vec::new(),
        vec![statement("FY2023", 100.0, 10.0)],
        vec![FinancialStatement::default()],
        history(),
    ];
    for statements in inputs {
        let summary = engine.run_all_analyses(statements, None, None, None);
        assert_eq!(summary.results.len(), 181);
        assert_eq!(
            summary.final_evaluation.completed_modules + summary.final_evaluation.degraded_modules,
            181
        );
    }
}

#[test]
fn identical_inputs_give_identical_output() {
    let engine = engine(ExecutionMode::Parallel);
    let a = serde_json::to_string(&engine.run_all_analyses(history(), None, None, None)).unwrap();
    let b = serde_json::to_string(&engine.run_all_analyses(history(), None, None, None)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn parallel_order_matches_registry_order() {
    let parallel = engine(ExecutionMode::Parallel).run_all_analyses(history(), None, None, None);
    let sequential = engine(ExecutionMode::Sequential).run_all_analyses(history(), None, None, None);
    assert_eq!(parallel, sequential);

    let registry = CategoryRegistry::standard().unwrap();
    let ids: Vec<&str> = parallel.results.iter().map(|r| r.id.as_str()).collect();
    let expected: Vec<&str> = registry.modules().map(|m| m.info().id).collect();
    assert_eq!(ids, expected);
}

#[test]
fn single_period_degrades_multi_period_modules() {
    let registry = CategoryRegistry::standard().unwrap();
    let summary = engine(ExecutionMode::Sequential).run_all_analyses(
        vec![statement("FY2023", 100.0, 10.0)],
        None,
        None,
        None,
    );
    for (module, result) in registry.modules().zip(&summary.results) {
        if module.info().min_periods >= 2 {
            assert!(result.is_degraded(), "{} should be degraded", result.id);
            assert_eq!(result.final_evaluation.score, 0);
            assert_eq!(result.status, ResultStatus::InsufficientData);
        }
    }
}

#[test]
fn empty_statements_degrade_guarded_modules() {
    let registry = CategoryRegistry::standard().unwrap();
    let summary = engine(ExecutionMode::Parallel).run_all_analyses(Vec::new(), None, None, None);
    for (module, result) in registry.modules().zip(&summary.results) {
        if module.info().min_periods >= 1 {
            assert_eq!(result.category, "error", "{}", result.id);
        }
    }
    assert_eq!(summary.final_evaluation.completed_modules, 0);
    assert_eq!(summary.final_evaluation.rating, Rating::Good);
}

#[test]
fn revenue_scenarios() {
    let engine = engine(ExecutionMode::Sequential);
    let pair = |prev: f64, cur: f64| vec![statement("FY2022", prev, 10.0), statement("FY2023", cur, 15.0)];

    let up = engine.run_all_analyses(pair(100.0, 120.0), None, None, None);
    let r = up.results.iter().find(|r| r.id == "revenue-performance").unwrap();
    assert_relative_eq!(r.results["revenueGrowth"].as_f64().unwrap(), 20.0, epsilon = 1e-9);
    assert!(r.final_evaluation.rating >= Rating::Good);

    let down = engine.run_all_analyses(pair(100.0, 80.0), None, None, None);
    let r = down.results.iter().find(|r| r.id == "revenue-performance").unwrap();
    assert_relative_eq!(r.results["revenueGrowth"].as_f64().unwrap(), -20.0, epsilon = 1e-9);
    assert!(r.final_evaluation.rating <= Rating::Acceptable);
    assert!(r.risks.iter().any(|x| x.to_lowercase().contains("declining revenue")));
    assert!(down.risks.contains(&r.risks[0]));
}

#[test]
fn aggregate_follows_unanimous_ratings() {
    for rating in [Rating::Excellent, Rating::Weak] {
        let modules = vec![
            Fixed::boxed("a", Category::Ratios, Some(rating)),
            Fixed::boxed("b", Category::Flow, Some(rating)),
            Fixed::boxed("c", Category::Structural, Some(rating)),
        ];
        let summary = custom(modules, ExecutionMode::Parallel).run_all_analyses(history(), None, None, None);
        assert_eq!(summary.final_evaluation.rating, rating);
    }
}

#[test]
fn panicking_module_is_isolated() {
    let modules = vec![
        Fixed::boxed("fine", Category::Ratios, Some(Rating::VeryGood)),
        Fixed::boxed("broken", Category::Ratios, None),
        Fixed::boxed("first", Category::Structural, Some(Rating::Good)),
    ];
    let summary = custom(modules, ExecutionMode::Parallel).run_all_analyses(Vec::new(), None, None, None);

    let ids: Vec<&str> = summary.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "fine", "broken"]);

    let broken = &summary.results[2];
    assert!(broken.is_degraded());
    assert_eq!(broken.status, ResultStatus::Failed);
    assert!(broken.final_evaluation.interpretation.contains("boom in broken"));
    assert_eq!(summary.final_evaluation.degraded_modules, 1);
    assert_relative_eq!(summary.final_evaluation.average_score, 3.5);
}

#[test]
fn aggregation_is_idempotent() {
    let summary = engine(ExecutionMode::Parallel).run_all_analyses(history(), None, None, None);
    let again = ExecutiveSummaryBuilder::new(StrategicCatalog::default()).build(summary.results.clone());
    assert_eq!(again.all_recommendations, summary.all_recommendations);
    assert_eq!(again.risks, summary.risks);
    assert_eq!(again.swot, summary.swot);
    assert_eq!(aggregator::all_risks(&summary.results), summary.risks);
}

#[test]
fn duplicate_narrative_is_merged() {
    let modules = vec![
        Fixed::boxed("a", Category::Ratios, Some(Rating::Good)),
        Fixed::boxed("b", Category::Ratios, Some(Rating::Good)),
    ];
    let summary = custom(modules, ExecutionMode::Sequential).run_all_analyses(history(), None, None, None);
    assert_eq!(summary.all_recommendations, vec!["Improve credit control"]);
    assert_eq!(summary.risks.len(), 2);
    assert_eq!(summary.final_evaluation.risk_level, "medium");
    let lenders = &summary.recommendations[1];
    assert_eq!(lenders.audience, "lenders-and-financial-institutions");
    assert_eq!(lenders.items.len(), 1);
}

#[test]
fn async_entry_point_matches_sync() {
    let engine = Arc::new(engine(ExecutionMode::Parallel));
    let expected = engine.run_all_analyses(history(), None, None, None);
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let actual = runtime
        .block_on(engine.clone().analyze(history(), None, None, None))
        .unwrap();
    assert_eq!(actual, expected);
}
