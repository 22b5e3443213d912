//! Performance analyses: growth and efficiency of each statement line
//! between the two latest periods.

use analysis_core::metrics::{consistency, descriptive_stats, growth_percent, percent, ratio};
use analysis_core::{AnalysisContext, AnalysisModule, Category, FinancialStatement, ModuleInfo, Section};

use crate::common::{pair, trend, Item};
use crate::fields as f;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Performance;
const IS: &[Section] = &[Section::IncomeStatement];
const BS: &[Section] = &[Section::BalanceSheet];
const BS_IS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];
const BS_IS_CF: &[Section] = &[
    Section::BalanceSheet,
    Section::IncomeStatement,
    Section::CashFlowStatement,
];

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        revenue(),
        cost(),
        profitability(),
        liquidity(),
        operational(),
        financial(),
        investment(),
        marketing(),
        production(),
        administrative(),
        technical(),
        overall_efficiency(),
    ]
}

fn info(id: &'static str, name: &'static str, description: &'static str) -> ModuleInfo {
    ModuleInfo::new(id, name, description, CAT, 2)
}

/// Level of a ratio in the latest period and its change from the previous one.
fn level_and_change(
    c: Computed,
    key: &'static str,
    change_key: &'static str,
    item: Item,
    cur: &FinancialStatement,
    prev: &FinancialStatement,
) -> Computed {
    c.metric(key, item(cur)).metric(change_key, item(cur) - item(prev))
}

fn industry(ctx: &AnalysisContext, metric: &str) -> Option<f64> {
    ctx.benchmark.as_ref().and_then(|b| b.industry_average(metric))
}

/// Coefficient of variation of revenue in percent; needs three periods.
fn revenue_volatility(statements: &[FinancialStatement]) -> f64 {
    if statements.len() < 3 {
        return 0.0;
    }
    let revenues: Vec<f64> = statements.iter().map(f::revenue).collect();
    descriptive_stats(&revenues).coefficient_of_variation * 100.0
}

static REVENUE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "revenueGrowth",
            tiers: &[tier(Above(10.0), 3), tier(Above(5.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "growthComparison",
            tiers: &[tier(Above(5.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "revenueConsistency",
            tiers: &[tier(Above(80.0), 2), tier(Above(60.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "revenueGrowth",
            when: Below(0.0),
            emits: &[
                Recommend("Improve the marketing strategy to win back revenue"),
                Recommend("Develop new products and services"),
                Risk("Declining revenue may erode growth capacity"),
                Weakness("Revenue fell by {abs}%"),
                Predict("Revenue may keep falling without corrective action"),
                Note("Revenue declined by {abs}%."),
            ],
        },
        NarrativeRule {
            metric: "revenueGrowth",
            when: Above(0.0),
            emits: &[
                Strength("Revenue grew by {value}%"),
                Predict("Revenue growth is expected to continue"),
                Note("Revenue grew by {value}%."),
            ],
        },
        NarrativeRule {
            metric: "growthComparison",
            when: Below(0.0),
            emits: &[Recommend("Improve performance to outpace the industry; review the pricing strategy")],
        },
        NarrativeRule {
            metric: "revenueVolatility",
            when: Above(20.0),
            emits: &[
                Recommend("Diversify revenue sources and improve risk management"),
                Risk("High revenue volatility ({value}%)"),
            ],
        },
    ],
    opportunities: &["Expansion into new markets", "Development of new products"],
    threats: &["Intensifying market competition"],
};

fn revenue() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("revenue-performance", "Revenue performance", "Revenue growth, stability and position against the industry"),
        IS,
        &REVENUE,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let (c, p) = (f::revenue(cur), f::revenue(prev));
            let growth = growth_percent(p, c);
            let industry_growth = industry(ctx, "revenueGrowth").unwrap_or(0.0);
            let revenues: Vec<f64> = ctx.statements.iter().map(f::revenue).collect();
            Ok(Computed::new()
                .metric("revenueGrowth", growth)
                .metric("revenueGrowthAmount", c - p)
                .metric("averageRevenue", (c + p) / 2.0)
                .metric("revenueVolatility", revenue_volatility(&ctx.statements))
                .metric("revenueConsistency", consistency(&revenues))
                .metric("industryAverageGrowth", industry_growth)
                .metric("growthComparison", growth - industry_growth)
                .chart(trend("Revenue by period", &ctx.statements, f::revenue)))
        },
    )
    .boxed()
}

static COST: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "costRatio",
            tiers: &[tier(AtMost(70.0), 3), tier(AtMost(85.0), 2), tier(AtMost(95.0), 1)],
        },
        ScoreCheck {
            metric: "costEfficiency",
            tiers: &[tier(Above(2.0), 2), tier(AtLeast(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "costEfficiency",
            when: Below(0.0),
            emits: &[
                Recommend("Improve cost management; costs grow faster than revenue"),
                Risk("Costs outpace revenue by {abs} percentage points"),
            ],
        },
        NarrativeRule {
            metric: "costRatio",
            when: Above(95.0),
            emits: &[Weakness("Costs consume {value}% of revenue")],
        },
    ],
    opportunities: &["Procurement savings and process automation"],
    threats: &[
        "Rising input costs",
        "Inflation",
    ],
};

fn cost() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("cost-performance", "Cost performance", "Cost level and cost growth relative to revenue"),
        IS,
        &COST,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let cost_growth = growth_percent(f::total_expenses(prev), f::total_expenses(cur));
            let revenue_growth = growth_percent(f::revenue(prev), f::revenue(cur));
            Ok(Computed::new()
                .metric("costRatio", percent(f::total_expenses(cur), f::revenue(cur)))
                .metric("costGrowth", cost_growth)
                .metric("revenueGrowth", revenue_growth)
                .metric("costEfficiency", revenue_growth - cost_growth)
                .chart(trend("Total expenses by period", &ctx.statements, f::total_expenses)))
        },
    )
    .boxed()
}

fn net_margin(s: &FinancialStatement) -> f64 {
    percent(f::net_income(s), f::revenue(s))
}

static PROFITABILITY: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "netMargin",
            tiers: &[tier(AtLeast(15.0), 3), tier(AtLeast(8.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "marginChange",
            tiers: &[tier(Above(1.0), 2), tier(AtLeast(-1.0), 1)],
        },
        ScoreCheck {
            metric: "profitGrowth",
            tiers: &[tier(Above(10.0), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "marginChange",
            when: Below(-1.0),
            emits: &[
                Recommend("Improve the profitability strategy and review the cost structure"),
                Risk("Net margin contracted by {abs} points"),
            ],
        },
        NarrativeRule {
            metric: "profitGrowth",
            when: Above(10.0),
            emits: &[Strength("Net income grew {value}%"), Predict("Profit growth is likely to support future returns")],
        },
    ],
    opportunities: &[
        "Improve profit margins",
        "Focus on the most profitable products",
    ],
    threats: &[
        "Price competition",
        "Rising costs",
    ],
};

fn profitability() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("profitability-performance", "Profitability performance", "Margin level and its development"),
        IS,
        &PROFITABILITY,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let c = level_and_change(Computed::new(), "netMargin", "marginChange", net_margin, cur, prev);
            Ok(c.metric("profitGrowth", growth_percent(f::net_income(prev), f::net_income(cur)))
                .chart(trend("Net income by period", &ctx.statements, f::net_income)))
        },
    )
    .boxed()
}

fn current_ratio(s: &FinancialStatement) -> f64 {
    ratio(f::current_assets(s), f::current_liabilities(s))
}

static LIQUIDITY: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "currentRatio",
            tiers: &[tier(AtLeast(1.5), 3), tier(AtLeast(1.0), 2), tier(AtLeast(0.8), 1)],
        },
        ScoreCheck {
            metric: "currentRatioChange",
            tiers: &[tier(AtLeast(0.0), 2), tier(AtLeast(-0.2), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "currentRatioChange",
        when: Below(-0.2),
        emits: &[
            Risk("Liquidity deteriorated this period"),
            Recommend("Improve cash management and keep a standby credit line"),
        ],
    }],
    opportunities: &[
        "Improve cash management",
        "Invest idle cash",
    ],
    threats: &[
        "Tighter credit conditions",
        "Delayed collections",
    ],
};

fn liquidity() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("liquidity-performance", "Liquidity performance", "Development of short-term liquidity"),
        BS,
        &LIQUIDITY,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let c = level_and_change(Computed::new(), "currentRatio", "currentRatioChange", current_ratio, cur, prev);
            Ok(c.metric("cashGrowth", growth_percent(f::cash(prev), f::cash(cur)))
                .chart(trend("Current ratio by period", &ctx.statements, current_ratio)))
        },
    )
    .boxed()
}

fn operating_margin(s: &FinancialStatement) -> f64 {
    percent(f::operating_income(s), f::revenue(s))
}

fn asset_turnover(s: &FinancialStatement) -> f64 {
    ratio(f::revenue(s), f::total_assets(s))
}

static OPERATIONAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "operatingMargin",
            tiers: &[tier(AtLeast(15.0), 3), tier(AtLeast(8.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "operatingMarginChange",
            tiers: &[tier(Above(0.5), 2), tier(AtLeast(-0.5), 1)],
        },
        ScoreCheck {
            metric: "assetTurnoverChange",
            tiers: &[tier(AtLeast(0.0), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "operatingMarginChange",
        when: Below(-0.5),
        emits: &[
            Recommend("Improve operational efficiency to recover operating margin"),
            Weakness("Operating margin slipped {abs} points"),
        ],
    }],
    opportunities: &["Lean process improvements"],
    threats: &[
        "Operational disruptions",
        "Supply chain problems",
    ],
};

fn operational() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("operational-performance", "Operational performance", "Operating margin and asset productivity"),
        BS_IS,
        &OPERATIONAL,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let c = level_and_change(Computed::new(), "operatingMargin", "operatingMarginChange", operating_margin, cur, prev);
            let c = level_and_change(c, "assetTurnover", "assetTurnoverChange", asset_turnover, cur, prev);
            Ok(c.chart(trend("Operating income by period", &ctx.statements, f::operating_income)))
        },
    )
    .boxed()
}

fn roe(s: &FinancialStatement) -> f64 {
    percent(f::net_income(s), f::equity(s))
}

fn leverage(s: &FinancialStatement) -> f64 {
    ratio(f::total_liabilities(s), f::equity(s))
}

static FINANCIAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "returnOnEquity",
            tiers: &[tier(AtLeast(15.0), 3), tier(AtLeast(8.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "leverageChange",
            tiers: &[tier(AtMost(0.0), 2), tier(AtMost(0.3), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "leverageChange",
            when: Above(0.3),
            emits: &[
                Risk("Leverage rose by {value} this period"),
                Recommend("Review the financing strategy before taking new loans"),
            ],
        },
        NarrativeRule {
            metric: "returnOnEquityChange",
            when: Above(0.0),
            emits: &[Strength("Improving return on equity")],
        },
    ],
    opportunities: &[
        "Optimise the capital structure",
        "Lower the cost of capital",
    ],
    threats: &[
        "Rising interest rates",
        "Financial market volatility",
    ],
};

fn financial() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("financial-performance", "Financial performance", "Shareholder returns and leverage development"),
        BS_IS,
        &FINANCIAL,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let c = level_and_change(Computed::new(), "returnOnEquity", "returnOnEquityChange", roe, cur, prev);
            let c = level_and_change(c, "leverage", "leverageChange", leverage, cur, prev);
            Ok(c.chart(trend("Return on equity by period", &ctx.statements, roe)))
        },
    )
    .boxed()
}

fn roic(s: &FinancialStatement) -> f64 {
    percent(f::operating_income(s), f::invested_capital(s))
}

static INVESTMENT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "returnOnInvestedCapital",
            tiers: &[tier(AtLeast(15.0), 3), tier(AtLeast(10.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "returnOnInvestedCapitalChange",
            tiers: &[tier(AtLeast(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "returnOnInvestedCapital",
            when: Below(10.0),
            emits: &[Recommend("Re-examine the investment strategy; returns trail a typical cost of capital")],
        },
        NarrativeRule {
            metric: "capexGrowth",
            when: Above(30.0),
            emits: &[Predict("Expanded investment should lift capacity in coming periods")],
        },
    ],
    opportunities: &[
        "Reallocate capital to higher-return projects",
        "Invest in new growth areas",
    ],
    threats: &[
        "Poor return on new projects",
        "Overinvestment",
    ],
};

fn investment() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("investment-performance", "Investment performance", "Return earned on invested capital and investment growth"),
        BS_IS_CF,
        &INVESTMENT,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let c = level_and_change(Computed::new(), "returnOnInvestedCapital", "returnOnInvestedCapitalChange", roic, cur, prev);
            Ok(c.metric(
                "capexGrowth",
                growth_percent(f::capital_expenditures(prev), f::capital_expenditures(cur)),
            )
            .chart(trend("Return on invested capital by period", &ctx.statements, roic)))
        },
    )
    .boxed()
}

static MARKETING: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "marketingEfficiency",
            tiers: &[tier(Above(0.0), 3), tier(AtLeast(-5.0), 1)],
        },
        ScoreCheck {
            metric: "marketingIntensity",
            tiers: &[tier(Between(0.1, 15.0), 2), tier(Above(15.0), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "marketingEfficiency",
        when: Below(0.0),
        emits: &[Recommend("Improve marketing strategy; spend grows faster than revenue")],
    }],
    opportunities: &["Digital channels can lower customer acquisition cost"],
    threats: &[
        "Rising customer acquisition costs",
        "Stronger competition for attention",
    ],
};

fn marketing() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("marketing-performance", "Marketing performance", "Revenue return on marketing spend"),
        IS,
        &MARKETING,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let spend_growth = growth_percent(f::marketing_expenses(prev), f::marketing_expenses(cur));
            let revenue_growth = growth_percent(f::revenue(prev), f::revenue(cur));
            Ok(Computed::new()
                .metric("marketingIntensity", percent(f::marketing_expenses(cur), f::revenue(cur)))
                .metric("marketingGrowth", spend_growth)
                .metric("revenueGrowth", revenue_growth)
                .metric("marketingEfficiency", revenue_growth - spend_growth)
                .chart(trend("Marketing spend by period", &ctx.statements, f::marketing_expenses)))
        },
    )
    .boxed()
}

fn gross_margin(s: &FinancialStatement) -> f64 {
    percent(f::gross_profit(s), f::revenue(s))
}

static PRODUCTION: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "grossMargin",
            tiers: &[tier(AtLeast(40.0), 3), tier(AtLeast(25.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "grossMarginChange",
            tiers: &[tier(Above(0.5), 2), tier(AtLeast(-0.5), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "grossMarginChange",
        when: Below(-0.5),
        emits: &[
            Recommend("Improve production processes and supplier management"),
            Risk("Production costs rose faster than sales"),
        ],
    }],
    opportunities: &[
        "Automate production",
        "Improve capacity utilisation",
    ],
    threats: &["Raw material price inflation"],
};

fn production() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("production-performance", "Production performance", "Gross margin and production cost development"),
        IS,
        &PRODUCTION,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let c = level_and_change(Computed::new(), "grossMargin", "grossMarginChange", gross_margin, cur, prev);
            Ok(c.metric(
                "productionCostGrowth",
                growth_percent(f::cost_of_revenue(prev), f::cost_of_revenue(cur)),
            )
            .chart(trend("Gross margin by period", &ctx.statements, gross_margin)))
        },
    )
    .boxed()
}

fn admin_ratio(s: &FinancialStatement) -> f64 {
    percent(f::administrative_expenses(s), f::revenue(s))
}

static ADMINISTRATIVE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "administrativeRatio",
            tiers: &[tier(AtMost(8.0), 3), tier(AtMost(15.0), 2), tier(AtMost(25.0), 1)],
        },
        ScoreCheck {
            metric: "administrativeRatioChange",
            tiers: &[tier(AtMost(0.0), 2), tier(AtMost(1.0), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "administrativeRatioChange",
        when: Above(1.0),
        emits: &[Recommend("Improve administrative cost management")],
    }],
    opportunities: &[
        "Streamline administrative processes",
        "Digitise back-office work",
    ],
    threats: &[
        "Administrative cost creep",
        "Rising compliance costs",
    ],
};

fn administrative() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("administrative-performance", "Administrative performance", "Overhead cost relative to revenue"),
        IS,
        &ADMINISTRATIVE,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let c = level_and_change(Computed::new(), "administrativeRatio", "administrativeRatioChange", admin_ratio, cur, prev);
            Ok(c.chart(trend("Administrative expenses by period", &ctx.statements, f::administrative_expenses)))
        },
    )
    .boxed()
}

static TECHNICAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "researchIntensity",
            tiers: &[tier(AtLeast(5.0), 3), tier(AtLeast(2.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "researchGrowth",
            tiers: &[tier(AtLeast(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "researchIntensity",
            when: AtMost(0.0),
            emits: &[
                Threat("No reported research spending; exposure to technological disruption"),
                Recommend("Define an innovation strategy with a research budget"),
            ],
        },
        NarrativeRule {
            metric: "researchIntensity",
            when: AtLeast(5.0),
            emits: &[Strength("Research intensity of {value}% of revenue")],
        },
    ],
    opportunities: &[
        "Invest in new technology",
        "Turn research into new products",
    ],
    threats: &[
        "Technological obsolescence",
        "Competitors innovating faster",
    ],
};

fn technical() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("technical-performance", "Technical performance", "Research and development intensity"),
        IS,
        &TECHNICAL,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            Ok(Computed::new()
                .metric("researchIntensity", percent(f::research_development(cur), f::revenue(cur)))
                .metric(
                    "researchGrowth",
                    growth_percent(f::research_development(prev), f::research_development(cur)),
                )
                .chart(trend("Research spending by period", &ctx.statements, f::research_development)))
        },
    )
    .boxed()
}

static OVERALL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "assetTurnover",
            tiers: &[tier(AtLeast(1.0), 2), tier(AtLeast(0.5), 1)],
        },
        ScoreCheck {
            metric: "operatingMargin",
            tiers: &[tier(AtLeast(10.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "operatingCashMargin",
            tiers: &[tier(AtLeast(10.0), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "operatingMargin",
        when: AtMost(0.0),
        emits: &[
            Risk("Operations do not cover their costs"),
            Recommend("Launch an efficiency improvement programme across management functions"),
        ],
    }],
    opportunities: &[
        "Improve weak performance areas",
        "Build on existing strengths",
    ],
    threats: &[
        "Changes in economic conditions",
        "Stronger competition",
    ],
};

fn overall_efficiency() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("overall-efficiency", "Overall efficiency", "Combined view of asset productivity, margin and cash generation"),
        BS_IS_CF,
        &OVERALL,
        |ctx| {
            let (cur, _) = pair(ctx)?;
            let mut c = Computed::new()
                .metric("assetTurnover", asset_turnover(cur))
                .metric("operatingMargin", operating_margin(cur))
                .metric("operatingCashMargin", percent(f::operating_cash_flow(cur), f::revenue(cur)));
            if let Some(employees) = ctx.company.as_ref().and_then(|co| co.employees).filter(|e| *e > 0) {
                c.set("revenuePerEmployee", f::revenue(cur) / employees as f64);
            }
            Ok(c)
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{company_statements, revenue_pair};
    use analysis_core::Rating;
    use approx::assert_relative_eq;

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn growing_revenue_scores() {
        let r = revenue().run(&AnalysisContext::new(revenue_pair(100.0, 120.0)));
        assert_relative_eq!(r.results["revenueGrowth"].as_f64().unwrap(), 20.0, epsilon = 1e-9);
        assert_eq!(r.final_evaluation.score, 7);
        assert_eq!(r.final_evaluation.rating, Rating::Excellent);
        assert!(r.risks.is_empty());
    }

    #[test]
    fn declining_revenue_is_flagged() {
        let r = revenue().run(&AnalysisContext::new(revenue_pair(100.0, 80.0)));
        assert_relative_eq!(r.results["revenueGrowth"].as_f64().unwrap(), -20.0, epsilon = 1e-9);
        assert_eq!(r.final_evaluation.rating, Rating::Weak);
        assert!(r.risks.iter().any(|x| x.to_lowercase().contains("declining revenue")));
    }

    #[test]
    fn volatility_needs_three_periods() {
        assert_eq!(revenue_volatility(&revenue_pair(100.0, 200.0)), 0.0);
        assert!(revenue_volatility(&company_statements()) > 0.0);
    }

    #[test]
    fn all_complete_on_full_history() {
        let ctx = AnalysisContext::new(company_statements());
        for m in modules() {
            let r = m.run(&ctx);
            assert!(!r.is_degraded(), "{}: {}", r.id, r.final_evaluation.interpretation);
        }
    }
}
