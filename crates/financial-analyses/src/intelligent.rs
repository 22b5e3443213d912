//! Predictive heuristics: anomaly screening and trend-based projections.

use analysis_core::metrics::{
    cagr, descriptive_stats, growth_percent, linear_trend, percent, period_returns, ratio, std_dev,
    z_score_outliers,
};
use analysis_core::statements::period_labels;
use analysis_core::{AnalysisModule, Category, Chart, ChartPoint, FinancialStatement, ModuleInfo, Section};
use serde::Serialize;

use crate::common::{bars, latest, Item};
use crate::fields as f;
use crate::placeholder::Placeholder;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};
use crate::valuation::market_price;

const CAT: Category = Category::Intelligent;
const IS: &[Section] = &[Section::IncomeStatement];
const CF: &[Section] = &[Section::CashFlowStatement];
const BS: &[Section] = &[Section::BalanceSheet];
const BS_IS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];
const ALL: &[Section] = &[
    Section::BalanceSheet,
    Section::IncomeStatement,
    Section::CashFlowStatement,
];
const FORECAST_PERIODS: usize = 3;

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        anomaly_detection(),
        price_prediction(),
        projection("revenue-prediction", "Revenue prediction", "Trend forecast of revenue", IS, &REVENUE, f::revenue),
        projection("profit-prediction", "Profit prediction", "Trend forecast of net income", IS, &PROFIT, f::net_income),
        projection("cash-flow-prediction", "Cash flow prediction", "Trend forecast of operating cash flow", CF, &CASH_FLOW, f::operating_cash_flow),
        risk_prediction(),
        performance_prediction(),
        reserved("efficiency-prediction", "Efficiency prediction"),
        growth_prediction(),
        stability_prediction(),
        reserved("competitiveness-prediction", "Competitiveness prediction"),
        reserved("sustainability-prediction", "Sustainability prediction"),
        reserved("innovation-prediction", "Innovation prediction"),
        reserved("digital-transformation-prediction", "Digital transformation prediction"),
        reserved("investment-prediction", "Investment prediction"),
        reserved("financing-prediction", "Financing prediction"),
        reserved("strategy-prediction", "Strategy prediction"),
        comprehensive_prediction(),
    ]
}

fn reserved(id: &'static str, name: &'static str) -> Box<dyn AnalysisModule> {
    Placeholder::boxed(id, name, CAT)
}

fn info(id: &'static str, name: &'static str, description: &'static str, min_periods: usize) -> ModuleInfo {
    ModuleInfo::new(id, name, description, CAT, min_periods)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    Up,
    Down,
    Stable,
}

/// Last value against the first with a 10% band.
fn direction(values: &[f64]) -> Direction {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => {
            if *last > first * 1.1 {
                Direction::Up
            } else if *last < first * 0.9 {
                Direction::Down
            } else {
                Direction::Stable
            }
        }
        _ => Direction::Stable,
    }
}

/// First-to-last growth in percent.
fn total_growth(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => growth_percent(*first, *last),
        _ => 0.0,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Anomalies {
    revenue: Vec<usize>,
    net_income: Vec<usize>,
    total_assets: Vec<usize>,
}

static ANOMALY: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "totalAnomalies",
        tiers: &[
            tier(AtMost(0.0), 5),
            tier(AtMost(2.0), 4),
            tier(AtMost(4.0), 3),
            tier(AtMost(6.0), 2),
            tier(Above(6.0), 1),
        ],
    }],
    rules: &[
        NarrativeRule {
            metric: "totalAnomalies",
            when: AtLeast(1.0),
            emits: &[
                Recommend("Review the anomalous periods and confirm the underlying data before further analysis"),
                Risk("{value} anomalous value(s) detected in the financial history"),
            ],
        },
        NarrativeRule {
            metric: "totalAnomalies",
            when: AtMost(0.0),
            emits: &[Note("No anomalies were found in the financial history."), Strength("Consistent financial reporting")],
        },
    ],
    opportunities: &[
        "Investigate anomalies early to correct reporting issues",
        "Strengthen automated monitoring of financial data",
    ],
    threats: &[
        "Unexplained anomalies may hide reporting errors",
        "Irregular movements can signal operational problems",
    ],
};

fn anomaly_detection() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("anomaly-detection", "Anomaly detection", "z-score outliers in revenue, net income and total assets", 3),
        BS_IS,
        &ANOMALY,
        |ctx| {
            let threshold = ctx.outlier_threshold;
            let found = Anomalies {
                revenue: z_score_outliers(&f::series(&ctx.statements, f::revenue), threshold),
                net_income: z_score_outliers(&f::series(&ctx.statements, f::net_income), threshold),
                total_assets: z_score_outliers(&f::series(&ctx.statements, f::total_assets), threshold),
            };
            let total = found.revenue.len() + found.net_income.len() + found.total_assets.len();
            let labels = period_labels(&ctx.statements);
            let flagged: Vec<ChartPoint> = labels
                .iter()
                .enumerate()
                .map(|(i, l)| {
                    let hits = [&found.revenue, &found.net_income, &found.total_assets]
                        .iter()
                        .filter(|v| v.contains(&i))
                        .count();
                    ChartPoint::new(l.clone(), hits as f64)
                })
                .collect();
            Ok(Computed::new()
                .metric("totalAnomalies", total as f64)
                .metric("threshold", threshold)
                .chart(Chart::bar("Anomalies per period", flagged))
                .detail("anomalies", found))
        },
    )
    .boxed()
}

static PRICE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "confidence",
            tiers: &[tier(Above(80.0), 3), tier(Above(60.0), 2), tier(Above(40.0), 1)],
        },
        ScoreCheck {
            metric: "factorCount",
            tiers: &[tier(Above(3.0), 2), tier(Above(1.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "expectedReturn",
            when: Above(10.0),
            emits: &[
                Predict("The share price could rise about {value}% over 12 months"),
                Recommend("Consider building an investment position while fundamentals improve"),
            ],
        },
        NarrativeRule {
            metric: "expectedReturn",
            when: Below(0.0),
            emits: &[
                Predict("The share price could fall about {abs}% over 12 months"),
                Risk("Deteriorating fundamentals put pressure on the share price"),
            ],
        },
        NarrativeRule {
            metric: "confidence",
            when: AtMost(60.0),
            emits: &[Note("Low confidence: the history is volatile or trendless.")],
        },
    ],
    opportunities: &[
        "Use value estimates to time investment decisions",
        "Re-rating potential if fundamentals improve",
    ],
    threats: &[
        "Market sentiment may diverge from fundamentals",
        "Price volatility",
    ],
};

fn price_prediction() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("price-prediction", "Price prediction", "Twelve-month share price heuristic from revenue, profit and asset trends", 2),
        BS_IS,
        &PRICE,
        |ctx| {
            let price = market_price(ctx)?;
            let revenue = f::series(&ctx.statements, f::revenue);
            let revenue_growth = total_growth(&revenue);
            let profit_growth = total_growth(&f::series(&ctx.statements, f::net_income));
            let asset_growth = total_growth(&f::series(&ctx.statements, f::total_assets));
            let volatility = std_dev(&period_returns(&revenue));
            let dir = direction(&revenue);

            let mut multiplier = 1.0;
            if revenue_growth > 0.0 {
                multiplier += revenue_growth / 100.0;
            }
            if profit_growth > 0.0 {
                multiplier += profit_growth / 200.0;
            }
            multiplier += match dir {
                Direction::Up => 0.1,
                Direction::Down => -0.1,
                Direction::Stable => 0.0,
            };
            let predicted = price * multiplier;

            let mut confidence: f64 = 50.0;
            confidence += if volatility < 0.2 {
                20.0
            } else if volatility < 0.4 {
                10.0
            } else {
                0.0
            };
            confidence += match dir {
                Direction::Up => 15.0,
                Direction::Stable => 10.0,
                Direction::Down => 0.0,
            };
            let confidence = confidence.clamp(5.0, 95.0);

            let mut factors = Vec::new();
            if revenue_growth > 0.0 {
                factors.push("revenue growth");
            }
            if profit_growth > 0.0 {
                factors.push("profit growth");
            }
            if asset_growth > 0.0 {
                factors.push("asset growth");
            }
            match dir {
                Direction::Up => factors.push("upward trend"),
                Direction::Down => factors.push("downward trend"),
                Direction::Stable => {}
            }

            Ok(Computed::new()
                .metric("currentPrice", price)
                .metric("predictedPrice", predicted)
                .metric("expectedReturn", growth_percent(price, predicted))
                .metric("confidence", confidence)
                .metric("factorCount", factors.len() as f64)
                .metric("volatility", volatility)
                .chart(bars("Share price", &[("Current", price), ("Predicted", predicted)]))
                .detail("trend", dir)
                .detail("factors", factors)
                .detail("timeHorizon", "12 months"))
        },
    )
    .boxed()
}

/// Linear-trend forecast of one line item over the next periods.
fn projection(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    sections: &'static [Section],
    rules: &'static RuleSet,
    item: Item,
) -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info(id, name, description, 3),
        sections,
        rules,
        move |ctx| {
            let values = f::series(&ctx.statements, item);
            let t = linear_trend(&values);
            let n = values.len();
            let last = values.last().copied().unwrap_or(0.0);
            let forecast: Vec<f64> = (1..=FORECAST_PERIODS).map(|k| t.project(n, k)).collect();
            let next = forecast.first().copied().unwrap_or(last);

            let mut points: Vec<ChartPoint> = period_labels(&ctx.statements)
                .into_iter()
                .zip(values.iter())
                .map(|(l, v)| ChartPoint::new(l, *v))
                .collect();
            points.extend(forecast.iter().enumerate().map(|(k, v)| ChartPoint::new(format!("Forecast +{}", k + 1), *v)));

            Ok(Computed::new()
                .metric("latest", last)
                .metric("nextPeriod", next)
                .metric("forecastGrowth", growth_percent(last, next))
                .metric("compoundGrowth", cagr(values[0], last, n - 1) * 100.0)
                .metric("trendFit", t.r_squared)
                .chart(Chart::line(name, points))
                .detail("forecast", forecast))
        },
    )
    .boxed()
}

static REVENUE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "forecastGrowth",
            tiers: &[tier(Above(5.0), 3), tier(Above(0.0), 2), tier(AtLeast(-5.0), 1)],
        },
        ScoreCheck {
            metric: "trendFit",
            tiers: &[tier(AtLeast(0.8), 2), tier(AtLeast(0.5), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "forecastGrowth",
            when: AtLeast(0.0),
            emits: &[Predict("Revenue is expected to grow {value}% next period")],
        },
        NarrativeRule {
            metric: "forecastGrowth",
            when: Below(0.0),
            emits: &[
                Predict("Revenue is expected to decline {abs}% next period"),
                Recommend("Strengthen the sales strategy to counter the projected decline"),
            ],
        },
    ],
    opportunities: &[
        "Extend the revenue trend through new products",
        "Grow share in expanding markets",
    ],
    threats: &[
        "Demand may weaken",
        "Competitors may capture revenue growth",
    ],
};

static PROFIT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "nextPeriod",
            tiers: &[tier(Above(0.0), 2)],
        },
        ScoreCheck {
            metric: "forecastGrowth",
            tiers: &[tier(Above(5.0), 3), tier(Above(0.0), 2), tier(AtLeast(-5.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "forecastGrowth",
            when: AtLeast(0.0),
            emits: &[Predict("Net income is expected to grow {value}% next period")],
        },
        NarrativeRule {
            metric: "nextPeriod",
            when: Below(0.0),
            emits: &[
                Risk("The profit trend points to a loss next period"),
                Recommend("Improve margins through cost management before the projected loss"),
            ],
        },
    ],
    opportunities: &[
        "Widen margins as revenue scales",
        "Reduce costs to lift future profit",
    ],
    threats: &[
        "Cost inflation may compress margins",
        "Profit forecasts may prove optimistic",
    ],
};

static CASH_FLOW: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "nextPeriod",
            tiers: &[tier(Above(0.0), 3)],
        },
        ScoreCheck {
            metric: "forecastGrowth",
            tiers: &[tier(Above(0.0), 2), tier(AtLeast(-10.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "nextPeriod",
            when: AtMost(0.0),
            emits: &[
                Risk("Operating cash flow is projected to turn negative"),
                Recommend("Prepare financing to bridge the projected cash shortfall"),
            ],
        },
        NarrativeRule {
            metric: "forecastGrowth",
            when: Above(0.0),
            emits: &[Predict("Operating cash flow is expected to improve next period")],
        },
    ],
    opportunities: &[
        "Redeploy forecast surplus cash",
        "Improve cash conversion",
    ],
    threats: &[
        "Forecast cash shortfalls",
        "Delayed customer payments",
    ],
};

fn debt_to_equity(s: &FinancialStatement) -> f64 {
    ratio(f::total_liabilities(s), f::equity(s))
}

fn current_ratio(s: &FinancialStatement) -> f64 {
    ratio(f::current_assets(s), f::current_liabilities(s))
}

static RISK: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "projectedDebtToEquity",
            tiers: &[tier(AtMost(1.0), 3), tier(AtMost(2.0), 2), tier(AtMost(3.0), 1)],
        },
        ScoreCheck {
            metric: "projectedCurrentRatio",
            tiers: &[tier(AtLeast(1.5), 2), tier(AtLeast(1.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "leverageTrend",
            when: Above(0.1),
            emits: &[
                Predict("Leverage is likely to keep rising"),
                Risk("Debt is growing faster than equity"),
            ],
        },
        NarrativeRule {
            metric: "projectedCurrentRatio",
            when: Below(1.0),
            emits: &[
                Risk("Liquidity is projected to fall below current obligations"),
                Recommend("Secure credit lines ahead of the projected liquidity squeeze"),
            ],
        },
    ],
    opportunities: &[
        "Act early on rising risk indicators",
        "Build buffers while conditions are stable",
    ],
    threats: &[
        "Risk indicators may deteriorate together",
        "External shocks",
    ],
};

fn risk_prediction() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("risk-prediction", "Risk prediction", "Projected leverage and liquidity from their trends", 3),
        BS,
        &RISK,
        |ctx| {
            let leverage = f::series(&ctx.statements, debt_to_equity);
            let liquidity = f::series(&ctx.statements, current_ratio);
            let (lt, ct) = (linear_trend(&leverage), linear_trend(&liquidity));
            let n = leverage.len();
            Ok(Computed::new()
                .metric("projectedDebtToEquity", lt.project(n, 1).max(0.0))
                .metric("projectedCurrentRatio", ct.project(n, 1).max(0.0))
                .metric("leverageTrend", lt.slope)
                .metric("liquidityTrend", ct.slope))
        },
    )
    .boxed()
}

fn net_margin(s: &FinancialStatement) -> f64 {
    percent(f::net_income(s), f::revenue(s))
}

static PERFORMANCE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "projectedNetMargin",
            tiers: &[tier(AtLeast(10.0), 3), tier(Above(5.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "marginTrend",
            tiers: &[tier(AtLeast(0.0), 2), tier(AtLeast(-1.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "marginTrend",
            when: Below(-1.0),
            emits: &[
                Predict("Margins are expected to keep eroding"),
                Recommend("Improve pricing and cost management to protect margins"),
            ],
        },
        NarrativeRule {
            metric: "marginTrend",
            when: Above(0.5),
            emits: &[Predict("Margins are expected to keep expanding")],
        },
    ],
    opportunities: &[
        "Build on improving performance indicators",
        "Benchmark against stronger peers",
    ],
    threats: &[
        "Performance may revert to past levels",
        "Competitive pressure on results",
    ],
};

fn performance_prediction() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("performance-prediction", "Performance prediction", "Projected net margin and return on assets", 3),
        BS_IS,
        &PERFORMANCE,
        |ctx| {
            let margins = f::series(&ctx.statements, net_margin);
            let roa = f::series(&ctx.statements, |s| percent(f::net_income(s), f::total_assets(s)));
            let (mt, rt) = (linear_trend(&margins), linear_trend(&roa));
            let n = margins.len();
            Ok(Computed::new()
                .metric("projectedNetMargin", mt.project(n, 1))
                .metric("projectedReturnOnAssets", rt.project(n, 1))
                .metric("marginTrend", mt.slope))
        },
    )
    .boxed()
}

static GROWTH: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "sustainableGrowth",
            tiers: &[tier(AtLeast(10.0), 3), tier(AtLeast(5.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "revenueCompoundGrowth",
            tiers: &[tier(Above(5.0), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "sustainableGrowth",
        when: AtLeast(5.0),
        emits: &[Predict("Retained earnings can fund growth of about {value}% per period")],
    }],
    opportunities: &["Internally funded expansion"],
    threats: &[
        "Growth may slow as markets mature",
        "Fast growth may strain financing",
    ],
};

fn growth_prediction() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("growth-prediction", "Growth prediction", "Compound growth against the sustainable growth rate", 2),
        ALL,
        &GROWTH,
        |ctx| {
            let s = latest(ctx)?;
            let periods = ctx.statements.len() - 1;
            let first = &ctx.statements[0];
            let roe = ratio(f::net_income(s), f::equity(s));
            let retention = 1.0 - ratio(f::dividends_paid(s), f::net_income(s)).clamp(0.0, 1.0);
            let sustainable = roe * retention * 100.0;
            let revenue_cagr = cagr(f::revenue(first), f::revenue(s), periods) * 100.0;

            let mut c = Computed::new()
                .metric("sustainableGrowth", sustainable)
                .metric("retentionRatio", retention * 100.0)
                .metric("revenueCompoundGrowth", revenue_cagr)
                .metric("profitCompoundGrowth", cagr(f::net_income(first), f::net_income(s), periods) * 100.0)
                .metric("assetCompoundGrowth", cagr(f::total_assets(first), f::total_assets(s), periods) * 100.0);
            if revenue_cagr > sustainable && sustainable > 0.0 {
                c.narrative
                    .risks
                    .push(format!("Revenue growth of {:.1}% exceeds what retained earnings can fund", revenue_cagr));
                c.narrative
                    .recommendations
                    .push("Plan external financing to support the current growth rate".to_string());
            }
            Ok(c)
        },
    )
    .boxed()
}

fn variation(statements: &[FinancialStatement], item: Item) -> f64 {
    descriptive_stats(&f::series(statements, item)).coefficient_of_variation.abs() * 100.0
}

static STABILITY: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "revenueVariation",
            tiers: &[tier(AtMost(10.0), 3), tier(AtMost(25.0), 2), tier(AtMost(50.0), 1)],
        },
        ScoreCheck {
            metric: "profitVariation",
            tiers: &[tier(AtMost(15.0), 2), tier(AtMost(40.0), 1)],
        },
        ScoreCheck {
            metric: "cashFlowVariation",
            tiers: &[tier(AtMost(20.0), 2), tier(AtMost(50.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "profitVariation",
            when: Above(40.0),
            emits: &[
                Risk("Earnings are unstable from period to period"),
                Predict("Future earnings are hard to anticipate"),
            ],
        },
        NarrativeRule {
            metric: "revenueVariation",
            when: AtMost(10.0),
            emits: &[Predict("Revenue is expected to remain stable"), Strength("Stable revenue base")],
        },
    ],
    opportunities: &[
        "Use stable results to secure cheaper financing",
        "Plan long-term investment on a predictable base",
    ],
    threats: &[
        "Sudden volatility in key figures",
        "Dependence on a narrow set of drivers",
    ],
};

fn stability_prediction() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("stability-prediction", "Stability prediction", "Dispersion of revenue, profit and operating cash flow", 3),
        &[Section::IncomeStatement, Section::CashFlowStatement],
        &STABILITY,
        |ctx| {
            Ok(Computed::new()
                .metric("revenueVariation", variation(&ctx.statements, f::revenue))
                .metric("profitVariation", variation(&ctx.statements, f::net_income))
                .metric("cashFlowVariation", variation(&ctx.statements, f::operating_cash_flow))
                .metric("marginVolatility", std_dev(&f::series(&ctx.statements, net_margin))))
        },
    )
    .boxed()
}

static COMPREHENSIVE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "revenueForecastGrowth",
            tiers: &[tier(Above(5.0), 3), tier(Above(0.0), 2), tier(AtLeast(-5.0), 1)],
        },
        ScoreCheck {
            metric: "projectedNetMargin",
            tiers: &[tier(AtLeast(10.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "anomalies",
            tiers: &[tier(AtMost(0.0), 2), tier(AtMost(2.0), 1)],
        },
        ScoreCheck {
            metric: "revenueVariation",
            tiers: &[tier(AtMost(15.0), 2), tier(AtMost(40.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "outlook",
            when: AtLeast(1.0),
            emits: &[Predict("The overall outlook is positive"), Opportunity("Favourable momentum across revenue and margins")],
        },
        NarrativeRule {
            metric: "outlook",
            when: AtMost(-1.0),
            emits: &[
                Predict("The overall outlook is negative"),
                Threat("Deteriorating fundamentals"),
                Recommend("Revisit the strategy and improve operating management before the outlook worsens"),
            ],
        },
    ],
    opportunities: &[
        "Combine forecasts into a single planning view",
        "Prioritise the weakest forecast areas",
    ],
    threats: &[
        "Forecast errors compound across areas",
        "Changes in economic conditions",
    ],
};

fn comprehensive_prediction() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("comprehensive-prediction", "Comprehensive prediction", "Combined revenue, margin, anomaly and stability outlook", 3),
        BS_IS,
        &COMPREHENSIVE,
        |ctx| {
            let revenue = f::series(&ctx.statements, f::revenue);
            let n = revenue.len();
            let last = revenue.last().copied().unwrap_or(0.0);
            let forecast_growth = growth_percent(last, linear_trend(&revenue).project(n, 1));
            let margin = linear_trend(&f::series(&ctx.statements, net_margin)).project(n, 1);
            let anomalies = z_score_outliers(&revenue, ctx.outlier_threshold).len()
                + z_score_outliers(&f::series(&ctx.statements, f::net_income), ctx.outlier_threshold).len();

            // +1 positive, -1 negative, 0 mixed
            let outlook = match (forecast_growth > 0.0, margin > 0.0) {
                (true, true) => 1.0,
                (false, false) => -1.0,
                _ => 0.0,
            };
            Ok(Computed::new()
                .metric("revenueForecastGrowth", forecast_growth)
                .metric("projectedNetMargin", margin)
                .metric("anomalies", anomalies as f64)
                .metric("revenueVariation", variation(&ctx.statements, f::revenue))
                .metric("outlook", outlook))
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{company_statements, market};
    use analysis_core::{AnalysisContext, Rating, ResultStatus};
    use approx::assert_relative_eq;

    fn history(revenue: &[f64]) -> Vec<FinancialStatement> {
        revenue
            .iter()
            .map(|r| {
                FinancialStatement::default()
                    .with_value(Section::IncomeStatement, "totalRevenue", *r)
                    .with_value(Section::IncomeStatement, "netIncome", 10.0)
                    .with_value(Section::BalanceSheet, "totalAssets", 500.0)
            })
            .collect()
    }

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
        let ctx = AnalysisContext::new(company_statements());
        let reserved = modules()
            .iter()
            .map(|m| m.run(&ctx))
            .filter(|r| r.status == ResultStatus::NotImplemented)
            .count();
        assert_eq!(reserved, 8);
    }

    #[test]
    fn trend_direction_band() {
        assert_eq!(direction(&[100.0, 111.0]), Direction::Up);
        assert_eq!(direction(&[100.0, 105.0]), Direction::Stable);
        assert_eq!(direction(&[100.0, 89.0]), Direction::Down);
        assert_eq!(direction(&[100.0]), Direction::Stable);
    }

    #[test]
    fn spike_is_flagged() {
        let ctx = AnalysisContext::new(history(&[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 500.0]));
        let r = anomaly_detection().run(&ctx);
        assert_eq!(r.results["anomalies"]["revenue"][0], 7);
        assert_relative_eq!(r.results["totalAnomalies"].as_f64().unwrap(), 1.0);
        assert_eq!(r.final_evaluation.score, 4);
        assert!(!r.recommendations.is_empty());
    }

    #[test]
    fn spike_passes_a_looser_threshold() {
        let ctx = AnalysisContext::new(history(&[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 500.0]))
            .with_outlier_threshold(3.0);
        let r = anomaly_detection().run(&ctx);
        assert_relative_eq!(r.results["totalAnomalies"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn price_prediction_on_fixture() {
        // revenue and profit both +25%, upward trend: 1 + 0.25 + 0.125 + 0.1
        let ctx = AnalysisContext::new(company_statements()).with_market(Some(market()));
        let r = price_prediction().run(&ctx);
        assert_relative_eq!(r.results["predictedPrice"].as_f64().unwrap(), 18.0 * 1.475, epsilon = 1e-9);
        assert_relative_eq!(r.results["confidence"].as_f64().unwrap(), 85.0);
        assert_eq!(r.final_evaluation.rating, Rating::Excellent);
    }

    #[test]
    fn price_prediction_needs_price() {
        let r = price_prediction().run(&AnalysisContext::new(company_statements()));
        assert_eq!(r.status, ResultStatus::InsufficientData);
    }

    #[test]
    fn revenue_projection_extends_linear_history() {
        let r = modules()[2].run(&AnalysisContext::new(company_statements()));
        assert_relative_eq!(r.results["nextPeriod"].as_f64().unwrap(), 1320.0, epsilon = 1e-6);
        assert_relative_eq!(r.results["forecastGrowth"].as_f64().unwrap(), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn sustainable_growth_on_fixture() {
        // ROE 24%, payout 25%
        let r = growth_prediction().run(&AnalysisContext::new(company_statements()));
        assert_relative_eq!(r.results["sustainableGrowth"].as_f64().unwrap(), 18.0, epsilon = 1e-9);
    }
}
