//! Valuation models. Each produces a per-share estimate that is scored by its
//! distance from the market price, except the sensitivity and scenario
//! models which score the spread of their outcomes.

use analysis_core::metrics::{beta, linear_trend, percent, period_returns, ratio};
use analysis_core::{AnalysisContext, AnalysisError, AnalysisModule, Category, ChartPoint, Chart, ModuleInfo, Section};

use crate::common::{bars, latest, positive};
use crate::fields as f;
use crate::placeholder::Placeholder;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};
use crate::valuation::{compare_to_price, discount_rate, expected_growth, market_price, share_count, VALUATION};

const CAT: Category = Category::Modeling;
const ALL: &[Section] = &[
    Section::BalanceSheet,
    Section::IncomeStatement,
    Section::CashFlowStatement,
];
const BS_IS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];
const BS: &[Section] = &[Section::BalanceSheet];

const PROJECTION_YEARS: i32 = 5;
const TERMINAL_GROWTH: f64 = 0.025;
const DEFAULT_PE: f64 = 15.0;
const DEFAULT_PB: f64 = 2.0;
const DEFAULT_RISK_FREE: f64 = 0.04;
const DEFAULT_MARKET_RETURN: f64 = 0.09;
/// Bull, base and bear weights for the probabilistic model.
const SCENARIO_WEIGHTS: [f64; 3] = [0.25, 0.5, 0.25];
const SCENARIO_SHIFT: f64 = 0.03;

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        dcf_model(),
        multiples_model(),
        relative_model(),
        absolute_model(),
        predictive_model(),
        probabilistic_model(),
        sensitivity_model(),
        scenario_model(),
        risk_adjusted_model(),
        return_model(),
        growth_model(),
        comprehensive_model(),
        Placeholder::boxed("comparative-valuation-model", "Comparative valuation model", CAT),
        Placeholder::boxed("stability-valuation-model", "Stability valuation model", CAT),
        Placeholder::boxed("efficiency-valuation-model", "Efficiency valuation model", CAT),
    ]
}

/// Five explicit years of growing cash flow plus a Gordon terminal value.
pub(crate) fn projected_value(cash_flow: f64, growth: f64, rate: f64) -> f64 {
    let mut value = 0.0;
    let mut flow = cash_flow;
    for year in 1..=PROJECTION_YEARS {
        flow *= 1.0 + growth;
        value += flow / (1.0 + rate).powi(year);
    }
    let terminal_growth = TERMINAL_GROWTH.min(rate - 0.01);
    let terminal = flow * (1.0 + terminal_growth) / (rate - terminal_growth);
    value + terminal / (1.0 + rate).powi(PROJECTION_YEARS)
}

fn industry_multiple(ctx: &AnalysisContext, key: &str, default: f64) -> f64 {
    ctx.benchmark
        .as_ref()
        .and_then(|b| b.industry_average(key))
        .filter(|m| *m > 0.0)
        .unwrap_or(default)
}

fn dcf_per_share(ctx: &AnalysisContext, growth: f64, rate: f64) -> Result<f64, AnalysisError> {
    let s = latest(ctx)?;
    Ok(projected_value(f::free_cash_flow(s), growth, rate) / share_count(s))
}

fn info(id: &'static str, name: &'static str, description: &'static str) -> ModuleInfo {
    ModuleInfo::new(id, name, description, CAT, 1)
}

fn dcf_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("dcf-model", "Discounted cash flow model", "Five-year free cash flow projection with terminal value"),
        ALL,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let (g, r) = (expected_growth(&ctx.statements), discount_rate(ctx));
            let value = dcf_per_share(ctx, g, r)?;
            let c = Computed::new()
                .metric("growthRate", g * 100.0)
                .metric("discountRate", r * 100.0)
                .metric("terminalGrowth", TERMINAL_GROWTH.min(r - 0.01) * 100.0);
            Ok(compare_to_price(c, value, price))
        },
    )
    .boxed()
}

fn multiples_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("multiples-model", "Multiples valuation model", "Earnings and book value priced at industry multiples"),
        BS_IS,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let s = latest(ctx)?;
            let shares = share_count(s);
            let pe = industry_multiple(ctx, "priceToEarnings", DEFAULT_PE);
            let pb = industry_multiple(ctx, "priceToBook", DEFAULT_PB);
            let by_earnings = (f::net_income(s) / shares * pe).max(0.0);
            let by_book = (f::equity(s) / shares * pb).max(0.0);
            let value = (by_earnings + by_book) / 2.0;
            let c = Computed::new()
                .metric("earningsMultiple", pe)
                .metric("bookMultiple", pb)
                .metric("valueByEarnings", by_earnings)
                .metric("valueByBook", by_book);
            Ok(compare_to_price(c, value, price))
        },
    )
    .boxed()
}

fn relative_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("relative-valuation-model", "Relative valuation model", "EBITDA priced at the peer enterprise multiple"),
        BS_IS,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let multiple = ctx
                .benchmark
                .as_ref()
                .and_then(|b| b.group("peers"))
                .and_then(|g| g.averages.get("evToEbitda").copied())
                .filter(|m| *m > 0.0)
                .ok_or_else(|| AnalysisError::InsufficientData("peer EV/EBITDA multiple is not available".into()))?;
            let s = latest(ctx)?;
            let net_debt = f::total_debt(s) - f::cash(s);
            let enterprise = f::ebitda(s) * multiple;
            let equity_value = (enterprise - net_debt).max(0.0);
            let c = Computed::new()
                .metric("peerMultiple", multiple)
                .metric("enterpriseValue", enterprise)
                .metric("netDebt", net_debt);
            Ok(compare_to_price(c, equity_value / share_count(s), price))
        },
    )
    .boxed()
}

fn absolute_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("absolute-valuation-model", "Absolute valuation model", "Book and tangible book value per share"),
        BS,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let s = latest(ctx)?;
            let shares = share_count(s);
            let book = f::equity(s) / shares;
            let tangible = (f::equity(s) - f::intangible_assets(s)) / shares;
            let c = Computed::new()
                .metric("bookValuePerShare", book)
                .metric("tangibleBookValuePerShare", tangible);
            Ok(compare_to_price(c, book, price))
        },
    )
    .boxed()
}

fn predictive_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "predictive-valuation-model",
            "Predictive valuation model",
            "Trend-projected earnings priced at the industry multiple",
            CAT,
            3,
        ),
        BS_IS,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let earnings: Vec<f64> = ctx.statements.iter().map(f::net_income).collect();
            let trend = linear_trend(&earnings);
            let next = trend.project(earnings.len(), 1);
            let pe = industry_multiple(ctx, "priceToEarnings", DEFAULT_PE);
            let s = latest(ctx)?;
            let value = (next / share_count(s) * pe).max(0.0);
            let c = Computed::new()
                .metric("projectedEarnings", next)
                .metric("trendSlope", trend.slope)
                .metric("trendFit", trend.r_squared);
            Ok(compare_to_price(c, value, price))
        },
    )
    .boxed()
}

fn probabilistic_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("probabilistic-valuation-model", "Probabilistic valuation model", "Probability-weighted bull, base and bear DCF values"),
        ALL,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let (g, r) = (expected_growth(&ctx.statements), discount_rate(ctx));
            let bull = dcf_per_share(ctx, g + SCENARIO_SHIFT, r)?;
            let base = dcf_per_share(ctx, g, r)?;
            let bear = dcf_per_share(ctx, (g - SCENARIO_SHIFT).max(-0.5), r)?;
            let expected =
                bull * SCENARIO_WEIGHTS[0] + base * SCENARIO_WEIGHTS[1] + bear * SCENARIO_WEIGHTS[2];
            let c = Computed::new()
                .metric("bullValue", bull)
                .metric("baseValue", base)
                .metric("bearValue", bear)
                .chart(bars("Scenario values", &[("Bull", bull), ("Base", base), ("Bear", bear)]));
            Ok(compare_to_price(c, expected, price))
        },
    )
    .boxed()
}

static SENSITIVITY: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "valueSpread",
        tiers: &[tier(AtMost(20.0), 4), tier(AtMost(40.0), 3), tier(AtMost(60.0), 2), tier(AtMost(100.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "valueSpread",
            when: Above(60.0),
            emits: &[
                Risk("Valuation is highly sensitive to discount and growth assumptions"),
                Recommend("Stress-test valuation assumptions before investment decisions"),
            ],
        },
        NarrativeRule {
            metric: "valueSpread",
            when: AtMost(20.0),
            emits: &[Strength("Valuation is robust to assumption changes")],
        },
    ],
    opportunities: &[
        "Focus management attention on the value drivers with the largest effect",
        "Lock in favourable assumptions through contracts and hedges",
    ],
    threats: &[
        "Small changes in key assumptions can move value sharply",
        "Model assumptions may not hold in a downturn",
    ],
};

fn sensitivity_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("sensitivity-model", "Sensitivity analysis model", "DCF value across a discount-rate and growth grid"),
        ALL,
        &SENSITIVITY,
        |ctx| {
            let (g, r) = (expected_growth(&ctx.statements), discount_rate(ctx));
            let s = latest(ctx)?;
            positive(f::free_cash_flow(s), "free cash flow")?;
            let mut grid = Vec::new();
            for dr in [-0.01, 0.0, 0.01] {
                for dg in [-0.01, 0.0, 0.01] {
                    let value = dcf_per_share(ctx, g + dg, r + dr)?;
                    grid.push(ChartPoint::new(
                        format!("r {:.1}% / g {:.1}%", (r + dr) * 100.0, (g + dg) * 100.0),
                        value,
                    ));
                }
            }
            let base = dcf_per_share(ctx, g, r)?;
            let min = grid.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
            let max = grid.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
            Ok(Computed::new()
                .metric("baseValue", base)
                .metric("minimumValue", min)
                .metric("maximumValue", max)
                .metric("valueSpread", percent(max - min, base))
                .chart(Chart::bar("Value per share by assumption", grid)))
        },
    )
    .boxed()
}

static SCENARIO: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "pessimisticProfit",
            tiers: &[tier(Above(0.0), 3)],
        },
        ScoreCheck {
            metric: "baseProfit",
            tiers: &[tier(Above(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "pessimisticProfit",
            when: AtMost(0.0),
            emits: &[
                Risk("A revenue downturn would push the company into losses"),
                Recommend("Prepare a contingency strategy for a downturn scenario"),
            ],
        },
        NarrativeRule {
            metric: "optimisticProfit",
            when: Above(0.0),
            emits: &[Predict("Upside scenario projects net income of {value}")],
        },
    ],
    opportunities: &[
        "Prepare plans that capture the upside scenario",
        "Use scenario ranges to size investment decisions",
    ],
    threats: &[
        "The pessimistic scenario may materialise",
        "Wide scenario spread signals high uncertainty",
    ],
};

fn scenario_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("scenario-model", "Scenario analysis model", "Next-period profit under optimistic, base and pessimistic revenue"),
        &[Section::IncomeStatement],
        &SCENARIO,
        |ctx| {
            let s = latest(ctx)?;
            let revenue = positive(f::revenue(s), "revenue")?;
            // costs split into variable (cost of revenue) and fixed (everything else)
            let variable_rate = ratio(f::cost_of_revenue(s), revenue);
            let fixed = revenue - f::cost_of_revenue(s) - f::net_income(s);
            let g = expected_growth(&ctx.statements);
            let profit = |growth: f64| {
                let rev = revenue * (1.0 + growth);
                rev - rev * variable_rate - fixed
            };
            let (up, base, down) = (profit(g + 0.1), profit(g), profit(g - 0.15));
            Ok(Computed::new()
                .metric("optimisticProfit", up)
                .metric("baseProfit", base)
                .metric("pessimisticProfit", down)
                .chart(bars("Projected net income", &[("Optimistic", up), ("Base", base), ("Pessimistic", down)])))
        },
    )
    .boxed()
}

fn risk_adjusted_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("risk-adjusted-model", "Risk-adjusted valuation model", "DCF discounted at the CAPM required return"),
        ALL,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let market = ctx.market.as_ref();
            let rf = market.and_then(|m| m.risk_free_rate).unwrap_or(DEFAULT_RISK_FREE);
            let rm = market.and_then(|m| m.expected_market_return).unwrap_or(DEFAULT_MARKET_RETURN);
            let company_returns = period_returns(&ctx.statements.iter().map(f::net_income).collect::<Vec<_>>());
            let b = market.map(|m| beta(&company_returns, &m.market_returns)).unwrap_or(1.0);
            let required = (rf + b * (rm - rf)).clamp(0.05, 0.25);
            let value = dcf_per_share(ctx, expected_growth(&ctx.statements), required)?;
            let c = Computed::new()
                .metric("beta", b)
                .metric("riskFreeRate", rf * 100.0)
                .metric("requiredReturn", required * 100.0);
            Ok(compare_to_price(c, value, price))
        },
    )
    .boxed()
}

fn return_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("return-model", "Residual income model", "Book value plus capitalised earnings above the cost of equity"),
        BS_IS,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let s = latest(ctx)?;
            let r = discount_rate(ctx);
            let equity = f::equity(s);
            let residual = f::net_income(s) - r * equity;
            let value = ((equity + residual / r) / share_count(s)).max(0.0);
            let c = Computed::new()
                .metric("costOfEquity", r * 100.0)
                .metric("residualIncome", residual);
            Ok(compare_to_price(c, value, price))
        },
    )
    .boxed()
}

fn growth_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("growth-model", "Dividend growth model", "Gordon growth value of the dividend stream"),
        &[Section::BalanceSheet, Section::CashFlowStatement],
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let s = latest(ctx)?;
            let dps = positive(f::dividends_paid(s) / share_count(s), "dividend per share")?;
            let r = discount_rate(ctx);
            let g = expected_growth(&ctx.statements).min(r - 0.01);
            let value = dps * (1.0 + g) / (r - g);
            let c = Computed::new()
                .metric("dividendPerShare", dps)
                .metric("dividendGrowth", g * 100.0);
            Ok(compare_to_price(c, value, price))
        },
    )
    .boxed()
}

fn comprehensive_model() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("comprehensive-valuation-model", "Comprehensive valuation model", "Blend of cash flow, multiples, book and residual income values"),
        ALL,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let s = latest(ctx)?;
            let shares = share_count(s);
            let (g, r) = (expected_growth(&ctx.statements), discount_rate(ctx));
            let estimates = [
                ("Cash flow", dcf_per_share(ctx, g, r)?),
                ("Earnings multiple", f::net_income(s) / shares * industry_multiple(ctx, "priceToEarnings", DEFAULT_PE)),
                ("Book value", f::equity(s) / shares),
                ("Residual income", (f::equity(s) + (f::net_income(s) - r * f::equity(s)) / r) / shares),
            ];
            let usable: Vec<f64> = estimates.iter().map(|(_, v)| *v).filter(|v| *v > 0.0).collect();
            if usable.is_empty() {
                return Err(AnalysisError::InsufficientData("no model produced a positive value".into()));
            }
            let blended = usable.iter().sum::<f64>() / usable.len() as f64;
            let c = Computed::new()
                .metric("modelsUsed", usable.len() as f64)
                .chart(bars("Model estimates", &estimates));
            Ok(compare_to_price(c, blended, price))
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{company_statements, market};
    use analysis_core::ResultStatus;
    use approx::assert_relative_eq;

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn projection_without_growth_matches_annuity_plus_terminal() {
        let v = projected_value(100.0, 0.0, 0.1);
        let annuity: f64 = (1..=5).map(|y| 100.0 / 1.1f64.powi(y)).sum();
        let terminal = 100.0 * 1.025 / (0.1 - 0.025) / 1.1f64.powi(5);
        assert_relative_eq!(v, annuity + terminal, epsilon = 1e-9);
    }

    #[test]
    fn placeholders_report_not_implemented() {
        let ctx = AnalysisContext::new(company_statements());
        let placeholders: Vec<_> = modules()
            .into_iter()
            .map(|m| m.run(&ctx))
            .filter(|r| r.status == ResultStatus::NotImplemented)
            .collect();
        assert_eq!(placeholders.len(), 3);
    }

    #[test]
    fn scenario_spread() {
        let r = scenario_model().run(&AnalysisContext::new(company_statements()));
        let up = r.results["optimisticProfit"].as_f64().unwrap();
        let down = r.results["pessimisticProfit"].as_f64().unwrap();
        assert!(up > r.results["baseProfit"].as_f64().unwrap());
        assert!(down < up);
    }

    #[test]
    fn price_dependent_models_complete_with_market() {
        let ctx = AnalysisContext::new(company_statements()).with_market(Some(market()));
        for m in [dcf_model(), multiples_model(), absolute_model(), predictive_model(), return_model(), growth_model(), comprehensive_model()] {
            let r = m.run(&ctx);
            assert!(!r.is_degraded(), "{}: {}", r.id, r.final_evaluation.interpretation);
        }
    }
}
