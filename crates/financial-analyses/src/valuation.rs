//! Valuation analyses: intrinsic value per share against the market price.

use analysis_core::metrics::{growth_rate, percent, ratio};
use analysis_core::{
    AnalysisContext, AnalysisError, AnalysisModule, Category, FinancialStatement, MarketRiskLevel,
    ModuleInfo, Section,
};

use crate::common::{bars, latest, positive, Item};
use crate::fields as f;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Valuation;
const ALL: &[Section] = &[
    Section::BalanceSheet,
    Section::IncomeStatement,
    Section::CashFlowStatement,
];
const BS_IS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];

/// Return on a base assumed for the industry when no benchmark is supplied.
const DEFAULT_INDUSTRY_RETURN: f64 = 0.08;
const MARKET_MULTIPLIER: f64 = 1.5;
const DEFAULT_GROWTH: f64 = 0.05;
const MAX_GROWTH: f64 = 0.2;

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        discounted_cash_flow(),
        on_base("return-on-assets-valuation", "Return on assets valuation", "returnOnAssets", "total assets", f::total_assets, f::net_income),
        on_base("return-on-equity-valuation", "Return on equity valuation", "returnOnEquity", "shareholders' equity", f::equity, f::net_income),
        on_base("return-on-investment-valuation", "Return on investment valuation", "returnOnInvestment", "long-term capital", long_term_capital, f::net_income),
        on_base("return-on-capital-employed-valuation", "Return on capital employed valuation", "returnOnCapitalEmployed", "capital employed", f::capital_employed, f::operating_income),
        on_base("return-on-invested-capital-valuation", "Return on invested capital valuation", "returnOnInvestedCapital", "invested capital", f::invested_capital, nopat),
        on_base("return-on-working-capital-valuation", "Return on working capital valuation", "returnOnWorkingCapital", "working capital", f::working_capital, f::net_income),
        on_base("return-on-fixed-assets-valuation", "Return on fixed assets valuation", "returnOnFixedAssets", "fixed assets", f::fixed_assets, f::net_income),
        on_base("return-on-current-assets-valuation", "Return on current assets valuation", "returnOnCurrentAssets", "current assets", f::current_assets, f::net_income),
        on_base("return-on-non-current-assets-valuation", "Return on non-current assets valuation", "returnOnNonCurrentAssets", "non-current assets", f::non_current_assets, f::net_income),
        on_base("return-on-tangible-assets-valuation", "Return on tangible assets valuation", "returnOnTangibleAssets", "tangible assets", tangible_assets, f::net_income),
        on_base("return-on-intangible-assets-valuation", "Return on intangible assets valuation", "returnOnIntangibleAssets", "intangible assets", f::intangible_assets, f::net_income),
        on_base("return-on-financial-assets-valuation", "Return on financial assets valuation", "returnOnFinancialAssets", "financial assets", financial_assets, f::net_income),
        on_base("return-on-investment-assets-valuation", "Return on investment assets valuation", "returnOnInvestmentAssets", "investment assets", f::investments, f::net_income),
        on_base("return-on-operating-assets-valuation", "Return on operating assets valuation", "returnOnOperatingAssets", "operating assets", operating_assets, f::operating_income),
        on_base("return-on-non-operating-assets-valuation", "Return on non-operating assets valuation", "returnOnNonOperatingAssets", "non-operating assets", financial_assets, non_operating_income),
    ]
}

fn long_term_capital(s: &FinancialStatement) -> f64 {
    f::equity(s) + f::long_term_debt(s)
}

fn tangible_assets(s: &FinancialStatement) -> f64 {
    f::total_assets(s) - f::intangible_assets(s)
}

fn financial_assets(s: &FinancialStatement) -> f64 {
    f::cash(s) + f::marketable_securities(s) + f::investments(s)
}

fn operating_assets(s: &FinancialStatement) -> f64 {
    f::total_assets(s) - financial_assets(s)
}

fn nopat(s: &FinancialStatement) -> f64 {
    let tax_rate = ratio(f::tax_expense(s), f::income_before_tax(s)).clamp(0.0, 1.0);
    f::operating_income(s) * (1.0 - tax_rate)
}

fn non_operating_income(s: &FinancialStatement) -> f64 {
    s.get(Section::IncomeStatement, "nonOperatingIncome").unwrap_or(0.0)
}

/// Sector base rate adjusted for the market risk regime, clamped to 5-25%.
pub(crate) fn discount_rate(ctx: &AnalysisContext) -> f64 {
    let sector = ctx
        .company
        .as_ref()
        .and_then(|c| c.sector.as_deref())
        .map(str::to_lowercase);
    let base: f64 = match sector.as_deref() {
        Some("technology") => 0.12,
        Some("healthcare") => 0.11,
        Some("finance") => 0.09,
        Some("utilities") => 0.08,
        _ => 0.10,
    };
    let adjustment: f64 = match ctx.market.as_ref().and_then(|m| m.risk_level) {
        Some(MarketRiskLevel::Low) => -0.02,
        Some(MarketRiskLevel::High) => 0.03,
        _ => 0.0,
    };
    (base + adjustment).clamp(0.05, 0.25)
}

/// Latest revenue growth clamped to 0-20%, 5% without history.
pub(crate) fn expected_growth(statements: &[FinancialStatement]) -> f64 {
    match statements {
        [.., prev, cur] if f::revenue(prev) != 0.0 => {
            growth_rate(f::revenue(prev), f::revenue(cur)).clamp(0.0, MAX_GROWTH)
        }
        _ => DEFAULT_GROWTH,
    }
}

pub(crate) fn market_price(ctx: &AnalysisContext) -> Result<f64, AnalysisError> {
    ctx.market
        .as_ref()
        .and_then(|m| m.current_price)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| AnalysisError::InsufficientData("current market price is not available".into()))
}

/// Shares outstanding, 1 when not reported so totals stay comparable.
pub(crate) fn share_count(s: &FinancialStatement) -> f64 {
    let shares = f::shares_outstanding(s);
    if shares > 0.0 {
        shares
    } else {
        1.0
    }
}

/// Adds the price comparison every valuation reports.
pub(crate) fn compare_to_price(c: Computed, value_per_share: f64, price: f64) -> Computed {
    let gap = percent(value_per_share - price, price);
    c.metric("valuePerShare", value_per_share)
        .metric("currentPrice", price)
        .metric("valueGap", gap)
        .metric("absoluteGap", gap.abs())
        .chart(bars(
            "Estimated value vs market price",
            &[("Estimated value", value_per_share), ("Market price", price)],
        ))
}

pub(crate) static VALUATION: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "absoluteGap",
        tiers: &[
            tier(AtMost(10.0), 5),
            tier(AtMost(20.0), 4),
            tier(AtMost(30.0), 3),
            tier(AtMost(50.0), 2),
            tier(Above(50.0), 1),
        ],
    }],
    rules: &[
        NarrativeRule {
            metric: "valueGap",
            when: Above(20.0),
            emits: &[
                Recommend("Investment opportunity: the {name} puts value {value}% above the market price"),
                Opportunity("Share appears undervalued"),
                Predict("The price may re-rate toward the estimated value"),
            ],
        },
        NarrativeRule {
            metric: "valueGap",
            when: Below(-20.0),
            emits: &[
                Recommend("Reassess the valuation before adding to investment positions"),
                Risk("Market price exceeds the {name} estimate by {abs}%"),
                Threat("Downside risk if the market re-prices to fundamentals"),
            ],
        },
        NarrativeRule {
            metric: "absoluteGap",
            when: AtMost(10.0),
            emits: &[Note("The market price is close to the estimated value."), Strength("Fairly valued shares")],
        },
    ],
    opportunities: &[
        "Improve financial performance",
        "Increase market value",
        "Improve the valuation",
    ],
    threats: &[
        "Changes in economic conditions",
        "Changes in industry standards",
        "Changes in company performance",
    ],
};

fn discounted_cash_flow() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "discounted-cash-flow-valuation",
            "Discounted cash flow valuation",
            "Value of free cash flow growing at the expected rate, discounted at a sector rate",
            CAT,
            1,
        ),
        ALL,
        &VALUATION,
        |ctx| {
            let price = market_price(ctx)?;
            let s = latest(ctx)?;
            let fcf = f::free_cash_flow(s);
            let g = expected_growth(&ctx.statements);
            let r = discount_rate(ctx);
            let (present, terminal) = if r > g {
                (fcf / (r - g), (fcf * (1.0 + g) / (r - g)).max(0.0))
            } else {
                (0.0, 0.0)
            };
            let total = present + terminal;
            let c = Computed::new()
                .metric("freeCashFlow", fcf)
                .metric("expectedGrowth", g * 100.0)
                .metric("discountRate", r * 100.0)
                .metric("presentValue", present)
                .metric("terminalValue", terminal)
                .metric("enterpriseValue", total);
            Ok(compare_to_price(c, total / share_count(s), price))
        },
    )
    .boxed()
}

/// Value implied by the company's return on a base relative to the industry.
fn on_base(
    id: &'static str,
    name: &'static str,
    metric: &'static str,
    base_label: &'static str,
    base: Item,
    earnings: Item,
) -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(id, name, "Value implied by the return earned on a balance-sheet base", CAT, 1),
        BS_IS,
        &VALUATION,
        move |ctx| {
            let price = market_price(ctx)?;
            let s = latest(ctx)?;
            let b = positive(base(s), base_label)?;
            let ret = earnings(s) / b;
            let industry = ctx
                .benchmark
                .as_ref()
                .and_then(|bm| bm.industry_average(metric))
                .map(|pct| pct / 100.0)
                .filter(|r| *r > 0.0)
                .unwrap_or(DEFAULT_INDUSTRY_RETURN);
            let value = if ret > 0.0 {
                b * (ret / industry) * MARKET_MULTIPLIER
            } else {
                0.0
            };
            let c = Computed::new()
                .metric(metric, ret * 100.0)
                .metric("industryReturn", industry * 100.0)
                .metric("base", b)
                .metric("estimatedValue", value);
            Ok(compare_to_price(c, value / share_count(s), price))
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{company_statements, market};
    use analysis_core::{Company, MarketData, Rating};
    use approx::assert_relative_eq;

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn discount_rate_by_sector_and_risk() {
        let ctx = AnalysisContext::new(Vec::new());
        assert_relative_eq!(discount_rate(&ctx), 0.10);

        let company = Company {
            name: "Acme".into(),
            sector: Some("Technology".into()),
            ..Company::default()
        };
        let risky = MarketData {
            risk_level: Some(MarketRiskLevel::High),
            ..MarketData::default()
        };
        let ctx = ctx.with_company(Some(company)).with_market(Some(risky));
        assert_relative_eq!(discount_rate(&ctx), 0.15, epsilon = 1e-12);

        let utility = Company {
            name: "Grid".into(),
            sector: Some("utilities".into()),
            ..Company::default()
        };
        let calm = MarketData {
            risk_level: Some(MarketRiskLevel::Low),
            ..MarketData::default()
        };
        let ctx = AnalysisContext::new(Vec::new())
            .with_company(Some(utility))
            .with_market(Some(calm));
        assert_relative_eq!(discount_rate(&ctx), 0.06, epsilon = 1e-12);
    }

    #[test]
    fn growth_is_clamped() {
        let s = company_statements();
        // 1080 -> 1200
        assert_relative_eq!(expected_growth(&s), 1200.0 / 1080.0 - 1.0, epsilon = 1e-12);
        assert_eq!(expected_growth(&s[..1]), DEFAULT_GROWTH);
        let boom = crate::tests::revenue_pair(100.0, 200.0);
        assert_eq!(expected_growth(&boom), MAX_GROWTH);
    }

    #[test]
    fn valuation_requires_market_price() {
        let r = discounted_cash_flow().run(&AnalysisContext::new(company_statements()));
        assert!(r.is_degraded());
    }

    #[test]
    fn gap_scoring_matches_breakpoints() {
        let c = compare_to_price(Computed::new(), 105.0, 100.0);
        assert_relative_eq!(c.get("absoluteGap").unwrap(), 5.0, epsilon = 1e-9);
        assert_eq!(VALUATION.checks[0].points(c.get("absoluteGap")), 5);
        assert_eq!(VALUATION.checks[0].points(Some(25.0)), 3);
        assert_eq!(VALUATION.checks[0].points(Some(80.0)), 1);
        assert_eq!(Rating::from_score(4, VALUATION.max_score()), Rating::VeryGood);
    }

    #[test]
    fn return_on_assets_valuation_runs() {
        let ctx = AnalysisContext::new(company_statements()).with_market(Some(market()));
        let r = on_base("roa", "ROA valuation", "returnOnAssets", "total assets", f::total_assets, f::net_income).run(&ctx);
        assert!(!r.is_degraded());
        // 120 / 1000 = 12% vs 8% industry: 1000 * 1.5 * 1.5 / 100 shares
        assert_relative_eq!(r.results["valuePerShare"].as_f64().unwrap(), 22.5, epsilon = 1e-9);
    }
}
