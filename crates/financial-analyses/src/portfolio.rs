//! Portfolio and risk analyses. Facets that need data beyond the statements
//! (currency, political, cyber...) are registered as placeholders.

use analysis_core::metrics::{beta, correlation, growth_rate, percent, period_returns, ratio, std_dev};
use analysis_core::{AnalysisModule, Category, FinancialStatement, ModuleInfo, Section};

use crate::common::{bars, latest, pair, positive, trend};
use crate::fields as f;
use crate::placeholder::Placeholder;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Portfolio;
const IS: &[Section] = &[Section::IncomeStatement];
const BS: &[Section] = &[Section::BalanceSheet];
const BS_IS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];
const BS_CF: &[Section] = &[Section::BalanceSheet, Section::CashFlowStatement];
const ALL: &[Section] = &[
    Section::BalanceSheet,
    Section::IncomeStatement,
    Section::CashFlowStatement,
];

const DAYS: f64 = 365.0;
/// Market volatility assumed when no market return history is supplied.
const DEFAULT_MARKET_VOLATILITY: f64 = 0.2;
const STATUTORY_TAX_RATE: f64 = 25.0;
/// Interest rate shock, in percentage points, applied to floating debt.
const RATE_SHOCK: f64 = 1.0;

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        market_risk(),
        credit_risk(),
        liquidity_risk(),
        operational_risk(),
        reserved("currency-risk", "Currency risk"),
        interest_rate_risk(),
        reserved("commodity-risk", "Commodity risk"),
        reserved("environmental-risk", "Environmental risk"),
        reserved("governance-risk", "Governance risk"),
        reserved("technology-risk", "Technology risk"),
        reserved("regulatory-risk", "Regulatory risk"),
        reserved("reputation-risk", "Reputation risk"),
        reserved("strategic-risk", "Strategic risk"),
        financial_risk(),
        investment_risk(),
        financing_risk(),
        production_risk(),
        reserved("marketing-risk", "Marketing risk"),
        reserved("human-resources-risk", "Human resources risk"),
        supplier_risk(),
        customer_risk(),
        reserved("competitor-risk", "Competitor risk"),
        reserved("macroeconomic-risk", "Macroeconomic risk"),
        reserved("microeconomic-risk", "Microeconomic risk"),
        reserved("political-risk", "Political risk"),
        reserved("legal-risk", "Legal risk"),
        tax_risk(),
        reserved("insurance-risk", "Insurance risk"),
        reserved("security-risk", "Security risk"),
        reserved("data-risk", "Data risk"),
        reserved("privacy-risk", "Privacy risk"),
        reserved("sustainability-risk", "Sustainability risk"),
        innovation_risk(),
        reserved("digital-transformation-risk", "Digital transformation risk"),
        comprehensive_risk(),
    ]
}

fn reserved(id: &'static str, name: &'static str) -> Box<dyn AnalysisModule> {
    Placeholder::boxed(id, name, CAT)
}

fn info(id: &'static str, name: &'static str, description: &'static str, min_periods: usize) -> ModuleInfo {
    ModuleInfo::new(id, name, description, CAT, min_periods)
}

/// Altman Z'' score for non-manufacturing and private companies.
pub(crate) fn altman_z(s: &FinancialStatement) -> f64 {
    let assets = f::total_assets(s);
    6.56 * ratio(f::working_capital(s), assets)
        + 3.26 * ratio(f::retained_earnings(s), assets)
        + 6.72 * ratio(f::operating_income(s), assets)
        + 1.05 * ratio(f::equity(s), f::total_liabilities(s))
}

/// 0-100 points for growth, profit, liquidity and leverage.
fn credit_score(statements: &[FinancialStatement]) -> f64 {
    let Some(s) = statements.last() else {
        return 0.0;
    };
    let mut score = 0.0;
    if let [.., prev, cur] = statements {
        if f::revenue(cur) > f::revenue(prev) {
            score += 20.0;
        }
    }
    if f::net_income(s) > 0.0 {
        score += 30.0;
    }
    let current = ratio(f::current_assets(s), f::current_liabilities(s));
    score += if current > 2.0 {
        25.0
    } else if current > 1.0 {
        15.0
    } else {
        0.0
    };
    let leverage = ratio(f::total_liabilities(s), f::equity(s));
    score += if leverage < 0.5 {
        25.0
    } else if leverage < 1.0 {
        15.0
    } else {
        0.0
    };
    score
}

static MARKET: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "beta",
            tiers: &[tier(Below(0.8), 3), tier(Below(1.2), 2), tier(Below(1.5), 1)],
        },
        ScoreCheck {
            metric: "volatility",
            tiers: &[tier(Below(0.2), 2), tier(Below(0.4), 1)],
        },
        ScoreCheck {
            metric: "marketCorrelation",
            tiers: &[tier(Below(0.5), 2), tier(Below(0.8), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "beta",
            when: Above(1.5),
            emits: &[
                Risk("Results swing more than the market (beta {value})"),
                Recommend("Reduce exposure to market cycles through diversification and hedging"),
            ],
        },
        NarrativeRule {
            metric: "beta",
            when: Below(1.0),
            emits: &[Note("The company is less volatile than the market."), Strength("Defensive profile relative to the market")],
        },
        NarrativeRule {
            metric: "volatility",
            when: AtLeast(0.4),
            emits: &[Risk("High volatility of revenue growth")],
        },
    ],
    opportunities: &[
        "Hedge market exposure",
        "Diversify revenue across cycles",
    ],
    threats: &["A market downturn would feed through to results"],
};

fn market_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("market-risk", "Market risk", "Beta, volatility and correlation of revenue growth with market returns", 3),
        IS,
        &MARKET,
        |ctx| {
            let returns = period_returns(&f::series(&ctx.statements, f::revenue));
            let market: &[f64] = ctx.market.as_ref().map(|m| m.market_returns.as_slice()).unwrap_or(&[]);
            let b = beta(&returns, market);
            let volatility = std_dev(&returns);
            let market_volatility = if market.len() >= 2 { std_dev(market) } else { DEFAULT_MARKET_VOLATILITY };
            let systematic = b * market_volatility;
            Ok(Computed::new()
                .metric("beta", b)
                .metric("volatility", volatility)
                .metric("marketCorrelation", correlation(&returns, market))
                .metric("systematicRisk", systematic)
                .metric("unsystematicRisk", (volatility.powi(2) - systematic.powi(2)).max(0.0).sqrt())
                .chart(trend("Revenue", &ctx.statements, f::revenue)))
        },
    )
    .boxed()
}

static CREDIT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "debtToEquity",
            tiers: &[tier(Below(0.5), 3), tier(Below(1.0), 2), tier(Below(2.0), 1)],
        },
        ScoreCheck {
            metric: "interestCoverage",
            tiers: &[tier(Above(5.0), 3), tier(Above(2.5), 2), tier(Above(1.5), 1)],
        },
        ScoreCheck {
            metric: "currentRatio",
            tiers: &[tier(Above(2.0), 2), tier(Above(1.5), 1)],
        },
        ScoreCheck {
            metric: "creditScore",
            tiers: &[tier(Above(80.0), 2), tier(Above(60.0), 1)],
        },
        ScoreCheck {
            metric: "altmanZ",
            tiers: &[tier(Above(2.6), 2), tier(AtLeast(1.1), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "altmanZ",
            when: Below(1.1),
            emits: &[
                Risk("Altman Z'' of {value} is in the distress zone"),
                Recommend("Restructure debt with lenders and strengthen the credit position"),
                Predict("Elevated probability of financial distress within two years"),
            ],
        },
        NarrativeRule {
            metric: "altmanZ",
            when: Above(2.6),
            emits: &[Strength("Altman Z'' in the safe zone")],
        },
        NarrativeRule {
            metric: "interestCoverage",
            when: Below(1.5),
            emits: &[Risk("Operating income barely covers interest"), Weakness("Weak debt service capacity")],
        },
        NarrativeRule {
            metric: "debtToEquity",
            when: Above(2.0),
            emits: &[Recommend("Reduce leverage before taking on new loan commitments")],
        },
    ],
    opportunities: &[
        "Improve credit standing to lower borrowing costs",
        "Negotiate better loan terms",
    ],
    threats: &["Tighter credit conditions would raise borrowing costs"],
};

fn credit_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("credit-risk", "Credit risk", "Leverage, interest coverage, liquidity and Altman Z'' distress score", 1),
        BS_IS,
        &CREDIT,
        |ctx| {
            let s = latest(ctx)?;
            let coverage = ratio(f::operating_income(s), f::interest_expense(s));
            let z = altman_z(s);
            let zone = if z > 2.6 {
                "safe"
            } else if z >= 1.1 {
                "grey"
            } else {
                "distress"
            };
            let de = ratio(f::total_liabilities(s), f::equity(s));
            let cr = ratio(f::current_assets(s), f::current_liabilities(s));
            Ok(Computed::new()
                .metric("debtToEquity", de)
                .metric("interestCoverage", if f::interest_expense(s) == 0.0 { 99.0 } else { coverage })
                .metric("currentRatio", cr)
                .metric("creditScore", credit_score(&ctx.statements))
                .metric("altmanZ", z)
                .detail("altmanZone", zone)
                .chart(bars("Credit risk indicators", &[("Debt to equity", de), ("Current ratio", cr), ("Altman Z''", z)])))
        },
    )
    .boxed()
}

static LIQUIDITY: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "currentRatio",
            tiers: &[tier(AtLeast(2.0), 3), tier(AtLeast(1.5), 2), tier(AtLeast(1.0), 1)],
        },
        ScoreCheck {
            metric: "quickRatio",
            tiers: &[tier(AtLeast(1.0), 2), tier(AtLeast(0.7), 1)],
        },
        ScoreCheck {
            metric: "cashRatio",
            tiers: &[tier(AtLeast(0.5), 2), tier(AtLeast(0.2), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "currentRatio",
            when: Below(1.0),
            emits: &[
                Risk("Current liabilities exceed current assets"),
                Recommend("Arrange committed financing lines to cover short-term obligations"),
            ],
        },
        NarrativeRule {
            metric: "cashRatio",
            when: Below(0.2),
            emits: &[Weakness("Thin cash buffer")],
        },
    ],
    opportunities: &[
        "Secure committed credit lines",
        "Improve working capital management",
    ],
    threats: &[
        "Sudden cash needs",
        "Tighter credit conditions",
    ],
};

fn liquidity_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("liquidity-risk", "Liquidity risk", "Ability to meet short-term obligations from liquid assets", 1),
        BS,
        &LIQUIDITY,
        |ctx| {
            let s = latest(ctx)?;
            let cl = positive(f::current_liabilities(s), "current liabilities")?;
            Ok(Computed::new()
                .metric("currentRatio", f::current_assets(s) / cl)
                .metric("quickRatio", (f::current_assets(s) - f::inventory(s)) / cl)
                .metric("cashRatio", (f::cash(s) + f::marketable_securities(s)) / cl)
                .metric("liquidityGap", f::working_capital(s)))
        },
    )
    .boxed()
}

static OPERATIONAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "operatingLeverage",
            tiers: &[tier(AtMost(1.5), 3), tier(AtMost(3.0), 2), tier(AtMost(5.0), 1)],
        },
        ScoreCheck {
            metric: "operatingMargin",
            tiers: &[tier(AtLeast(15.0), 2), tier(Above(5.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "operatingLeverage",
            when: Above(3.0),
            emits: &[
                Risk("High operating leverage amplifies the effect of revenue swings"),
                Recommend("Improve cost flexibility by converting fixed costs to variable ones"),
            ],
        },
        NarrativeRule {
            metric: "operatingMargin",
            when: AtMost(0.0),
            emits: &[Weakness("Operations are loss-making")],
        },
    ],
    opportunities: &[
        "Improve operating processes",
        "Reduce fixed costs",
    ],
    threats: &[
        "Operational disruptions",
        "Rising operating costs",
    ],
};

fn operational_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("operational-risk", "Operational risk", "Degree of operating leverage and cost rigidity", 2),
        IS,
        &OPERATIONAL,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let revenue_change = growth_rate(f::revenue(prev), f::revenue(cur));
            let income_change = growth_rate(f::operating_income(prev), f::operating_income(cur));
            Ok(Computed::new()
                .metric("operatingLeverage", ratio(income_change, revenue_change).abs())
                .metric("operatingMargin", percent(f::operating_income(cur), f::revenue(cur)))
                .metric("costRigidity", percent(f::operating_expenses(cur), f::revenue(cur))))
        },
    )
    .boxed()
}

static INTEREST_RATE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "rateShockImpact",
            tiers: &[tier(AtMost(5.0), 3), tier(AtMost(10.0), 2), tier(AtMost(20.0), 1)],
        },
        ScoreCheck {
            metric: "debtToAssets",
            tiers: &[tier(AtMost(30.0), 2), tier(AtMost(60.0), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "rateShockImpact",
        when: Above(10.0),
        emits: &[
            Risk("A one point rise in interest rates would cut net income by {value}%"),
            Recommend("Hedge or fix the rate on floating debt and review the financing mix"),
        ],
    }],
    opportunities: &[
        "Lock in fixed rates",
        "Reduce floating-rate debt",
    ],
    threats: &["Rising interest rates"],
};

fn interest_rate_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("interest-rate-risk", "Interest rate risk", "Net income sensitivity to a one point rate rise on all debt", 1),
        BS_IS,
        &INTEREST_RATE,
        |ctx| {
            let s = latest(ctx)?;
            let tax_rate = ratio(f::tax_expense(s), f::income_before_tax(s)).clamp(0.0, 1.0);
            let extra_interest = f::total_debt(s) * RATE_SHOCK / 100.0 * (1.0 - tax_rate);
            let net = f::net_income(s);
            let impact = if net > 0.0 { percent(extra_interest, net) } else { 100.0 };
            Ok(Computed::new()
                .metric("rateShockImpact", impact)
                .metric("additionalInterest", extra_interest)
                .metric("debtToAssets", percent(f::total_debt(s), f::total_assets(s)))
                .metric("averageRate", percent(f::interest_expense(s), f::total_debt(s))))
        },
    )
    .boxed()
}

static FINANCIAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "financialLeverage",
            tiers: &[tier(AtMost(2.0), 3), tier(AtMost(3.0), 2), tier(AtMost(5.0), 1)],
        },
        ScoreCheck {
            metric: "degreeOfFinancialLeverage",
            tiers: &[tier(Between(0.0, 1.2), 2), tier(Between(0.0, 2.0), 1)],
        },
        ScoreCheck {
            metric: "equityRatio",
            tiers: &[tier(AtLeast(50.0), 2), tier(AtLeast(30.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "financialLeverage",
            when: Above(3.0),
            emits: &[
                Risk("Assets are financed mostly with debt"),
                Recommend("Strengthen the equity base through retained earnings or new capital"),
            ],
        },
        NarrativeRule {
            metric: "equityRatio",
            when: AtLeast(50.0),
            emits: &[Strength("Conservative capital structure")],
        },
    ],
    opportunities: &[
        "Reduce leverage",
        "Improve financial flexibility",
    ],
    threats: &[
        "Rising financing costs",
        "Breach of debt covenants",
    ],
};

fn financial_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("financial-risk", "Financial risk", "Balance sheet leverage and sensitivity of earnings to interest", 1),
        BS_IS,
        &FINANCIAL,
        |ctx| {
            let s = latest(ctx)?;
            let ebit = f::operating_income(s);
            Ok(Computed::new()
                .metric("financialLeverage", ratio(f::total_assets(s), f::equity(s)))
                .metric("degreeOfFinancialLeverage", ratio(ebit, ebit - f::interest_expense(s)))
                .metric("equityRatio", percent(f::equity(s), f::total_assets(s))))
        },
    )
    .boxed()
}

static INVESTMENT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "capexCoverage",
            tiers: &[tier(AtLeast(1.5), 3), tier(AtLeast(1.0), 2), tier(AtLeast(0.5), 1)],
        },
        ScoreCheck {
            metric: "investmentConcentration",
            tiers: &[tier(AtMost(20.0), 2), tier(AtMost(40.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "capexCoverage",
            when: Below(1.0),
            emits: &[
                Risk("Capital spending exceeds operating cash flow"),
                Recommend("Prioritise investment projects by expected return"),
            ],
        },
        NarrativeRule {
            metric: "investmentConcentration",
            when: Above(40.0),
            emits: &[Weakness("Large share of assets tied up in financial investments")],
        },
    ],
    opportunities: &["Surplus operating cash can fund new investment"],
    threats: &[
        "Losses on investments",
        "Falling asset values",
    ],
};

fn investment_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("investment-risk", "Investment risk", "Funding of capital spending and concentration of investments", 1),
        BS_CF,
        &INVESTMENT,
        |ctx| {
            let s = latest(ctx)?;
            let capex = f::capital_expenditures(s);
            let coverage = if capex == 0.0 { 99.0 } else { f::operating_cash_flow(s) / capex };
            Ok(Computed::new()
                .metric("capexCoverage", coverage)
                .metric("investmentConcentration", percent(f::investments(s), f::total_assets(s)))
                .metric("capitalExpenditures", capex))
        },
    )
    .boxed()
}

static FINANCING: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "shortTermDebtShare",
            tiers: &[tier(AtMost(30.0), 2), tier(AtMost(50.0), 1)],
        },
        ScoreCheck {
            metric: "debtServiceCoverage",
            tiers: &[tier(AtLeast(1.5), 3), tier(AtLeast(1.0), 2), tier(AtLeast(0.8), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "shortTermDebtShare",
            when: Above(50.0),
            emits: &[
                Risk("Most debt matures within a year, creating refinancing risk"),
                Recommend("Extend loan maturities to reduce refinancing pressure"),
            ],
        },
        NarrativeRule {
            metric: "debtServiceCoverage",
            when: Below(1.0),
            emits: &[Risk("Operating cash flow does not cover interest and short-term debt")],
        },
    ],
    opportunities: &[
        "Diversify funding sources",
        "Lengthen debt maturities",
    ],
    threats: &["Refinancing at higher rates"],
};

fn financing_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("financing-risk", "Financing risk", "Debt maturity profile and debt service capacity", 1),
        BS_CF,
        &FINANCING,
        |ctx| {
            let s = latest(ctx)?;
            let debt = f::total_debt(s);
            let short_term = (debt - f::long_term_debt(s)).max(0.0);
            let service = f::interest_expense(s) + short_term;
            let coverage = if service == 0.0 { 99.0 } else { f::operating_cash_flow(s) / service };
            Ok(Computed::new()
                .metric("shortTermDebtShare", percent(short_term, debt))
                .metric("debtServiceCoverage", coverage)
                .metric("financingCashFlow", f::financing_cash_flow(s)))
        },
    )
    .boxed()
}

static PRODUCTION: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "grossMarginChange",
            tiers: &[tier(AtLeast(0.0), 2), tier(AtLeast(-2.0), 1)],
        },
        ScoreCheck {
            metric: "inventoryDays",
            tiers: &[tier(AtMost(60.0), 2), tier(AtMost(120.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "grossMarginChange",
            when: Below(-2.0),
            emits: &[
                Risk("Production costs are rising faster than prices"),
                Recommend("Improve production efficiency and renegotiate input costs"),
            ],
        },
        NarrativeRule {
            metric: "inventoryDays",
            when: Above(120.0),
            emits: &[Weakness("Slow-moving inventory")],
        },
    ],
    opportunities: &[
        "Improve production efficiency",
        "Add production flexibility",
    ],
    threats: &[
        "Production disruptions",
        "Rising production costs",
    ],
};

fn production_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("production-risk", "Production risk", "Gross margin pressure and inventory holding period", 2),
        BS_IS,
        &PRODUCTION,
        |ctx| {
            let (cur, prev) = pair(ctx)?;
            let margin = |s: &FinancialStatement| percent(f::gross_profit(s), f::revenue(s));
            Ok(Computed::new()
                .metric("grossMargin", margin(cur))
                .metric("grossMarginChange", margin(cur) - margin(prev))
                .metric("inventoryDays", ratio(f::inventory(cur), f::cost_of_revenue(cur)) * DAYS))
        },
    )
    .boxed()
}

static SUPPLIER: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "payableDays",
            tiers: &[tier(Between(30.0, 90.0), 2), tier(AtMost(120.0), 1)],
        },
        ScoreCheck {
            metric: "payablesShare",
            tiers: &[tier(AtMost(50.0), 2), tier(AtMost(70.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "payableDays",
            when: Above(120.0),
            emits: &[
                Risk("Extended supplier credit may strain supplier relationships"),
                Recommend("Agree sustainable payment terms with key suppliers"),
            ],
        },
        NarrativeRule {
            metric: "payablesShare",
            when: Above(70.0),
            emits: &[Weakness("Short-term funding depends heavily on suppliers")],
        },
    ],
    opportunities: &[
        "Diversify the supplier base",
        "Negotiate longer supplier terms",
    ],
    threats: &["Supplier concentration or disruption"],
};

fn supplier_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("supplier-risk", "Supplier risk", "Payment period and reliance on supplier credit", 1),
        BS_IS,
        &SUPPLIER,
        |ctx| {
            let s = latest(ctx)?;
            Ok(Computed::new()
                .metric("payableDays", ratio(f::payables(s), f::cost_of_revenue(s)) * DAYS)
                .metric("payablesShare", percent(f::payables(s), f::current_liabilities(s))))
        },
    )
    .boxed()
}

static CUSTOMER: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "receivableDays",
            tiers: &[tier(AtMost(45.0), 3), tier(AtMost(60.0), 2), tier(AtMost(90.0), 1)],
        },
        ScoreCheck {
            metric: "receivablesShare",
            tiers: &[tier(AtMost(40.0), 2), tier(AtMost(60.0), 1)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "receivableDays",
        when: Above(90.0),
        emits: &[
            Risk("Customers take {value} days to pay"),
            Recommend("Improve credit control and collection management"),
        ],
    }],
    opportunities: &[
        "Broaden the customer base",
        "Improve credit control",
    ],
    threats: &["Customer defaults in a downturn"],
};

fn customer_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("customer-risk", "Customer risk", "Collection period and exposure to customer credit", 1),
        BS_IS,
        &CUSTOMER,
        |ctx| {
            let s = latest(ctx)?;
            Ok(Computed::new()
                .metric("receivableDays", ratio(f::receivables(s), f::revenue(s)) * DAYS)
                .metric("receivablesShare", percent(f::receivables(s), f::current_assets(s))))
        },
    )
    .boxed()
}

static TAX: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "taxDeviation",
        tiers: &[tier(AtMost(5.0), 3), tier(AtMost(10.0), 2), tier(AtMost(20.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "effectiveTaxRate",
            when: Below(5.0),
            emits: &[Risk("Unusually low effective tax rate may attract tax authority scrutiny")],
        },
        NarrativeRule {
            metric: "effectiveTaxRate",
            when: Above(35.0),
            emits: &[Recommend("Review tax planning; the effective rate of {value}% is high")],
        },
    ],
    opportunities: &[
        "Use available tax incentives",
        "Improve tax planning",
    ],
    threats: &["Changes in tax legislation"],
};

fn tax_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("tax-risk", "Tax risk", "Effective tax rate against a statutory benchmark", 1),
        IS,
        &TAX,
        |ctx| {
            let s = latest(ctx)?;
            let pre_tax = positive(f::income_before_tax(s), "income before tax")?;
            let rate = f::tax_expense(s) / pre_tax * 100.0;
            Ok(Computed::new()
                .metric("effectiveTaxRate", rate)
                .metric("taxDeviation", (rate - STATUTORY_TAX_RATE).abs()))
        },
    )
    .boxed()
}

static INNOVATION: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "researchIntensity",
        tiers: &[tier(AtLeast(5.0), 3), tier(AtLeast(2.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "researchIntensity",
            when: AtMost(0.0),
            emits: &[
                Risk("No reported research spending may erode competitiveness"),
                Recommend("Develop an innovation strategy with a dedicated research budget"),
            ],
        },
        NarrativeRule {
            metric: "researchIntensity",
            when: AtLeast(5.0),
            emits: &[Strength("Sustained investment in research")],
        },
    ],
    opportunities: &["New products from the research pipeline"],
    threats: &["Disruptive competitors"],
};

fn innovation_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("innovation-risk", "Innovation risk", "Research and development intensity", 1),
        IS,
        &INNOVATION,
        |ctx| {
            let s = latest(ctx)?;
            Ok(Computed::new()
                .metric("researchIntensity", percent(f::research_development(s), f::revenue(s)))
                .metric("researchSpending", f::research_development(s)))
        },
    )
    .boxed()
}

static COMPREHENSIVE: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "redFlags",
        tiers: &[tier(AtMost(0.0), 4), tier(AtMost(1.0), 3), tier(AtMost(2.0), 2), tier(AtMost(3.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "redFlags",
            when: AtLeast(3.0),
            emits: &[
                Risk("{value} independent risk indicators are flashing"),
                Recommend("Adopt a formal risk management programme covering credit, liquidity and profitability"),
            ],
        },
        NarrativeRule {
            metric: "redFlags",
            when: AtMost(0.0),
            emits: &[Note("No major risk indicator is triggered.")],
        },
    ],
    opportunities: &[
        "Set up an integrated risk management framework",
        "Address the highest risks first",
    ],
    threats: &[
        "Several risks materialising at once",
        "Changes in economic conditions",
    ],
};

fn comprehensive_risk() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("comprehensive-risk", "Comprehensive risk", "Count of triggered credit, liquidity, leverage and profitability warnings", 1),
        ALL,
        &COMPREHENSIVE,
        |ctx| {
            let s = latest(ctx)?;
            let flags = [
                ("Altman Z'' below 1.1", altman_z(s) < 1.1),
                ("Current ratio below 1", ratio(f::current_assets(s), f::current_liabilities(s)) < 1.0),
                ("Debt to equity above 2", ratio(f::total_liabilities(s), f::equity(s)) > 2.0),
                (
                    "Interest coverage below 1.5",
                    f::interest_expense(s) > 0.0 && ratio(f::operating_income(s), f::interest_expense(s)) < 1.5,
                ),
                ("Net loss", f::net_income(s) < 0.0),
                ("Negative operating cash flow", f::operating_cash_flow(s) < 0.0),
            ];
            let raised: Vec<&str> = flags.iter().filter(|(_, on)| *on).map(|(l, _)| *l).collect();
            let mut c = Computed::new()
                .metric("redFlags", raised.len() as f64)
                .metric("riskIndex", raised.len() as f64 / flags.len() as f64 * 100.0);
            c.narrative.swot.weaknesses.extend(raised.iter().map(|l| l.to_string()));
            Ok(c.detail("triggered", raised))
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{company_statements, market};
    use analysis_core::{AnalysisContext, MarketData, Rating, ResultStatus};
    use approx::assert_relative_eq;

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
        let placeholders = modules()
            .iter()
            .filter(|m| m.info().min_periods == 0)
            .count();
        assert_eq!(placeholders, 21);
    }

    #[test]
    fn altman_on_fixture() {
        // wc 100, retained 300, ebit 180, equity 500, liabilities 500, assets 1000
        let s = company_statements().pop().unwrap();
        assert_relative_eq!(altman_z(&s), 0.656 + 0.978 + 1.2096 + 1.05, epsilon = 1e-9);
    }

    #[test]
    fn credit_in_safe_zone() {
        let r = credit_risk().run(&AnalysisContext::new(company_statements()));
        assert_eq!(r.results["altmanZone"], "safe");
        // growth 20, profit 30, current ratio 1.5 gives 15, debt to equity of exactly 1 gives 0
        assert_relative_eq!(r.results["creditScore"].as_f64().unwrap(), 65.0);
        assert!(r.swot.strengths.iter().any(|s| s.contains("safe zone")));
    }

    #[test]
    fn market_risk_without_market_is_neutral() {
        let r = market_risk().run(&AnalysisContext::new(company_statements()));
        assert_relative_eq!(r.results["beta"].as_f64().unwrap(), 1.0);
        assert_relative_eq!(r.results["marketCorrelation"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn market_risk_uses_market_returns() {
        // revenue growth 12.5% then 11.1%, market 12% then 8%
        let falling = MarketData {
            market_returns: vec![0.12, 0.08],
            ..market()
        };
        let ctx = AnalysisContext::new(company_statements()).with_market(Some(falling));
        let r = market_risk().run(&ctx);
        assert_eq!(r.status, ResultStatus::Completed);
        assert_relative_eq!(r.results["beta"].as_f64().unwrap(), 0.347222, epsilon = 1e-5);
        assert_relative_eq!(r.results["marketCorrelation"].as_f64().unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(r.results["systematicRisk"].as_f64().unwrap(), 0.0069444, epsilon = 1e-6);
    }

    #[test]
    fn counter_cyclical_revenue_gives_negative_beta() {
        // market rises 8% -> 12% while revenue growth slows
        let ctx = AnalysisContext::new(company_statements()).with_market(Some(market()));
        let r = market_risk().run(&ctx);
        assert_eq!(r.status, ResultStatus::Completed);
        assert_relative_eq!(r.results["beta"].as_f64().unwrap(), -0.347222, epsilon = 1e-5);
        assert_relative_eq!(r.results["marketCorrelation"].as_f64().unwrap(), -1.0, epsilon = 1e-9);
        assert!(r.results["systematicRisk"].as_f64().unwrap() < 0.0);
    }

    #[test]
    fn tax_rate_at_statutory_level_scores_full() {
        // tax 40 on pre-tax 160
        let r = tax_risk().run(&AnalysisContext::new(company_statements()));
        assert_relative_eq!(r.results["effectiveTaxRate"].as_f64().unwrap(), 25.0, epsilon = 1e-9);
        assert_eq!(r.final_evaluation.rating, Rating::Excellent);
    }

    #[test]
    fn healthy_fixture_raises_no_flags() {
        let r = comprehensive_risk().run(&AnalysisContext::new(company_statements()));
        assert_relative_eq!(r.results["redFlags"].as_f64().unwrap(), 0.0);
        assert!(r.risks.is_empty());
    }
}
