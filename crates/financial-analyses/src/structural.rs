//! Structural analyses: how each statement is composed in the latest period.

use analysis_core::metrics::{percent, ratio};
use analysis_core::{AnalysisModule, Category, ModuleInfo, Section};

use crate::common::{composition, latest, positive};
use crate::fields as f;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Structural;
const BS: &[Section] = &[Section::BalanceSheet];
const IS: &[Section] = &[Section::IncomeStatement];
const CF: &[Section] = &[Section::CashFlowStatement];
const IS_CF: &[Section] = &[Section::IncomeStatement, Section::CashFlowStatement];
const BS_CF: &[Section] = &[Section::BalanceSheet, Section::CashFlowStatement];

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        balance_sheet(),
        income_statement(),
        cash_flow(),
        capital(),
        assets(),
        liabilities(),
        equity(),
        revenue(),
        expenses(),
        operating_cash_flow(),
        investing_cash_flow(),
        financing_cash_flow(),
        working_capital(),
        investment(),
        financing(),
    ]
}

static BALANCE_SHEET: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "currentAssetsShare",
            tiers: &[tier(Between(20.0, 40.0), 2), tier(Above(40.0), 1)],
        },
        ScoreCheck {
            metric: "currentLiabilitiesShare",
            tiers: &[tier(AtMost(30.0), 2), tier(AtMost(50.0), 1)],
        },
        ScoreCheck {
            metric: "equityShare",
            tiers: &[tier(AtLeast(40.0), 2), tier(AtLeast(20.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "equityShare",
            when: Below(30.0),
            emits: &[
                Recommend("Strengthen the equity base to reduce reliance on debt financing"),
                Risk("Equity covers only {value}% of total assets"),
                Weakness("Thin equity cushion"),
            ],
        },
        NarrativeRule {
            metric: "equityShare",
            when: AtLeast(50.0),
            emits: &[Strength("Equity funds {value}% of the asset base")],
        },
        NarrativeRule {
            metric: "currentLiabilitiesShare",
            when: Above(50.0),
            emits: &[
                Recommend("Refinance short-term obligations into long-term credit facilities"),
                Risk("Short-term liabilities fund {value}% of assets"),
            ],
        },
        NarrativeRule {
            metric: "currentAssetsShare",
            when: Below(20.0),
            emits: &[
                Recommend("Improve working capital management to raise liquid assets"),
                Weakness("Low share of current assets"),
            ],
        },
    ],
    opportunities: &["Optimise the balance between current and fixed assets"],
    threats: &["Rising interest rates increase the cost of carrying liabilities"],
};

fn balance_sheet() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "balance-sheet-structure",
            "Balance sheet structure",
            "Composition of assets, liabilities and equity in the latest period",
            CAT,
            1,
        ),
        BS,
        &BALANCE_SHEET,
        |ctx| {
            let s = latest(ctx)?;
            let total = positive(f::total_assets(s), "total assets")?;
            let ca = f::current_assets(s);
            let nca = f::non_current_assets(s);
            let cl = f::current_liabilities(s);
            let ncl = f::non_current_liabilities(s);
            let eq = f::equity(s);
            Ok(Computed::new()
                .metric("totalAssets", total)
                .metric("currentAssetsShare", percent(ca, total))
                .metric("nonCurrentAssetsShare", percent(nca, total))
                .metric("currentLiabilitiesShare", percent(cl, total))
                .metric("nonCurrentLiabilitiesShare", percent(ncl, total))
                .metric("equityShare", percent(eq, total))
                .chart(composition(
                    "Asset composition",
                    &[("Current assets", ca), ("Non-current assets", nca)],
                ))
                .chart(composition(
                    "Funding composition",
                    &[("Current liabilities", cl), ("Non-current liabilities", ncl), ("Equity", eq)],
                )))
        },
    )
    .boxed()
}

static INCOME_STATEMENT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "grossMargin",
            tiers: &[tier(AtLeast(40.0), 3), tier(AtLeast(25.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "operatingMargin",
            tiers: &[tier(AtLeast(15.0), 3), tier(AtLeast(8.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "netMargin",
            tiers: &[tier(AtLeast(10.0), 3), tier(AtLeast(5.0), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "netMargin",
            when: AtMost(0.0),
            emits: &[
                Recommend("Review the pricing strategy and cost management to restore profitability"),
                Risk("The company reports a net loss ({value}% of revenue)"),
                Weakness("Negative bottom line"),
            ],
        },
        NarrativeRule {
            metric: "netMargin",
            when: AtLeast(10.0),
            emits: &[Strength("Net margin of {value}%")],
        },
        NarrativeRule {
            metric: "operatingExpenseShare",
            when: Above(35.0),
            emits: &[Recommend("Improve operating expense management; overheads absorb {value}% of revenue")],
        },
    ],
    opportunities: &["Margin expansion through scale efficiencies"],
    threats: &["Input cost inflation compressing gross margin"],
};

fn income_statement() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "income-statement-structure",
            "Income statement structure",
            "How revenue is consumed by costs down to net income",
            CAT,
            1,
        ),
        IS,
        &INCOME_STATEMENT,
        |ctx| {
            let s = latest(ctx)?;
            let rev = positive(f::revenue(s), "revenue")?;
            let cogs = f::cost_of_revenue(s);
            let opex = f::operating_expenses(s);
            let ni = f::net_income(s);
            Ok(Computed::new()
                .metric("revenue", rev)
                .metric("costOfRevenueShare", percent(cogs, rev))
                .metric("operatingExpenseShare", percent(opex, rev))
                .metric("grossMargin", percent(f::gross_profit(s), rev))
                .metric("operatingMargin", percent(f::operating_income(s), rev))
                .metric("netMargin", percent(ni, rev))
                .chart(composition(
                    "Revenue allocation",
                    &[
                        ("Cost of revenue", cogs),
                        ("Operating expenses", opex),
                        ("Net income", ni.max(0.0)),
                    ],
                )))
        },
    )
    .boxed()
}

static CASH_FLOW: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "operatingCashFlow",
            tiers: &[tier(Above(0.0), 3)],
        },
        ScoreCheck {
            metric: "cashConversion",
            tiers: &[tier(AtLeast(1.0), 2), tier(AtLeast(0.7), 1)],
        },
        ScoreCheck {
            metric: "freeCashFlow",
            tiers: &[tier(Above(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "operatingCashFlow",
            when: AtMost(0.0),
            emits: &[
                Recommend("Improve collection management to turn operations cash positive"),
                Risk("Operations consume cash"),
                Weakness("Negative operating cash flow"),
            ],
        },
        NarrativeRule {
            metric: "freeCashFlow",
            when: Above(0.0),
            emits: &[Strength("Positive free cash flow"), Opportunity("Free cash flow can fund new investment")],
        },
        NarrativeRule {
            metric: "cashConversion",
            when: Below(0.7),
            emits: &[Note("Earnings convert poorly into operating cash.")],
        },
    ],
    opportunities: &[
        "Improve cash flow management",
        "Increase operating cash flow",
    ],
    threats: &["Tightening credit conditions would expose any cash shortfall"],
};

fn cash_flow() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "cash-flow-structure",
            "Cash flow structure",
            "Split of cash flow between operating, investing and financing activities",
            CAT,
            1,
        ),
        IS_CF,
        &CASH_FLOW,
        |ctx| {
            let s = latest(ctx)?;
            let ocf = f::operating_cash_flow(s);
            let icf = f::investing_cash_flow(s);
            let fcf = f::financing_cash_flow(s);
            Ok(Computed::new()
                .metric("operatingCashFlow", ocf)
                .metric("investingCashFlow", icf)
                .metric("financingCashFlow", fcf)
                .metric("netCashFlow", f::net_cash_flow(s))
                .metric("freeCashFlow", f::free_cash_flow(s))
                .metric("cashConversion", ratio(ocf, f::net_income(s)))
                .chart(composition(
                    "Cash flow by activity (absolute)",
                    &[("Operating", ocf.abs()), ("Investing", icf.abs()), ("Financing", fcf.abs())],
                )))
        },
    )
    .boxed()
}

static CAPITAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "debtToCapital",
            tiers: &[tier(AtMost(30.0), 3), tier(AtMost(50.0), 2), tier(AtMost(70.0), 1)],
        },
        ScoreCheck {
            metric: "longTermDebtShare",
            tiers: &[tier(AtLeast(60.0), 2), tier(AtLeast(30.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "debtToCapital",
            when: Above(60.0),
            emits: &[
                Recommend("Reduce leverage before seeking additional loan financing"),
                Risk("Debt makes up {value}% of invested capital"),
                Weakness("Debt-heavy capital structure"),
            ],
        },
        NarrativeRule {
            metric: "debtToCapital",
            when: AtMost(30.0),
            emits: &[
                Strength("Conservative capital structure"),
                Opportunity("Unused debt capacity for growth investment"),
            ],
        },
    ],
    opportunities: &[
        "Optimise the capital structure",
        "Lower the cost of capital",
    ],
    threats: &["Higher refinancing costs if credit spreads widen"],
};

fn capital() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "capital-structure",
            "Capital structure",
            "Mix of debt and equity in invested capital",
            CAT,
            1,
        ),
        BS,
        &CAPITAL,
        |ctx| {
            let s = latest(ctx)?;
            let debt = f::total_debt(s);
            let eq = f::equity(s);
            let capital = positive(debt + eq, "invested capital")?;
            Ok(Computed::new()
                .metric("totalDebt", debt)
                .metric("equity", eq)
                .metric("debtToCapital", percent(debt, capital))
                .metric("equityToCapital", percent(eq, capital))
                .metric("longTermDebtShare", percent(f::long_term_debt(s), debt))
                .chart(composition("Capital mix", &[("Debt", debt), ("Equity", eq)])))
        },
    )
    .boxed()
}

static ASSETS: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "liquidAssetsShare",
            tiers: &[tier(AtLeast(10.0), 2), tier(AtLeast(5.0), 1)],
        },
        ScoreCheck {
            metric: "intangibleShare",
            tiers: &[tier(AtMost(20.0), 2), tier(AtMost(40.0), 1)],
        },
        ScoreCheck {
            metric: "fixedAssetsShare",
            tiers: &[tier(Between(20.0, 60.0), 2), tier(AtMost(75.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "intangibleShare",
            when: Above(40.0),
            emits: &[
                Risk("Intangibles and goodwill represent {value}% of assets"),
                Recommend("Review goodwill valuation for impairment risk"),
            ],
        },
        NarrativeRule {
            metric: "liquidAssetsShare",
            when: Below(5.0),
            emits: &[Weakness("Little cash on the balance sheet")],
        },
        NarrativeRule {
            metric: "liquidAssetsShare",
            when: AtLeast(15.0),
            emits: &[Strength("Large liquid asset reserve")],
        },
    ],
    opportunities: &["Redeploy idle assets into higher-return investment"],
    threats: &[
        "Changes in asset values",
        "Asset obsolescence",
    ],
};

fn assets() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "asset-structure",
            "Asset structure",
            "Composition of the asset base by liquidity and tangibility",
            CAT,
            1,
        ),
        BS,
        &ASSETS,
        |ctx| {
            let s = latest(ctx)?;
            let total = positive(f::total_assets(s), "total assets")?;
            let liquid = f::cash(s) + f::marketable_securities(s);
            let fixed = f::fixed_assets(s);
            let intangible = f::intangible_assets(s);
            let other = (total - liquid - fixed - intangible).max(0.0);
            Ok(Computed::new()
                .metric("liquidAssetsShare", percent(liquid, total))
                .metric("receivablesShare", percent(f::receivables(s), total))
                .metric("inventoryShare", percent(f::inventory(s), total))
                .metric("fixedAssetsShare", percent(fixed, total))
                .metric("intangibleShare", percent(intangible, total))
                .chart(composition(
                    "Asset mix",
                    &[("Liquid", liquid), ("Fixed", fixed), ("Intangible", intangible), ("Other", other)],
                )))
        },
    )
    .boxed()
}

static LIABILITIES: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "currentShare",
            tiers: &[tier(AtMost(50.0), 2), tier(AtMost(70.0), 1)],
        },
        ScoreCheck {
            metric: "liabilitiesToAssets",
            tiers: &[tier(AtMost(50.0), 3), tier(AtMost(70.0), 2), tier(AtMost(85.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "currentShare",
            when: Above(70.0),
            emits: &[
                Recommend("Lengthen debt maturities through long-term financing"),
                Risk("{value}% of liabilities fall due within a year"),
            ],
        },
        NarrativeRule {
            metric: "liabilitiesToAssets",
            when: Above(85.0),
            emits: &[Threat("Creditors could tighten loan covenants"), Weakness("Liabilities nearly exhaust assets")],
        },
    ],
    opportunities: &[
        "Improve liability management",
        "Refinance at lower cost",
    ],
    threats: &[
        "Rising interest rates",
        "Tighter credit conditions",
    ],
};

fn liabilities() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "liability-structure",
            "Liability structure",
            "Maturity profile of obligations",
            CAT,
            1,
        ),
        BS,
        &LIABILITIES,
        |ctx| {
            let s = latest(ctx)?;
            let total = positive(f::total_liabilities(s), "total liabilities")?;
            let cl = f::current_liabilities(s);
            let ncl = f::non_current_liabilities(s);
            Ok(Computed::new()
                .metric("totalLiabilities", total)
                .metric("currentShare", percent(cl, total))
                .metric("nonCurrentShare", percent(ncl, total))
                .metric("payablesShare", percent(f::payables(s), total))
                .metric("debtShare", percent(f::total_debt(s), total))
                .metric("liabilitiesToAssets", percent(total, f::total_assets(s)))
                .chart(composition("Liability maturity", &[("Current", cl), ("Non-current", ncl)])))
        },
    )
    .boxed()
}

static EQUITY: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "equity",
            tiers: &[tier(Above(0.0), 2)],
        },
        ScoreCheck {
            metric: "retainedEarningsShare",
            tiers: &[tier(AtLeast(50.0), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "equity",
            when: AtMost(0.0),
            emits: &[
                Risk("Shareholders' equity is negative"),
                Recommend("Develop a recapitalisation strategy with management and shareholders"),
                Weakness("Negative book value"),
            ],
        },
        NarrativeRule {
            metric: "retainedEarningsShare",
            when: AtLeast(50.0),
            emits: &[Strength("Equity is built mostly from retained earnings")],
        },
    ],
    opportunities: &["Retained earnings can self-finance expansion"],
    threats: &[
        "Equity dilution",
        "Losses eroding equity",
    ],
};

fn equity() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "equity-structure",
            "Equity structure",
            "Split of shareholders' equity between contributed and earned capital",
            CAT,
            1,
        ),
        BS,
        &EQUITY,
        |ctx| {
            let s = latest(ctx)?;
            let eq = f::equity(s);
            let retained = f::retained_earnings(s);
            let contributed = (eq - retained).max(0.0);
            Ok(Computed::new()
                .metric("equity", eq)
                .metric("retainedEarningsShare", percent(retained, eq.max(0.0)))
                .metric("contributedShare", percent(contributed, eq.max(0.0)))
                .metric("bookValuePerShare", ratio(eq, f::shares_outstanding(s)))
                .chart(composition(
                    "Equity composition",
                    &[("Retained earnings", retained.max(0.0)), ("Contributed capital", contributed)],
                )))
        },
    )
    .boxed()
}

static REVENUE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "grossMargin",
            tiers: &[tier(AtLeast(40.0), 3), tier(AtLeast(20.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "nonOperatingShare",
            tiers: &[tier(AtMost(10.0), 2), tier(AtMost(25.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "nonOperatingShare",
            when: Above(25.0),
            emits: &[
                Risk("Non-operating income makes up {value}% of revenue"),
                Recommend("Improve the core business strategy to reduce reliance on non-operating income"),
            ],
        },
        NarrativeRule {
            metric: "grossMargin",
            when: Below(20.0),
            emits: &[Weakness("Thin gross margin on sales")],
        },
    ],
    opportunities: &["Diversify revenue streams"],
    threats: &["Price competition erodes gross margin"],
};

fn revenue() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "revenue-structure",
            "Revenue structure",
            "Quality and composition of revenue",
            CAT,
            1,
        ),
        IS,
        &REVENUE,
        |ctx| {
            let s = latest(ctx)?;
            let rev = positive(f::revenue(s), "revenue")?;
            let non_operating = s.get(Section::IncomeStatement, "nonOperatingIncome").unwrap_or(0.0);
            Ok(Computed::new()
                .metric("revenue", rev)
                .metric("grossMargin", percent(f::gross_profit(s), rev))
                .metric("nonOperatingShare", percent(non_operating, rev))
                .chart(composition(
                    "Revenue split",
                    &[("Cost of revenue", f::cost_of_revenue(s)), ("Gross profit", f::gross_profit(s).max(0.0))],
                )))
        },
    )
    .boxed()
}

static EXPENSES: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "expenseToRevenue",
            tiers: &[tier(AtMost(80.0), 3), tier(AtMost(90.0), 2), tier(AtMost(100.0), 1)],
        },
        ScoreCheck {
            metric: "interestShare",
            tiers: &[tier(AtMost(5.0), 2), tier(AtMost(10.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "expenseToRevenue",
            when: Above(100.0),
            emits: &[
                Risk("Expenses exceed revenue ({value}%)"),
                Recommend("Launch a cost management programme across operations"),
                Weakness("Cost base larger than revenue"),
            ],
        },
        NarrativeRule {
            metric: "interestShare",
            when: Above(10.0),
            emits: &[Recommend("Renegotiate loan terms to lower financing costs")],
        },
    ],
    opportunities: &["Automation to lower the operating cost base"],
    threats: &[
        "Rising costs",
        "Inflation",
    ],
};

fn expenses() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "expense-structure",
            "Expense structure",
            "Composition of total expenses",
            CAT,
            1,
        ),
        IS,
        &EXPENSES,
        |ctx| {
            let s = latest(ctx)?;
            let total = positive(f::total_expenses(s), "total expenses")?;
            let cogs = f::cost_of_revenue(s);
            let opex = f::operating_expenses(s);
            let interest = f::interest_expense(s);
            let tax = f::tax_expense(s);
            Ok(Computed::new()
                .metric("totalExpenses", total)
                .metric("costOfRevenueShare", percent(cogs, total))
                .metric("operatingShare", percent(opex, total))
                .metric("interestShare", percent(interest, total))
                .metric("taxShare", percent(tax, total))
                .metric("expenseToRevenue", percent(total, f::revenue(s)))
                .chart(composition(
                    "Expense mix",
                    &[("Cost of revenue", cogs), ("Operating", opex), ("Interest", interest), ("Tax", tax)],
                )))
        },
    )
    .boxed()
}

static OPERATING_CF: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "operatingCashMargin",
            tiers: &[tier(AtLeast(15.0), 3), tier(AtLeast(5.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "earningsQuality",
            tiers: &[tier(AtLeast(1.0), 2), tier(AtLeast(0.5), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "earningsQuality",
            when: Below(0.5),
            emits: &[
                Risk("Reported earnings are weakly backed by cash"),
                Recommend("Improve receivables management to convert profit into cash"),
            ],
        },
        NarrativeRule {
            metric: "operatingCashMargin",
            when: AtLeast(15.0),
            emits: &[Strength("Operations generate {value}% of revenue in cash")],
        },
    ],
    opportunities: &[
        "Improve operating cash generation",
        "Speed up collections",
    ],
    threats: &[
        "Falling operating cash flow",
        "Customer payment delays",
    ],
};

fn operating_cash_flow() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "operating-cash-flow-structure",
            "Operating cash flow structure",
            "Cash generation from operations relative to revenue and earnings",
            CAT,
            1,
        ),
        IS_CF,
        &OPERATING_CF,
        |ctx| {
            let s = latest(ctx)?;
            let ocf = f::operating_cash_flow(s);
            let ni = f::net_income(s);
            Ok(Computed::new()
                .metric("operatingCashFlow", ocf)
                .metric("operatingCashMargin", percent(ocf, f::revenue(s)))
                .metric("earningsQuality", ratio(ocf, ni))
                .metric("depreciationAddBack", f::depreciation(s))
                .chart(composition("Operating cash vs earnings", &[("Operating cash flow", ocf.abs()), ("Net income", ni.abs())])))
        },
    )
    .boxed()
}

static INVESTING_CF: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "capexCoverage",
            tiers: &[tier(AtLeast(1.5), 3), tier(AtLeast(1.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "reinvestmentRate",
            tiers: &[tier(Between(3.0, 15.0), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "capexCoverage",
            when: Below(1.0),
            emits: &[
                Recommend("Phase capital investment to match operating cash generation"),
                Risk("Capital expenditure exceeds operating cash flow"),
            ],
        },
        NarrativeRule {
            metric: "reinvestmentRate",
            when: AtMost(0.0),
            emits: &[Threat("Under-investment may erode the asset base")],
        },
    ],
    opportunities: &["Targeted investment in capacity growth"],
    threats: &[
        "Poor return on investment",
        "Overinvestment",
    ],
};

fn investing_cash_flow() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "investing-cash-flow-structure",
            "Investing cash flow structure",
            "Capital expenditure intensity and its funding from operations",
            CAT,
            1,
        ),
        CF,
        &INVESTING_CF,
        |ctx| {
            let s = latest(ctx)?;
            let capex = f::capital_expenditures(s);
            let ocf = f::operating_cash_flow(s);
            let rev = f::revenue(s);
            let mut c = Computed::new()
                .metric("investingCashFlow", f::investing_cash_flow(s))
                .metric("capitalExpenditures", capex)
                .metric("reinvestmentRate", percent(capex, rev))
                .chart(composition("Capex vs operating cash", &[("Capex", capex), ("Operating cash flow", ocf.max(0.0))]));
            if capex > 0.0 {
                c.set("capexCoverage", ratio(ocf, capex));
            }
            Ok(c)
        },
    )
    .boxed()
}

static FINANCING_CF: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "financingDependence",
            tiers: &[tier(AtMost(0.0), 3), tier(AtMost(25.0), 2), tier(AtMost(50.0), 1)],
        },
        ScoreCheck {
            metric: "dividendCoverage",
            tiers: &[tier(AtLeast(2.0), 2), tier(AtLeast(1.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "financingDependence",
            when: Above(50.0),
            emits: &[
                Risk("External financing supplies {value}% of cash inflows"),
                Recommend("Reduce dependence on new loan and equity financing"),
            ],
        },
        NarrativeRule {
            metric: "dividendCoverage",
            when: Below(1.0),
            emits: &[Weakness("Dividends exceed free cash flow")],
        },
    ],
    opportunities: &[
        "Diversify funding sources",
        "Improve financing terms",
    ],
    threats: &["Capital markets may close to new issuance"],
};

fn financing_cash_flow() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "financing-cash-flow-structure",
            "Financing cash flow structure",
            "Reliance on external financing and shareholder distributions",
            CAT,
            1,
        ),
        CF,
        &FINANCING_CF,
        |ctx| {
            let s = latest(ctx)?;
            let fin = f::financing_cash_flow(s);
            let ocf = f::operating_cash_flow(s);
            let inflows = ocf.max(0.0) + fin.max(0.0);
            let dividends = f::dividends_paid(s);
            let mut c = Computed::new()
                .metric("financingCashFlow", fin)
                .metric("dividendsPaid", dividends)
                .metric("financingDependence", percent(fin.max(0.0), inflows))
                .chart(composition("Cash inflow sources", &[("Operations", ocf.max(0.0)), ("Financing", fin.max(0.0))]));
            if dividends > 0.0 {
                c.set("dividendCoverage", ratio(f::free_cash_flow(s), dividends));
            }
            Ok(c)
        },
    )
    .boxed()
}

static WORKING_CAPITAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "workingCapital",
            tiers: &[tier(Above(0.0), 3)],
        },
        ScoreCheck {
            metric: "cashShare",
            tiers: &[tier(AtLeast(20.0), 2), tier(AtLeast(10.0), 1)],
        },
        ScoreCheck {
            metric: "inventoryShare",
            tiers: &[tier(AtMost(40.0), 2), tier(AtMost(60.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "workingCapital",
            when: AtMost(0.0),
            emits: &[
                Risk("Current liabilities exceed current assets"),
                Recommend("Improve working capital management and secure a revolving credit line"),
            ],
        },
        NarrativeRule {
            metric: "inventoryShare",
            when: Above(60.0),
            emits: &[Weakness("Current assets are tied up in inventory")],
        },
    ],
    opportunities: &[
        "Improve working capital management",
        "Shorten the cash cycle",
    ],
    threats: &[
        "Working capital squeeze",
        "Customer payment delays",
    ],
};

fn working_capital() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "working-capital-structure",
            "Working capital structure",
            "Composition of current assets and net working capital",
            CAT,
            1,
        ),
        BS,
        &WORKING_CAPITAL,
        |ctx| {
            let s = latest(ctx)?;
            let ca = positive(f::current_assets(s), "current assets")?;
            let cash = f::cash(s);
            let ar = f::receivables(s);
            let inv = f::inventory(s);
            Ok(Computed::new()
                .metric("workingCapital", f::working_capital(s))
                .metric("cashShare", percent(cash, ca))
                .metric("receivablesShare", percent(ar, ca))
                .metric("inventoryShare", percent(inv, ca))
                .chart(composition(
                    "Current asset mix",
                    &[("Cash", cash), ("Receivables", ar), ("Inventory", inv), ("Other", (ca - cash - ar - inv).max(0.0))],
                )))
        },
    )
    .boxed()
}

static INVESTMENT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "productiveAssetsShare",
            tiers: &[tier(Between(30.0, 70.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "capexToDepreciation",
            tiers: &[tier(AtLeast(1.0), 2), tier(AtLeast(0.5), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "capexToDepreciation",
            when: Below(0.5),
            emits: &[
                Risk("Investment lags depreciation; the asset base is shrinking"),
                Recommend("Set an investment strategy to renew productive capacity"),
            ],
        },
        NarrativeRule {
            metric: "capexToDepreciation",
            when: AtLeast(1.0),
            emits: &[Strength("Investment keeps pace with depreciation")],
        },
    ],
    opportunities: &[
        "Invest in growth projects",
        "Rebalance the investment mix",
    ],
    threats: &[
        "Falling investment values",
        "Poor investment returns",
    ],
};

fn investment() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "investment-structure",
            "Investment structure",
            "Allocation of capital between operating and financial investments",
            CAT,
            1,
        ),
        BS_CF,
        &INVESTMENT,
        |ctx| {
            let s = latest(ctx)?;
            let total = positive(f::total_assets(s), "total assets")?;
            let fixed = f::fixed_assets(s);
            let financial = f::investments(s);
            let mut c = Computed::new()
                .metric("productiveAssetsShare", percent(fixed, total))
                .metric("financialInvestmentShare", percent(financial, total))
                .chart(composition("Invested assets", &[("Fixed assets", fixed), ("Financial investments", financial)]));
            let dep = f::depreciation(s);
            if dep > 0.0 {
                c.set("capexToDepreciation", ratio(f::capital_expenditures(s), dep));
            }
            Ok(c)
        },
    )
    .boxed()
}

static FINANCING: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "internalFundingShare",
            tiers: &[tier(AtLeast(60.0), 3), tier(AtLeast(40.0), 2), tier(AtLeast(20.0), 1)],
        },
        ScoreCheck {
            metric: "debtToEquity",
            tiers: &[tier(AtMost(1.0), 2), tier(AtMost(2.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "internalFundingShare",
            when: Below(20.0),
            emits: &[
                Risk("Assets are funded mostly by creditors"),
                Recommend("Rebalance the financing mix toward equity and retained earnings"),
            ],
        },
        NarrativeRule {
            metric: "debtToEquity",
            when: AtMost(1.0),
            emits: &[Strength("Balanced use of debt financing")],
        },
    ],
    opportunities: &["Access to cheaper credit with an improved financing mix"],
    threats: &[
        "Rising financing costs",
        "Refinancing risk",
    ],
};

fn financing() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "financing-structure",
            "Financing structure",
            "Sources of funds: owners, lenders and operating creditors",
            CAT,
            1,
        ),
        BS,
        &FINANCING,
        |ctx| {
            let s = latest(ctx)?;
            let total = positive(f::total_assets(s), "total assets")?;
            let eq = f::equity(s);
            let debt = f::total_debt(s);
            let other = (f::total_liabilities(s) - debt).max(0.0);
            Ok(Computed::new()
                .metric("internalFundingShare", percent(eq, total))
                .metric("debtFundingShare", percent(debt, total))
                .metric("operatingCreditShare", percent(other, total))
                .metric("debtToEquity", ratio(debt, eq))
                .chart(composition("Funding sources", &[("Equity", eq.max(0.0)), ("Debt", debt), ("Operating creditors", other)])))
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::company_statements;
    use analysis_core::{AnalysisContext, Rating};
    use approx::assert_relative_eq;

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn balance_sheet_shares() {
        let ctx = AnalysisContext::new(company_statements());
        let r = balance_sheet().run(&ctx);
        assert!(!r.is_degraded());
        // 300 / 1000 current assets, 200 / 1000 current liabilities, 500 / 1000 equity
        assert_relative_eq!(r.results["currentAssetsShare"].as_f64().unwrap(), 30.0);
        assert_relative_eq!(r.results["equityShare"].as_f64().unwrap(), 50.0);
        assert_eq!(r.final_evaluation.score, 6);
        assert_eq!(r.final_evaluation.rating, Rating::Excellent);
        assert_eq!(r.charts.len(), 2);
    }

    #[test]
    fn zero_assets_degrade() {
        let ctx = AnalysisContext::new(vec![analysis_core::FinancialStatement::default()
            .with_value(Section::BalanceSheet, "totalAssets", 0.0)]);
        let r = balance_sheet().run(&ctx);
        assert!(r.is_degraded());
        assert!(r.final_evaluation.interpretation.contains("total assets"));
    }

    #[test]
    fn every_module_completes_on_a_full_statement() {
        let ctx = AnalysisContext::new(company_statements());
        for m in modules() {
            let r = m.run(&ctx);
            assert!(!r.is_degraded(), "{} degraded: {}", r.id, r.final_evaluation.interpretation);
        }
    }
}
