//! Classic financial ratios: liquidity, leverage, profitability, efficiency
//! and market ratios. Most are a single latest-period value with its history
//! and, when supplied, the industry average.

use analysis_core::metrics::{percent, ratio};
use analysis_core::statements::{period_labels, previous};
use analysis_core::{
    AnalysisContext, AnalysisError, AnalysisModule, Category, Chart, ChartPoint,
    FinancialStatement, ModuleInfo, Section,
};

use crate::common::{latest, positive, Item};
use crate::fields as f;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Ratios;
const BS: &[Section] = &[Section::BalanceSheet];
const IS: &[Section] = &[Section::IncomeStatement];
const BS_IS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];
const BS_CF: &[Section] = &[Section::BalanceSheet, Section::CashFlowStatement];
const IS_CF: &[Section] = &[Section::IncomeStatement, Section::CashFlowStatement];

const DAYS: f64 = 365.0;

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        // liquidity
        single("current-ratio", "Current ratio", "Current assets over current liabilities", BS, "currentRatio", &CURRENT, current_ratio),
        single("quick-ratio", "Quick ratio", "Liquid current assets excluding inventory over current liabilities", BS, "quickRatio", &QUICK, quick_ratio),
        single("cash-ratio", "Cash ratio", "Cash and marketable securities over current liabilities", BS, "cashRatio", &CASH, cash_ratio),
        single("operating-cash-flow-ratio", "Operating cash flow ratio", "Operating cash flow over current liabilities", BS_CF, "operatingCashFlowRatio", &OCF_RATIO, ocf_ratio),
        single("working-capital-ratio", "Working capital to assets", "Net working capital as a share of total assets", BS, "workingCapitalToAssets", &WORKING_CAPITAL, working_capital_to_assets),
        // leverage
        single("debt-to-assets", "Debt to assets", "Total liabilities over total assets", BS, "debtToAssets", &DEBT_TO_ASSETS, debt_to_assets),
        single("debt-to-equity", "Debt to equity", "Total liabilities over shareholders' equity", BS, "debtToEquity", &DEBT_TO_EQUITY, debt_to_equity),
        single("equity-multiplier", "Equity multiplier", "Total assets over shareholders' equity", BS, "equityMultiplier", &EQUITY_MULTIPLIER, equity_multiplier),
        single("interest-coverage", "Interest coverage", "Operating income over interest expense", IS, "interestCoverage", &INTEREST_COVERAGE, interest_coverage),
        single("long-term-debt-to-capitalization", "Long-term debt to capitalisation", "Long-term debt over long-term debt plus equity", BS, "longTermDebtToCapitalization", &LT_DEBT_CAP, lt_debt_to_cap),
        // profitability
        single("gross-margin", "Gross margin", "Gross profit as a percentage of revenue", IS, "grossMargin", &GROSS_MARGIN, gross_margin),
        single("operating-margin", "Operating margin", "Operating income as a percentage of revenue", IS, "operatingMargin", &OPERATING_MARGIN, operating_margin),
        single("net-margin", "Net profit margin", "Net income as a percentage of revenue", IS, "netMargin", &NET_MARGIN, net_margin),
        single("ebitda-margin", "EBITDA margin", "EBITDA as a percentage of revenue", IS, "ebitdaMargin", &EBITDA_MARGIN, ebitda_margin),
        single("return-on-assets", "Return on assets", "Net income over total assets", BS_IS, "returnOnAssets", &ROA, roa),
        single("return-on-equity", "Return on equity", "Net income over shareholders' equity", BS_IS, "returnOnEquity", &ROE, roe),
        single("return-on-capital-employed", "Return on capital employed", "Operating income over total assets less current liabilities", BS_IS, "returnOnCapitalEmployed", &ROCE, roce),
        // efficiency
        single("inventory-turnover", "Inventory turnover", "Cost of revenue over inventory", BS_IS, "inventoryTurnover", &INVENTORY_TURNOVER, inventory_turnover),
        single("receivables-turnover", "Receivables turnover", "Revenue over accounts receivable", BS_IS, "receivablesTurnover", &RECEIVABLES_TURNOVER, receivables_turnover),
        single("payables-turnover", "Payables turnover", "Cost of revenue over accounts payable", BS_IS, "payablesTurnover", &PAYABLES_TURNOVER, payables_turnover),
        single("asset-turnover", "Asset turnover", "Revenue over total assets", BS_IS, "assetTurnover", &ASSET_TURNOVER, asset_turnover),
        single("fixed-asset-turnover", "Fixed asset turnover", "Revenue over fixed assets", BS_IS, "fixedAssetTurnover", &FIXED_ASSET_TURNOVER, fixed_asset_turnover),
        single("days-sales-outstanding", "Days sales outstanding", "Average collection period in days", BS_IS, "daysSalesOutstanding", &DSO, dso),
        single("days-inventory-outstanding", "Days inventory outstanding", "Average days inventory is held", BS_IS, "daysInventoryOutstanding", &DIO, dio),
        cash_conversion_cycle(),
        // market
        single("earnings-per-share", "Earnings per share", "Net income per outstanding share", BS_IS, "earningsPerShare", &EPS, eps),
        price_to_earnings(),
        price_to_book(),
        dividend_yield(),
        single("payout-ratio", "Dividend payout ratio", "Dividends paid as a percentage of net income", IS_CF, "payoutRatio", &PAYOUT, payout_ratio),
    ]
}

/// Latest value of one statement ratio with its history, period change and
/// industry comparison.
fn single(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    sections: &'static [Section],
    metric: &'static str,
    rules: &'static RuleSet,
    value: Item,
) -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(id, name, description, CAT, 1),
        sections,
        rules,
        move |ctx| {
            let s = latest(ctx)?;
            let v = value(s);
            let mut c = Computed::new()
                .metric(metric, v)
                .chart(history(name, &ctx.statements, value));
            if let Some(p) = previous(&ctx.statements) {
                c.set("previousValue", value(p));
                c.set("change", v - value(p));
            }
            if let Some(avg) = industry(ctx, metric) {
                c.set("industryAverage", avg);
                c.set("differenceFromIndustry", v - avg);
            }
            Ok(c)
        },
    )
    .boxed()
}

fn history(title: &str, statements: &[FinancialStatement], value: Item) -> Chart {
    Chart::line(
        title,
        period_labels(statements)
            .into_iter()
            .zip(statements.iter().map(value))
            .map(|(l, v)| ChartPoint::new(l, v))
            .collect(),
    )
}

fn industry(ctx: &AnalysisContext, metric: &str) -> Option<f64> {
    ctx.benchmark.as_ref().and_then(|b| b.industry_average(metric))
}

fn price(ctx: &AnalysisContext) -> Result<f64, AnalysisError> {
    ctx.market
        .as_ref()
        .and_then(|m| m.current_price)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| AnalysisError::InsufficientData("current market price is not available".into()))
}

fn current_ratio(s: &FinancialStatement) -> f64 {
    ratio(f::current_assets(s), f::current_liabilities(s))
}

fn quick_ratio(s: &FinancialStatement) -> f64 {
    ratio(f::current_assets(s) - f::inventory(s), f::current_liabilities(s))
}

fn cash_ratio(s: &FinancialStatement) -> f64 {
    ratio(f::cash(s) + f::marketable_securities(s), f::current_liabilities(s))
}

fn ocf_ratio(s: &FinancialStatement) -> f64 {
    ratio(f::operating_cash_flow(s), f::current_liabilities(s))
}

fn working_capital_to_assets(s: &FinancialStatement) -> f64 {
    percent(f::working_capital(s), f::total_assets(s))
}

fn debt_to_assets(s: &FinancialStatement) -> f64 {
    ratio(f::total_liabilities(s), f::total_assets(s))
}

fn debt_to_equity(s: &FinancialStatement) -> f64 {
    ratio(f::total_liabilities(s), f::equity(s))
}

fn equity_multiplier(s: &FinancialStatement) -> f64 {
    ratio(f::total_assets(s), f::equity(s))
}

fn interest_coverage(s: &FinancialStatement) -> f64 {
    ratio(f::operating_income(s), f::interest_expense(s))
}

fn lt_debt_to_cap(s: &FinancialStatement) -> f64 {
    let ltd = f::long_term_debt(s);
    ratio(ltd, ltd + f::equity(s))
}

fn gross_margin(s: &FinancialStatement) -> f64 {
    percent(f::gross_profit(s), f::revenue(s))
}

fn operating_margin(s: &FinancialStatement) -> f64 {
    percent(f::operating_income(s), f::revenue(s))
}

fn net_margin(s: &FinancialStatement) -> f64 {
    percent(f::net_income(s), f::revenue(s))
}

fn ebitda_margin(s: &FinancialStatement) -> f64 {
    percent(f::ebitda(s), f::revenue(s))
}

fn roa(s: &FinancialStatement) -> f64 {
    percent(f::net_income(s), f::total_assets(s))
}

fn roe(s: &FinancialStatement) -> f64 {
    percent(f::net_income(s), f::equity(s))
}

fn roce(s: &FinancialStatement) -> f64 {
    percent(f::operating_income(s), f::capital_employed(s))
}

fn inventory_turnover(s: &FinancialStatement) -> f64 {
    ratio(f::cost_of_revenue(s), f::inventory(s))
}

fn receivables_turnover(s: &FinancialStatement) -> f64 {
    ratio(f::revenue(s), f::receivables(s))
}

fn payables_turnover(s: &FinancialStatement) -> f64 {
    ratio(f::cost_of_revenue(s), f::payables(s))
}

fn asset_turnover(s: &FinancialStatement) -> f64 {
    ratio(f::revenue(s), f::total_assets(s))
}

fn fixed_asset_turnover(s: &FinancialStatement) -> f64 {
    ratio(f::revenue(s), f::fixed_assets(s))
}

fn dso(s: &FinancialStatement) -> f64 {
    ratio(f::receivables(s), f::revenue(s)) * DAYS
}

fn dio(s: &FinancialStatement) -> f64 {
    ratio(f::inventory(s), f::cost_of_revenue(s)) * DAYS
}

fn dpo(s: &FinancialStatement) -> f64 {
    ratio(f::payables(s), f::cost_of_revenue(s)) * DAYS
}

fn eps(s: &FinancialStatement) -> f64 {
    ratio(f::net_income(s), f::shares_outstanding(s))
}

fn payout_ratio(s: &FinancialStatement) -> f64 {
    percent(f::dividends_paid(s), f::net_income(s))
}

static CURRENT: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "currentRatio",
        tiers: &[tier(Between(1.5, 3.0), 4), tier(Above(3.0), 3), tier(AtLeast(1.0), 2), tier(AtLeast(0.8), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "currentRatio",
            when: Below(1.0),
            emits: &[
                Risk("Current ratio of {value} signals short-term liquidity pressure"),
                Recommend("Improve working capital management and arrange a short-term credit facility"),
                Weakness("Current liabilities exceed current assets"),
            ],
        },
        NarrativeRule {
            metric: "currentRatio",
            when: Above(3.0),
            emits: &[Recommend("Put excess current assets to work in return-generating investment")],
        },
        NarrativeRule {
            metric: "currentRatio",
            when: Between(1.5, 3.0),
            emits: &[Strength("Comfortable current ratio of {value}")],
        },
    ],
    opportunities: &[
        "Improve short-term liquidity management",
        "Convert current assets to cash faster",
    ],
    threats: &[
        "Short-term obligations falling due",
        "Tighter credit conditions",
    ],
};

static QUICK: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "quickRatio",
        tiers: &[tier(AtLeast(1.0), 3), tier(AtLeast(0.7), 2), tier(AtLeast(0.5), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "quickRatio",
            when: Below(0.7),
            emits: &[
                Risk("Liquidity depends on selling inventory (quick ratio {value})"),
                Recommend("Improve inventory management to free liquid resources"),
            ],
        },
        NarrativeRule {
            metric: "quickRatio",
            when: AtLeast(1.0),
            emits: &[Strength("Liquid assets cover current liabilities without inventory")],
        },
    ],
    opportunities: &[
        "Reduce reliance on inventory for liquidity",
        "Build up liquid assets",
    ],
    threats: &[
        "Slow-moving inventory",
        "Sudden cash needs",
    ],
};

static CASH: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "cashRatio",
        tiers: &[tier(AtLeast(0.5), 3), tier(AtLeast(0.2), 2), tier(AtLeast(0.1), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "cashRatio",
        when: Below(0.2),
        emits: &[
            Risk("Cash covers only a small part of short-term obligations"),
            Recommend("Build a cash reserve as part of the treasury strategy"),
        ],
    }],
    opportunities: &[
        "Invest surplus cash",
        "Use cash to reduce debt",
    ],
    threats: &["Unexpected payment demands could force costly borrowing"],
};

static OCF_RATIO: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "operatingCashFlowRatio",
        tiers: &[tier(AtLeast(1.0), 3), tier(AtLeast(0.5), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "operatingCashFlowRatio",
        when: Below(0.5),
        emits: &[
            Risk("Operating cash flow covers less than half of current liabilities"),
            Recommend("Improve cash collection to strengthen credit standing"),
        ],
    }],
    opportunities: &[
        "Improve cash conversion from operations",
        "Use operating cash to fund growth",
    ],
    threats: &[
        "Falling operating cash flow",
        "Delayed customer payments",
    ],
};

static WORKING_CAPITAL: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "workingCapitalToAssets",
        tiers: &[tier(AtLeast(20.0), 3), tier(AtLeast(10.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "workingCapitalToAssets",
        when: AtMost(0.0),
        emits: &[
            Risk("Negative working capital"),
            Recommend("Restructure short-term loans into long-term financing"),
            Weakness("Working capital deficit"),
        ],
    }],
    opportunities: &[
        "Improve working capital management",
        "Negotiate better payment terms",
    ],
    threats: &[
        "Working capital squeeze",
        "Rising short-term obligations",
    ],
};

static DEBT_TO_ASSETS: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "debtToAssets",
        tiers: &[tier(AtMost(0.4), 3), tier(AtMost(0.6), 2), tier(AtMost(0.8), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "debtToAssets",
            when: Above(0.6),
            emits: &[
                Risk("Liabilities fund a high share of assets ({value})"),
                Recommend("Reduce debt levels before seeking new loan facilities"),
            ],
        },
        NarrativeRule {
            metric: "debtToAssets",
            when: AtMost(0.4),
            emits: &[Strength("Low reliance on borrowed funds")],
        },
    ],
    opportunities: &[
        "Reduce leverage",
        "Finance assets with more equity",
    ],
    threats: &[
        "Rising interest rates",
        "Falling asset values",
    ],
};

static DEBT_TO_EQUITY: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "debtToEquity",
        tiers: &[tier(AtMost(0.5), 4), tier(AtMost(1.0), 3), tier(AtMost(2.0), 2), tier(AtMost(3.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "debtToEquity",
            when: Above(2.0),
            emits: &[
                Risk("High leverage: debt to equity of {value}"),
                Recommend("Develop a deleveraging strategy with lenders"),
                Weakness("Highly leveraged balance sheet"),
            ],
        },
        NarrativeRule {
            metric: "debtToEquity",
            when: AtMost(0.5),
            emits: &[Opportunity("Capacity to take on financing for expansion")],
        },
    ],
    opportunities: &[
        "Rebalance the capital structure",
        "Use spare debt capacity for growth",
    ],
    threats: &["Rising interest rates raise the cost of servicing debt"],
};

static EQUITY_MULTIPLIER: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "equityMultiplier",
        tiers: &[tier(Between(1.0, 2.0), 3), tier(AtMost(3.0), 2), tier(AtMost(4.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "equityMultiplier",
        when: Above(3.0),
        emits: &[Risk("Returns are amplified by leverage (multiplier {value})")],
    }],
    opportunities: &[
        "Optimise financial leverage",
        "Strengthen the equity base",
    ],
    threats: &[
        "Leverage amplifying losses",
        "Tighter lending standards",
    ],
};

static INTEREST_COVERAGE: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "interestCoverage",
        tiers: &[tier(AtLeast(8.0), 4), tier(AtLeast(4.0), 3), tier(AtLeast(2.0), 2), tier(AtLeast(1.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "interestCoverage",
            when: Below(2.0),
            emits: &[
                Risk("Operating income barely covers interest ({value}x)"),
                Recommend("Renegotiate loan terms or refinance to reduce interest cost"),
            ],
        },
        NarrativeRule {
            metric: "interestCoverage",
            when: AtLeast(8.0),
            emits: &[Strength("Interest is covered {value} times by operating income")],
        },
    ],
    opportunities: &[
        "Refinance at lower rates",
        "Reduce interest-bearing debt",
    ],
    threats: &[
        "Rising interest rates",
        "Falling operating profit",
    ],
};

static LT_DEBT_CAP: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "longTermDebtToCapitalization",
        tiers: &[tier(AtMost(0.3), 3), tier(AtMost(0.5), 2), tier(AtMost(0.7), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "longTermDebtToCapitalization",
        when: Above(0.5),
        emits: &[Risk("Long-term debt dominates permanent capital")],
    }],
    opportunities: &[
        "Lengthen debt maturities",
        "Lower the cost of long-term debt",
    ],
    threats: &[
        "Refinancing risk",
        "Rising long-term rates",
    ],
};

static GROSS_MARGIN: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "grossMargin",
        tiers: &[tier(AtLeast(50.0), 4), tier(AtLeast(35.0), 3), tier(AtLeast(20.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "grossMargin",
            when: Below(20.0),
            emits: &[
                Recommend("Review the pricing strategy and supplier contracts"),
                Weakness("Low gross margin of {value}%"),
            ],
        },
        NarrativeRule {
            metric: "grossMargin",
            when: AtLeast(35.0),
            emits: &[Strength("Strong gross margin of {value}%")],
        },
    ],
    opportunities: &[
        "Improve pricing",
        "Reduce cost of revenue",
    ],
    threats: &[
        "Rising input costs",
        "Price competition",
    ],
};

static OPERATING_MARGIN: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "operatingMargin",
        tiers: &[tier(AtLeast(20.0), 4), tier(AtLeast(10.0), 3), tier(AtLeast(5.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "operatingMargin",
        when: Below(5.0),
        emits: &[
            Recommend("Improve operating efficiency through cost management"),
            Risk("Thin operating margin of {value}%"),
        ],
    }],
    opportunities: &[
        "Improve operating efficiency",
        "Control operating expenses",
    ],
    threats: &[
        "Rising operating costs",
        "Stronger competition",
    ],
};

static NET_MARGIN: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "netMargin",
        tiers: &[tier(AtLeast(15.0), 4), tier(AtLeast(10.0), 3), tier(AtLeast(5.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "netMargin",
            when: AtMost(0.0),
            emits: &[
                Risk("The company is loss-making"),
                Recommend("Develop a profitability improvement strategy"),
                Weakness("Negative net margin"),
            ],
        },
        NarrativeRule {
            metric: "netMargin",
            when: AtLeast(10.0),
            emits: &[Strength("Net margin of {value}%")],
        },
    ],
    opportunities: &[
        "Improve profit margins",
        "Reduce financing and tax costs",
    ],
    threats: &[
        "Rising costs",
        "Falling prices",
    ],
};

static EBITDA_MARGIN: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "ebitdaMargin",
        tiers: &[tier(AtLeast(25.0), 3), tier(AtLeast(15.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "ebitdaMargin",
        when: Below(10.0),
        emits: &[Weakness("Low cash earnings margin")],
    }],
    opportunities: &[
        "Grow operating cash earnings",
        "Improve cost structure",
    ],
    threats: &[
        "Rising operating costs",
        "Margin pressure",
    ],
};

static ROA: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "returnOnAssets",
        tiers: &[tier(AtLeast(10.0), 4), tier(AtLeast(5.0), 3), tier(AtLeast(2.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "returnOnAssets",
            when: Below(2.0),
            emits: &[Recommend("Improve asset utilisation to lift return on assets")],
        },
        NarrativeRule {
            metric: "returnOnAssets",
            when: AtLeast(10.0),
            emits: &[Strength("Assets earn {value}% a period")],
        },
    ],
    opportunities: &[
        "Raise asset efficiency",
        "Dispose of underused assets",
    ],
    threats: &[
        "Falling asset returns",
        "Idle capacity",
    ],
};

static ROE: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "returnOnEquity",
        tiers: &[tier(AtLeast(20.0), 4), tier(AtLeast(15.0), 3), tier(AtLeast(8.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "returnOnEquity",
            when: Below(8.0),
            emits: &[
                Recommend("Shareholders earn a low return; revisit capital allocation strategy"),
                Weakness("Return on equity of {value}%"),
            ],
        },
        NarrativeRule {
            metric: "returnOnEquity",
            when: AtLeast(15.0),
            emits: &[Strength("Attractive return on equity of {value}%")],
        },
    ],
    opportunities: &[
        "Improve return on equity",
        "Optimise the use of shareholders' funds",
    ],
    threats: &[
        "Falling profitability",
        "Equity dilution",
    ],
};

static ROCE: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "returnOnCapitalEmployed",
        tiers: &[tier(AtLeast(15.0), 3), tier(AtLeast(10.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "returnOnCapitalEmployed",
        when: Below(10.0),
        emits: &[Recommend("Review low-return investment projects")],
    }],
    opportunities: &[
        "Allocate capital to higher-return uses",
        "Improve capital efficiency",
    ],
    threats: &[
        "Returns falling below the cost of capital",
        "Overinvestment",
    ],
};

static INVENTORY_TURNOVER: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "inventoryTurnover",
        tiers: &[tier(AtLeast(8.0), 3), tier(AtLeast(4.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "inventoryTurnover",
        when: Below(4.0),
        emits: &[
            Recommend("Improve inventory management to reduce slow-moving stock"),
            Risk("Slow inventory turnover risks obsolescence"),
        ],
    }],
    opportunities: &[
        "Improve inventory management",
        "Adopt just-in-time purchasing",
    ],
    threats: &[
        "Inventory obsolescence",
        "Falling demand",
    ],
};

static RECEIVABLES_TURNOVER: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "receivablesTurnover",
        tiers: &[tier(AtLeast(10.0), 3), tier(AtLeast(6.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "receivablesTurnover",
        when: Below(6.0),
        emits: &[Recommend("Tighten customer credit terms and collections management")],
    }],
    opportunities: &[
        "Improve collection processes",
        "Offer early-payment discounts",
    ],
    threats: &[
        "Customer payment delays",
        "Bad debts",
    ],
};

static PAYABLES_TURNOVER: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "payablesTurnover",
        tiers: &[tier(Between(4.0, 12.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "payablesTurnover",
        when: Above(12.0),
        emits: &[Opportunity("Negotiate longer supplier credit terms")],
    }],
    opportunities: &[
        "Negotiate longer supplier terms",
        "Use supplier early-payment discounts",
    ],
    threats: &[
        "Shorter supplier credit",
        "Strained supplier relationships",
    ],
};

static ASSET_TURNOVER: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "assetTurnover",
        tiers: &[tier(AtLeast(1.5), 3), tier(AtLeast(0.8), 2), tier(Above(0.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "assetTurnover",
            when: Below(0.8),
            emits: &[Recommend("Improve asset utilisation or divest idle assets")],
        },
        NarrativeRule {
            metric: "assetTurnover",
            when: AtLeast(1.5),
            emits: &[Strength("Efficient use of assets to generate sales")],
        },
    ],
    opportunities: &[
        "Raise asset efficiency",
        "Grow revenue on the existing asset base",
    ],
    threats: &[
        "Idle capacity",
        "Falling demand",
    ],
};

static FIXED_ASSET_TURNOVER: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "fixedAssetTurnover",
        tiers: &[tier(AtLeast(4.0), 3), tier(AtLeast(2.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "fixedAssetTurnover",
        when: Below(2.0),
        emits: &[Weakness("Productive capacity is under-used")],
    }],
    opportunities: &[
        "Improve capacity utilisation",
        "Sell or lease out idle fixed assets",
    ],
    threats: &[
        "Underused fixed assets",
        "Technological obsolescence",
    ],
};

static DSO: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "daysSalesOutstanding",
        tiers: &[tier(AtMost(30.0), 3), tier(AtMost(45.0), 2), tier(AtMost(60.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "daysSalesOutstanding",
        when: Above(60.0),
        emits: &[
            Risk("Customers take {value} days to pay"),
            Recommend("Improve receivables management and credit control"),
        ],
    }],
    opportunities: &[
        "Shorten the collection period",
        "Tighten credit terms",
    ],
    threats: &[
        "Customer payment delays",
        "Bad debts",
    ],
};

static DIO: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "daysInventoryOutstanding",
        tiers: &[tier(AtMost(45.0), 3), tier(AtMost(90.0), 2), tier(AtMost(120.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "daysInventoryOutstanding",
        when: Above(90.0),
        emits: &[Recommend("Improve inventory planning to shorten holding periods")],
    }],
    opportunities: &[
        "Reduce inventory holding periods",
        "Improve demand forecasting",
    ],
    threats: &[
        "Inventory obsolescence",
        "Storage costs",
    ],
};

static CCC: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "cashConversionCycle",
        tiers: &[tier(AtMost(30.0), 3), tier(AtMost(60.0), 2), tier(AtMost(90.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "cashConversionCycle",
            when: Above(90.0),
            emits: &[
                Risk("Cash is tied up for {value} days in the operating cycle"),
                Recommend("Improve working capital management across receivables, inventory and payables"),
            ],
        },
        NarrativeRule {
            metric: "cashConversionCycle",
            when: AtMost(30.0),
            emits: &[Strength("Short cash conversion cycle")],
        },
    ],
    opportunities: &[
        "Shorten the cash conversion cycle",
        "Align payment and collection terms",
    ],
    threats: &[
        "Longer collection periods",
        "Working capital squeeze",
    ],
};

fn cash_conversion_cycle() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "cash-conversion-cycle",
            "Cash conversion cycle",
            "Days between paying suppliers and collecting from customers",
            CAT,
            1,
        ),
        BS_IS,
        &CCC,
        |ctx| {
            let s = latest(ctx)?;
            let (dso, dio, dpo) = (dso(s), dio(s), dpo(s));
            Ok(Computed::new()
                .metric("daysSalesOutstanding", dso)
                .metric("daysInventoryOutstanding", dio)
                .metric("daysPayablesOutstanding", dpo)
                .metric("cashConversionCycle", dso + dio - dpo)
                .chart(crate::common::bars(
                    "Operating cycle components (days)",
                    &[("Receivables", dso), ("Inventory", dio), ("Payables", -dpo)],
                )))
        },
    )
    .boxed()
}

static EPS: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "earningsPerShare",
            tiers: &[tier(Above(0.0), 2)],
        },
        ScoreCheck {
            metric: "change",
            tiers: &[tier(Above(0.0), 2), tier(AbsBelow(0.0001), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "earningsPerShare",
            when: AtMost(0.0),
            emits: &[Risk("Negative earnings per share"), Weakness("Shareholders bear losses")],
        },
        NarrativeRule {
            metric: "change",
            when: Above(0.0),
            emits: &[Predict("Earnings per share is trending up")],
        },
    ],
    opportunities: &[
        "Grow earnings per share",
        "Buy back undervalued shares",
    ],
    threats: &[
        "Earnings dilution",
        "Falling profits",
    ],
};

static PE: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "priceToEarnings",
        tiers: &[tier(Between(8.0, 20.0), 3), tier(Between(0.0001, 30.0), 2), tier(Above(30.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "priceToEarnings",
            when: Above(30.0),
            emits: &[
                Risk("Valuation is demanding at {value}x earnings"),
                Recommend("Investors should weigh the return potential against a rich valuation"),
            ],
        },
        NarrativeRule {
            metric: "priceToEarnings",
            when: Between(0.0001, 8.0),
            emits: &[Opportunity("Low earnings multiple may signal undervaluation")],
        },
    ],
    opportunities: &[
        "Attract investors with improving earnings",
        "Re-rating potential",
    ],
    threats: &[
        "Market sentiment shifts",
        "Earnings disappointments",
    ],
};

fn price_to_earnings() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "price-to-earnings",
            "Price to earnings",
            "Market price over earnings per share",
            CAT,
            1,
        ),
        BS_IS,
        &PE,
        |ctx| {
            let p = price(ctx)?;
            let e = positive(eps(latest(ctx)?), "earnings per share")?;
            Ok(Computed::new()
                .metric("price", p)
                .metric("earningsPerShare", e)
                .metric("priceToEarnings", p / e)
                .metric("earningsYield", percent(e, p)))
        },
    )
    .boxed()
}

static PB: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "priceToBook",
        tiers: &[tier(Between(0.0001, 1.5), 3), tier(AtMost(3.0), 2), tier(AtMost(5.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "priceToBook",
            when: Below(1.0),
            emits: &[Opportunity("Shares trade below book value")],
        },
        NarrativeRule {
            metric: "priceToBook",
            when: Above(5.0),
            emits: &[Risk("Market price is {value} times book value")],
        },
    ],
    opportunities: &[
        "Unlock value in the asset base",
        "Improve returns on book equity",
    ],
    threats: &[
        "Asset write-downs",
        "Market re-pricing of book value",
    ],
};

fn price_to_book() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new("price-to-book", "Price to book", "Market price over book value per share", CAT, 1),
        BS,
        &PB,
        |ctx| {
            let p = price(ctx)?;
            let s = latest(ctx)?;
            let bvps = positive(ratio(f::equity(s), f::shares_outstanding(s)), "book value per share")?;
            Ok(Computed::new()
                .metric("price", p)
                .metric("bookValuePerShare", bvps)
                .metric("priceToBook", p / bvps))
        },
    )
    .boxed()
}

static DIVIDEND_YIELD: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "dividendYield",
        tiers: &[tier(Between(2.0, 6.0), 3), tier(Above(6.0), 2), tier(Above(0.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "dividendYield",
            when: Above(6.0),
            emits: &[Risk("Unusually high dividend yield may not be sustainable")],
        },
        NarrativeRule {
            metric: "dividendYield",
            when: Between(2.0, 6.0),
            emits: &[Strength("Steady cash return to investors")],
        },
    ],
    opportunities: &[
        "Attract income-focused investors",
        "Maintain a stable dividend policy",
    ],
    threats: &[
        "Dividend cuts",
        "Rising market yields",
    ],
};

fn dividend_yield() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new("dividend-yield", "Dividend yield", "Dividends per share over market price", CAT, 1),
        BS_CF,
        &DIVIDEND_YIELD,
        |ctx| {
            let p = price(ctx)?;
            let s = latest(ctx)?;
            let dps = ratio(f::dividends_paid(s), f::shares_outstanding(s));
            Ok(Computed::new()
                .metric("price", p)
                .metric("dividendPerShare", dps)
                .metric("dividendYield", percent(dps, p)))
        },
    )
    .boxed()
}

static PAYOUT: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "payoutRatio",
        tiers: &[tier(Between(20.0, 60.0), 3), tier(Between(0.0, 80.0), 2), tier(AtMost(100.0), 1)],
    }],
    rules: &[NarrativeRule {
        metric: "payoutRatio",
        when: Above(80.0),
        emits: &[
            Risk("Dividends absorb {value}% of earnings"),
            Recommend("Align the dividend policy with the investment strategy"),
        ],
    }],
    opportunities: &[
        "Balance distributions with reinvestment",
        "Build a sustainable dividend policy",
    ],
    threats: &[
        "Payouts exceeding earnings",
        "Cash needed for growth",
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{company_statements, market};
    use analysis_core::{BenchmarkData, PeerGroup, Rating};
    use approx::assert_relative_eq;

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn current_ratio_with_history_and_industry() {
        let mut group = PeerGroup::default();
        group.averages.insert("currentRatio".into(), 1.2);
        let mut bench = BenchmarkData::default();
        bench.groups.insert("industry".into(), group);
        let ctx = AnalysisContext::new(company_statements()).with_benchmark(Some(bench));

        let r = single("current-ratio", "Current ratio", "", BS, "currentRatio", &CURRENT, current_ratio).run(&ctx);
        assert_relative_eq!(r.results["currentRatio"].as_f64().unwrap(), 1.5);
        assert_relative_eq!(r.results["differenceFromIndustry"].as_f64().unwrap(), 0.3, epsilon = 1e-9);
        assert_eq!(r.final_evaluation.rating, Rating::Excellent);
        assert_eq!(r.charts[0].data.len(), 3);
    }

    #[test]
    fn market_ratios_need_a_price() {
        let ctx = AnalysisContext::new(company_statements());
        let r = price_to_earnings().run(&ctx);
        assert!(r.is_degraded());
        assert!(r.final_evaluation.interpretation.contains("market price"));

        let ctx = ctx.with_market(Some(market()));
        let r = price_to_earnings().run(&ctx);
        assert!(!r.is_degraded());
        // price 18, EPS 120 / 100 = 1.2
        assert_relative_eq!(r.results["priceToEarnings"].as_f64().unwrap(), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn cash_conversion_cycle_components() {
        let ctx = AnalysisContext::new(company_statements());
        let r = cash_conversion_cycle().run(&ctx);
        let dso = r.results["daysSalesOutstanding"].as_f64().unwrap();
        let dio = r.results["daysInventoryOutstanding"].as_f64().unwrap();
        let dpo = r.results["daysPayablesOutstanding"].as_f64().unwrap();
        assert_relative_eq!(r.results["cashConversionCycle"].as_f64().unwrap(), dso + dio - dpo);
    }

    #[test]
    fn zero_denominator_yields_zero_ratio() {
        let s = FinancialStatement::default().with_value(Section::BalanceSheet, "currentAssets", 10.0);
        assert_eq!(current_ratio(&s), 0.0);
    }
}
