//! Flow analyses: period-over-period movement of the main aggregates and of
//! the components they are built from.

use analysis_core::metrics::{cagr, growth_percent};
use analysis_core::{AnalysisModule, Category, ModuleInfo, Section};

use crate::common::{bars, pair, trend, Item};
use crate::fields as f;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Flow;
const BS: &[Section] = &[Section::BalanceSheet];
const IS: &[Section] = &[Section::IncomeStatement];
const CF: &[Section] = &[Section::CashFlowStatement];
const BS_CF: &[Section] = &[Section::BalanceSheet, Section::CashFlowStatement];

/// Component line items scored next to the aggregate, keyed by metric name.
type Parts = &'static [(&'static str, Item)];

const ASSET_PARTS: Parts = &[
    ("currentAssetsRate", f::current_assets),
    ("nonCurrentAssetsRate", f::non_current_assets),
];
const LIABILITY_PARTS: Parts = &[
    ("currentLiabilitiesRate", f::current_liabilities),
    ("nonCurrentLiabilitiesRate", f::non_current_liabilities),
];
const EQUITY_PARTS: Parts = &[
    ("retainedEarningsRate", f::retained_earnings),
    ("paidInCapitalRate", f::paid_in_capital),
];
const REVENUE_PARTS: Parts = &[
    ("grossProfitRate", f::gross_profit),
    ("operatingIncomeRate", f::operating_income),
];
const EXPENSE_PARTS: Parts = &[
    ("costOfRevenueRate", f::cost_of_revenue),
    ("operatingExpensesRate", f::operating_expenses),
];
const INVESTMENT_PARTS: Parts = &[
    ("fixedAssetsRate", f::fixed_assets),
    ("investmentsRate", f::investments),
];
const FINANCING_PARTS: Parts = &[
    ("shortTermDebtRate", f::short_term_debt),
    ("longTermDebtRate", f::long_term_debt),
];

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        movement("asset-flow", "Asset flow", "Change in total assets and their current and non-current parts", BS, &ASSETS, f::total_assets, ASSET_PARTS),
        movement("liability-flow", "Liability flow", "Change in total liabilities and their maturity split", BS, &LIABILITIES, f::total_liabilities, LIABILITY_PARTS),
        movement("equity-flow", "Equity flow", "Change in shareholders' equity, retained earnings and contributed capital", BS, &EQUITY, f::equity, EQUITY_PARTS),
        movement("revenue-flow", "Revenue flow", "Change in revenue and the profit it carries down", IS, &REVENUE, f::revenue, REVENUE_PARTS),
        movement("expense-flow", "Expense flow", "Change in total expenses, cost of revenue and operating expenses", IS, &EXPENSES, f::total_expenses, EXPENSE_PARTS),
        movement("net-cash-flow", "Net cash flow", "Change in net cash generated between periods", CF, &NET_CASH, f::net_cash_flow, &[]),
        movement("working-capital-flow", "Working capital flow", "Change in net working capital between periods", BS, &WORKING_CAPITAL, f::working_capital, &[]),
        movement("investment-flow", "Investment flow", "Change in capital expenditure and the asset base it builds", BS_CF, &INVESTMENT, f::capital_expenditures, INVESTMENT_PARTS),
        movement("financing-flow", "Financing flow", "Change in total debt and its short and long-term parts", BS, &FINANCING, f::total_debt, FINANCING_PARTS),
        movement("profitability-flow", "Profitability flow", "Change in net income between periods", IS, &PROFIT, f::net_income, &[]),
    ]
}

/// Latest vs previous value of one aggregate, plus compound growth over the
/// whole series. Each component gets its own change rate; a component that
/// is zero in both periods is treated as unreported and left unscored.
fn movement(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    sections: &'static [Section],
    rules: &'static RuleSet,
    item: Item,
    parts: Parts,
) -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(id, name, description, CAT, 2),
        sections,
        rules,
        move |ctx| {
            let (cur, prev) = pair(ctx)?;
            let (c, p) = (item(cur), item(prev));
            let first = ctx.statements.first().map(item).unwrap_or(p);
            let mut out = Computed::new()
                .metric("current", c)
                .metric("previous", p)
                .metric("change", c - p)
                .metric("changePercent", growth_percent(p, c))
                .metric("compoundGrowth", cagr(first, c, ctx.statements.len() - 1) * 100.0)
                .chart(trend(name, &ctx.statements, item));

            let mut rates = Vec::with_capacity(parts.len());
            for &(key, part) in parts {
                let (pc, pp) = (part(cur), part(prev));
                if pc == 0.0 && pp == 0.0 {
                    continue;
                }
                let rate = growth_percent(pp, pc);
                out.set(key, rate);
                rates.push((key, rate));
            }
            if !rates.is_empty() {
                out = out.chart(bars("Component change (%)", &rates));
            }
            Ok(out)
        },
    )
    .boxed()
}

static ASSETS: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(Above(0.0), 2), tier(AtLeast(-5.0), 1)],
        },
        ScoreCheck {
            metric: "currentAssetsRate",
            tiers: &[tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "nonCurrentAssetsRate",
            tiers: &[tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Below(0.0),
            emits: &[Risk("The asset base shrank by {abs}%"), Weakness("Contracting asset base")],
        },
        NarrativeRule {
            metric: "changePercent",
            when: Above(25.0),
            emits: &[Recommend("Verify that rapid asset growth is matched by a clear investment strategy")],
        },
        NarrativeRule {
            metric: "changePercent",
            when: Between(5.0, 25.0),
            emits: &[Strength("Steady asset growth of {value}%")],
        },
        NarrativeRule {
            metric: "currentAssetsRate",
            when: Below(-10.0),
            emits: &[Risk("Current assets fell by {abs}%, reducing short-term liquidity")],
        },
        NarrativeRule {
            metric: "nonCurrentAssetsRate",
            when: Below(0.0),
            emits: &[Recommend("Improve asset management and review the replacement of long-lived assets")],
        },
    ],
    opportunities: &[
        "Improve asset management",
        "Increase investment in productive assets",
        "Raise asset efficiency",
    ],
    threats: &[
        "Changes in asset values",
        "Changes in asset structure",
        "Weak control over asset management",
    ],
};

static LIABILITIES: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(AtMost(5.0), 2), tier(AtMost(15.0), 1)],
        },
        ScoreCheck {
            metric: "currentLiabilitiesRate",
            tiers: &[tier(AtMost(10.0), 1)],
        },
        ScoreCheck {
            metric: "nonCurrentLiabilitiesRate",
            tiers: &[tier(AtMost(10.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Above(25.0),
            emits: &[
                Risk("Liabilities grew by {value}%"),
                Recommend("Control new borrowing and review credit exposure"),
            ],
        },
        NarrativeRule {
            metric: "changePercent",
            when: Below(0.0),
            emits: &[Strength("Obligations are being paid down")],
        },
        NarrativeRule {
            metric: "currentLiabilitiesRate",
            when: Above(20.0),
            emits: &[Risk("Short-term obligations rose by {value}%")],
        },
    ],
    opportunities: &[
        "Improve liability management",
        "Refinance at lower cost",
        "Restructure obligations toward longer maturities",
    ],
    threats: &[
        "Rising interest rates",
        "Tighter credit conditions",
        "Difficulty meeting obligations as they fall due",
    ],
};

static EQUITY: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(Above(0.0), 2), tier(AtLeast(-5.0), 1)],
        },
        ScoreCheck {
            metric: "retainedEarningsRate",
            tiers: &[tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "paidInCapitalRate",
            tiers: &[tier(AtLeast(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Below(0.0),
            emits: &[
                Risk("Shareholders' equity declined by {abs}%"),
                Recommend("Review the dividend and capital management strategy"),
            ],
        },
        NarrativeRule {
            metric: "changePercent",
            when: AtLeast(10.0),
            emits: &[Strength("Equity compounding at {value}%")],
        },
        NarrativeRule {
            metric: "retainedEarningsRate",
            when: Below(0.0),
            emits: &[Weakness("Retained earnings are being drawn down")],
        },
        NarrativeRule {
            metric: "paidInCapitalRate",
            when: Below(0.0),
            emits: &[Note("Contributed capital decreased, possibly through buybacks")],
        },
    ],
    opportunities: &[
        "Increase equity through retained profits",
        "Raise new capital on favourable terms",
        "Improve return on equity",
    ],
    threats: &[
        "Dilution from new share issues",
        "Losses eroding equity",
        "Excessive dividend distributions",
    ],
};

static REVENUE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(Above(10.0), 3), tier(Above(5.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "grossProfitRate",
            tiers: &[tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "operatingIncomeRate",
            tiers: &[tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Below(0.0),
            emits: &[Risk("Revenue fell by {abs}%"), Weakness("Shrinking sales")],
        },
        NarrativeRule {
            metric: "changePercent",
            when: Above(10.0),
            emits: &[Strength("Revenue up {value}%"), Predict("Revenue momentum is likely to continue next period")],
        },
        NarrativeRule {
            metric: "grossProfitRate",
            when: Below(0.0),
            emits: &[Recommend("Review pricing and cost of revenue to protect gross profit")],
        },
    ],
    opportunities: &[
        "Develop new revenue sources",
        "Expand into new markets",
        "Improve pricing",
    ],
    threats: &[
        "Stronger competition",
        "Falling demand",
        "Price pressure",
    ],
};

static EXPENSES: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(AtMost(0.0), 3), tier(AtMost(5.0), 2), tier(AtMost(15.0), 1)],
        },
        ScoreCheck {
            metric: "costOfRevenueRate",
            tiers: &[tier(AtMost(10.0), 1)],
        },
        ScoreCheck {
            metric: "operatingExpensesRate",
            tiers: &[tier(AtMost(10.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Above(15.0),
            emits: &[
                Risk("Expenses rose by {value}%"),
                Recommend("Improve cost management to contain expense growth"),
            ],
        },
        NarrativeRule {
            metric: "operatingExpensesRate",
            when: Above(20.0),
            emits: &[Weakness("Operating expenses growing by {value}%")],
        },
    ],
    opportunities: &[
        "Reduce operating costs",
        "Improve operating efficiency",
        "Automate routine processes",
    ],
    threats: &[
        "Rising input costs",
        "Inflation",
        "Rising wage costs",
    ],
};

static NET_CASH: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "current",
            tiers: &[tier(Above(0.0), 2)],
        },
        ScoreCheck {
            metric: "change",
            tiers: &[tier(Above(0.0), 2), tier(AbsBelow(0.0001), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "current",
            when: Below(0.0),
            emits: &[
                Risk("The company burned cash this period"),
                Recommend("Prepare a cash management plan and secure backup financing"),
            ],
        },
        NarrativeRule {
            metric: "change",
            when: Above(0.0),
            emits: &[Strength("Improving net cash generation")],
        },
    ],
    opportunities: &[
        "Invest surplus cash",
        "Improve cash management",
        "Reduce debt with excess cash",
    ],
    threats: &[
        "Cash shortfalls",
        "Rising cash costs",
        "Falling cash generation",
    ],
};

static WORKING_CAPITAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "current",
            tiers: &[tier(Above(0.0), 2)],
        },
        ScoreCheck {
            metric: "change",
            tiers: &[tier(AtLeast(0.0), 2)],
        },
    ],
    rules: &[NarrativeRule {
        metric: "change",
        when: Below(0.0),
        emits: &[
            Risk("Working capital is eroding"),
            Recommend("Improve working capital management"),
        ],
    }],
    opportunities: &[
        "Improve inventory management",
        "Speed up receivable collection",
        "Negotiate better supplier terms",
    ],
    threats: &[
        "Customer payment delays",
        "Inventory build-up",
        "Shorter supplier credit",
    ],
};

static INVESTMENT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(Between(0.0, 30.0), 2), tier(Above(30.0), 1)],
        },
        ScoreCheck {
            metric: "fixedAssetsRate",
            tiers: &[tier(AtLeast(0.0), 1)],
        },
        ScoreCheck {
            metric: "investmentsRate",
            tiers: &[tier(AtLeast(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Below(-20.0),
            emits: &[Threat("Sharp cut in investment may limit future capacity")],
        },
        NarrativeRule {
            metric: "changePercent",
            when: Above(30.0),
            emits: &[Recommend("Monitor the return on the expanded investment programme")],
        },
        NarrativeRule {
            metric: "fixedAssetsRate",
            when: Below(0.0),
            emits: &[Risk("The fixed asset base shrank by {abs}%")],
        },
    ],
    opportunities: &[
        "Invest in growth projects",
        "Upgrade production capacity",
        "Invest in new technology",
    ],
    threats: &[
        "Poor return on new investment",
        "Overinvestment",
        "Technological obsolescence",
    ],
};

static FINANCING: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(AtMost(0.0), 3), tier(AtMost(10.0), 2), tier(AtMost(30.0), 1)],
        },
        ScoreCheck {
            metric: "shortTermDebtRate",
            tiers: &[tier(AtMost(10.0), 1)],
        },
        ScoreCheck {
            metric: "longTermDebtRate",
            tiers: &[tier(AtMost(10.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Above(30.0),
            emits: &[
                Risk("Debt increased by {value}% in one period"),
                Recommend("Review the financing strategy and loan maturities"),
            ],
        },
        NarrativeRule {
            metric: "shortTermDebtRate",
            when: Above(25.0),
            emits: &[Risk("Short-term borrowing rose by {value}%, adding refinancing pressure")],
        },
    ],
    opportunities: &[
        "Secure cheaper financing",
        "Diversify funding sources",
        "Lengthen debt maturities",
    ],
    threats: &[
        "Rising financing costs",
        "Tighter lending standards",
        "Refinancing risk on maturing debt",
    ],
};

static PROFIT: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "current",
            tiers: &[tier(Above(0.0), 2)],
        },
        ScoreCheck {
            metric: "changePercent",
            tiers: &[tier(Above(10.0), 3), tier(Above(0.0), 2), tier(AbsBelow(0.0001), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "changePercent",
            when: Below(0.0),
            emits: &[
                Risk("Net income fell by {abs}%"),
                Recommend("Improve profitability through pricing and cost management"),
            ],
        },
        NarrativeRule {
            metric: "changePercent",
            when: Above(10.0),
            emits: &[Strength("Profit growth of {value}%")],
        },
    ],
    opportunities: &[
        "Improve profit margins",
        "Reduce costs",
        "Grow revenue",
    ],
    threats: &[
        "Rising costs",
        "Stronger competition",
        "Economic downturn",
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{company_statements, revenue_pair};
    use analysis_core::{AnalysisContext, FinancialStatement, Rating};
    use approx::assert_relative_eq;

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn revenue_movement() {
        let ctx = AnalysisContext::new(revenue_pair(100.0, 80.0));
        let r = movement("revenue-flow", "Revenue flow", "", IS, &REVENUE, f::revenue, REVENUE_PARTS).run(&ctx);
        assert_relative_eq!(r.results["changePercent"].as_f64().unwrap(), -20.0, epsilon = 1e-9);
        assert_eq!(r.final_evaluation.score, 0);
        assert!(r.risks[0].contains("20.0%"));
    }

    fn balance_sheet(total: f64, current: f64) -> FinancialStatement {
        FinancialStatement::default()
            .with_value(Section::BalanceSheet, "totalAssets", total)
            .with_value(Section::BalanceSheet, "currentAssets", current)
    }

    #[test]
    fn asset_flow_scores_components() {
        let asset_flow = movement("asset-flow", "Asset flow", "", BS, &ASSETS, f::total_assets, ASSET_PARTS);

        let growing = asset_flow.run(&AnalysisContext::new(company_statements()));
        assert_eq!(growing.final_evaluation.score, 4);
        assert_eq!(growing.final_evaluation.rating, Rating::Excellent);

        // total +10%, current assets down, non-current 700 -> 850
        let ctx = AnalysisContext::new(vec![balance_sheet(1000.0, 300.0), balance_sheet(1100.0, 250.0)]);
        let r = asset_flow.run(&ctx);
        assert_relative_eq!(r.results["currentAssetsRate"].as_f64().unwrap(), -16.666666, epsilon = 1e-5);
        assert_relative_eq!(r.results["nonCurrentAssetsRate"].as_f64().unwrap(), 21.428571, epsilon = 1e-5);
        assert_eq!(r.final_evaluation.score, 3);
        assert!(r.risks.iter().any(|x| x.contains("Current assets fell by 16.7%")));
        assert!(!r.swot.opportunities.is_empty());
        assert!(!r.swot.threats.is_empty());
    }

    #[test]
    fn unreported_component_is_not_scored() {
        let ctx = AnalysisContext::new(vec![
            FinancialStatement::default().with_value(Section::BalanceSheet, "longTermDebt", 200.0),
            FinancialStatement::default().with_value(Section::BalanceSheet, "longTermDebt", 190.0),
        ]);
        let r = movement("financing-flow", "Financing flow", "", BS, &FINANCING, f::total_debt, FINANCING_PARTS).run(&ctx);
        assert!(r.results.get("shortTermDebtRate").is_none());
        assert_relative_eq!(r.results["longTermDebtRate"].as_f64().unwrap(), -5.0, epsilon = 1e-9);
        assert_eq!(r.final_evaluation.score, 4);
    }

    #[test]
    fn single_period_degrades() {
        let mut statements = company_statements();
        statements.truncate(1);
        for m in modules() {
            let r = m.run(&AnalysisContext::new(statements.clone()));
            assert!(r.is_degraded());
            assert_eq!(r.final_evaluation.score, 0);
        }
    }
}
