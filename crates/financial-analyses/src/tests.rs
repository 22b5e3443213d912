//! Shared fixtures for the catalogue tests.

use analysis_core::{FinancialStatement, MarketData, MarketRiskLevel, Section};

const BALANCE_SHEET: &[(&str, f64)] = &[
    ("totalAssets", 1000.0),
    ("currentAssets", 300.0),
    ("cash", 80.0),
    ("marketableSecurities", 20.0),
    ("accountsReceivable", 90.0),
    ("inventory", 70.0),
    ("fixedAssets", 500.0),
    ("intangibleAssets", 50.0),
    ("longTermInvestments", 60.0),
    ("currentLiabilities", 200.0),
    ("accountsPayable", 60.0),
    ("shortTermDebt", 40.0),
    ("longTermDebt", 200.0),
    ("totalLiabilities", 500.0),
    ("shareholdersEquity", 500.0),
    ("retainedEarnings", 300.0),
    ("sharesOutstanding", 100.0),
];

const INCOME_STATEMENT: &[(&str, f64)] = &[
    ("totalRevenue", 1200.0),
    ("costOfGoodsSold", 720.0),
    ("grossProfit", 480.0),
    ("operatingExpenses", 300.0),
    ("operatingIncome", 180.0),
    ("interestExpense", 20.0),
    ("depreciation", 40.0),
    ("incomeBeforeTax", 160.0),
    ("taxExpense", 40.0),
    ("netIncome", 120.0),
    ("researchDevelopment", 50.0),
    ("marketingExpenses", 60.0),
    ("administrativeExpenses", 80.0),
];

const CASH_FLOW: &[(&str, f64)] = &[
    ("operatingCashFlow", 160.0),
    ("capitalExpenditures", -60.0),
    ("investingCashFlow", -70.0),
    ("financingCashFlow", -50.0),
    ("dividendsPaid", -30.0),
];

fn scaled(period: &str, factor: f64) -> FinancialStatement {
    let mut s = FinancialStatement::default().with_period(period);
    for (section, items) in [
        (Section::BalanceSheet, BALANCE_SHEET),
        (Section::IncomeStatement, INCOME_STATEMENT),
        (Section::CashFlowStatement, CASH_FLOW),
    ] {
        for (name, value) in items {
            s = s.with_value(section, name, value * factor);
        }
    }
    s
}

/// Three fiscal years, oldest first. Earlier years are the latest one scaled
/// by 0.8 and 0.9, so ratios are constant while levels grow.
pub fn company_statements() -> Vec<FinancialStatement> {
    vec![scaled("FY2021", 0.8), scaled("FY2022", 0.9), scaled("FY2023", 1.0)]
}

pub fn market() -> MarketData {
    MarketData {
        current_price: Some(18.0),
        market_returns: vec![0.08, 0.12],
        risk_free_rate: Some(0.04),
        expected_market_return: Some(0.09),
        risk_level: Some(MarketRiskLevel::Normal),
    }
}

/// Two income statements with the given revenues.
pub fn revenue_pair(previous: f64, current: f64) -> Vec<FinancialStatement> {
    [(previous, 10.0), (current, 15.0)]
        .into_iter()
        .map(|(revenue, profit)| {
            FinancialStatement::default()
                .with_value(Section::IncomeStatement, "totalRevenue", revenue)
                .with_value(Section::IncomeStatement, "netProfit", profit)
        })
        .collect()
}
