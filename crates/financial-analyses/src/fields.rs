//! Canonical line items. Reporting vocabularies differ between sources, so
//! each getter accepts the common aliases and derives the item from its
//! components when it is not reported directly.

use analysis_core::statements::{field, first_of};
use analysis_core::{FinancialStatement, Section};

const IS: Section = Section::IncomeStatement;
const BS: Section = Section::BalanceSheet;
const CF: Section = Section::CashFlowStatement;

fn reported(s: &FinancialStatement, section: Section, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| s.get(section, n))
}

pub fn series(statements: &[FinancialStatement], item: fn(&FinancialStatement) -> f64) -> Vec<f64> {
    statements.iter().map(item).collect()
}

// income statement

pub fn revenue(s: &FinancialStatement) -> f64 {
    first_of(s, IS, &["totalRevenue", "revenue"])
}

pub fn cost_of_revenue(s: &FinancialStatement) -> f64 {
    first_of(s, IS, &["costOfGoodsSold", "costOfRevenue"])
}

pub fn gross_profit(s: &FinancialStatement) -> f64 {
    reported(s, IS, &["grossProfit"]).unwrap_or_else(|| revenue(s) - cost_of_revenue(s))
}

pub fn operating_expenses(s: &FinancialStatement) -> f64 {
    field(s, IS, "operatingExpenses")
}

pub fn operating_income(s: &FinancialStatement) -> f64 {
    reported(s, IS, &["operatingIncome", "operatingProfit"])
        .unwrap_or_else(|| gross_profit(s) - operating_expenses(s))
}

pub fn net_income(s: &FinancialStatement) -> f64 {
    first_of(s, IS, &["netIncome", "netProfit"])
}

pub fn interest_expense(s: &FinancialStatement) -> f64 {
    field(s, IS, "interestExpense").abs()
}

pub fn depreciation(s: &FinancialStatement) -> f64 {
    field(s, IS, "depreciation") + field(s, IS, "amortization")
}

pub fn ebitda(s: &FinancialStatement) -> f64 {
    reported(s, IS, &["ebitda"]).unwrap_or_else(|| operating_income(s) + depreciation(s))
}

pub fn income_before_tax(s: &FinancialStatement) -> f64 {
    reported(s, IS, &["incomeBeforeTax"])
        .unwrap_or_else(|| operating_income(s) - interest_expense(s))
}

pub fn tax_expense(s: &FinancialStatement) -> f64 {
    field(s, IS, "taxExpense")
}

pub fn research_development(s: &FinancialStatement) -> f64 {
    first_of(s, IS, &["researchDevelopment", "technicalExpenses"])
}

pub fn marketing_expenses(s: &FinancialStatement) -> f64 {
    first_of(s, IS, &["marketingExpenses", "sellingExpenses"])
}

pub fn administrative_expenses(s: &FinancialStatement) -> f64 {
    first_of(s, IS, &["administrativeExpenses", "generalAdministrativeExpenses"])
}

pub fn total_expenses(s: &FinancialStatement) -> f64 {
    cost_of_revenue(s) + operating_expenses(s) + interest_expense(s) + tax_expense(s)
}

// balance sheet

pub fn total_assets(s: &FinancialStatement) -> f64 {
    field(s, BS, "totalAssets")
}

pub fn current_assets(s: &FinancialStatement) -> f64 {
    field(s, BS, "currentAssets")
}

pub fn non_current_assets(s: &FinancialStatement) -> f64 {
    reported(s, BS, &["nonCurrentAssets"]).unwrap_or_else(|| total_assets(s) - current_assets(s))
}

pub fn fixed_assets(s: &FinancialStatement) -> f64 {
    first_of(s, BS, &["fixedAssets", "propertyPlantEquipment"])
}

pub fn intangible_assets(s: &FinancialStatement) -> f64 {
    field(s, BS, "intangibleAssets") + field(s, BS, "goodwill")
}

pub fn cash(s: &FinancialStatement) -> f64 {
    first_of(s, BS, &["cash", "cashAndEquivalents"])
}

pub fn marketable_securities(s: &FinancialStatement) -> f64 {
    field(s, BS, "marketableSecurities")
}

pub fn receivables(s: &FinancialStatement) -> f64 {
    field(s, BS, "accountsReceivable")
}

pub fn inventory(s: &FinancialStatement) -> f64 {
    field(s, BS, "inventory")
}

pub fn investments(s: &FinancialStatement) -> f64 {
    first_of(s, BS, &["longTermInvestments", "investments"])
}

pub fn current_liabilities(s: &FinancialStatement) -> f64 {
    field(s, BS, "currentLiabilities")
}

pub fn non_current_liabilities(s: &FinancialStatement) -> f64 {
    reported(s, BS, &["nonCurrentLiabilities"])
        .unwrap_or_else(|| (total_liabilities(s) - current_liabilities(s)).max(0.0))
}

pub fn total_liabilities(s: &FinancialStatement) -> f64 {
    reported(s, BS, &["totalLiabilities"]).unwrap_or_else(|| {
        current_liabilities(s) + field(s, BS, "nonCurrentLiabilities")
    })
}

pub fn payables(s: &FinancialStatement) -> f64 {
    field(s, BS, "accountsPayable")
}

pub fn long_term_debt(s: &FinancialStatement) -> f64 {
    field(s, BS, "longTermDebt")
}

pub fn short_term_debt(s: &FinancialStatement) -> f64 {
    field(s, BS, "shortTermDebt")
}

pub fn total_debt(s: &FinancialStatement) -> f64 {
    reported(s, BS, &["totalDebt"])
        .unwrap_or_else(|| long_term_debt(s) + short_term_debt(s))
}

pub fn equity(s: &FinancialStatement) -> f64 {
    reported(
        s,
        BS,
        &["shareholdersEquity", "totalEquity", "totalShareholdersEquity", "equity"],
    )
    .unwrap_or_else(|| total_assets(s) - total_liabilities(s))
}

pub fn retained_earnings(s: &FinancialStatement) -> f64 {
    field(s, BS, "retainedEarnings")
}

/// Contributed capital; equity less retained earnings when not reported.
pub fn paid_in_capital(s: &FinancialStatement) -> f64 {
    reported(s, BS, &["shareCapital", "paidInCapital", "commonStock"])
        .unwrap_or_else(|| equity(s) - retained_earnings(s))
}

pub fn shares_outstanding(s: &FinancialStatement) -> f64 {
    field(s, BS, "sharesOutstanding")
}

pub fn working_capital(s: &FinancialStatement) -> f64 {
    current_assets(s) - current_liabilities(s)
}

pub fn capital_employed(s: &FinancialStatement) -> f64 {
    total_assets(s) - current_liabilities(s)
}

pub fn invested_capital(s: &FinancialStatement) -> f64 {
    equity(s) + total_debt(s)
}

// cash flow statement

pub fn operating_cash_flow(s: &FinancialStatement) -> f64 {
    first_of(s, CF, &["operatingCashFlow", "operatingActivities"])
}

pub fn investing_cash_flow(s: &FinancialStatement) -> f64 {
    first_of(s, CF, &["investingCashFlow", "investingActivities"])
}

pub fn financing_cash_flow(s: &FinancialStatement) -> f64 {
    first_of(s, CF, &["financingCashFlow", "financingActivities"])
}

pub fn capital_expenditures(s: &FinancialStatement) -> f64 {
    field(s, CF, "capitalExpenditures").abs()
}

pub fn free_cash_flow(s: &FinancialStatement) -> f64 {
    reported(s, CF, &["freeCashFlow"])
        .unwrap_or_else(|| operating_cash_flow(s) - capital_expenditures(s))
}

pub fn dividends_paid(s: &FinancialStatement) -> f64 {
    field(s, CF, "dividendsPaid").abs()
}

pub fn net_cash_flow(s: &FinancialStatement) -> f64 {
    reported(s, CF, &["netCashFlow"]).unwrap_or_else(|| {
        operating_cash_flow(s) + investing_cash_flow(s) + financing_cash_flow(s)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_and_derivations() {
        let s = FinancialStatement::default()
            .with_value(IS, "revenue", 200.0)
            .with_value(IS, "costOfGoodsSold", 120.0)
            .with_value(IS, "operatingExpenses", 30.0)
            .with_value(BS, "totalAssets", 500.0)
            .with_value(BS, "totalLiabilities", 300.0);
        assert_eq!(revenue(&s), 200.0);
        assert_eq!(gross_profit(&s), 80.0);
        assert_eq!(operating_income(&s), 50.0);
        assert_eq!(equity(&s), 200.0);
    }

    #[test]
    fn reported_values_win() {
        let s = FinancialStatement::default()
            .with_value(IS, "totalRevenue", 100.0)
            .with_value(IS, "revenue", 5.0)
            .with_value(IS, "grossProfit", 40.0)
            .with_value(CF, "operatingCashFlow", 30.0)
            .with_value(CF, "capitalExpenditures", -10.0);
        assert_eq!(revenue(&s), 100.0);
        assert_eq!(gross_profit(&s), 40.0);
        assert_eq!(free_cash_flow(&s), 20.0);
    }
}
