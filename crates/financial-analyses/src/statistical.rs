//! Statistical profiling of the statement history. Every module here needs at
//! least three periods.

use analysis_core::metrics::{
    autocorrelation, consistency, correlation, descriptive_stats, growth_percent, linear_trend, mean,
    percent, percentile_rank, period_returns, ratio, std_dev, variance, z_score_of, z_score_outliers,
};
use analysis_core::{AnalysisError, AnalysisModule, Category, Chart, ChartPoint, FinancialStatement, ModuleInfo, Section};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::common::{bars, trend, Item};
use crate::fields as f;
use crate::placeholder::Placeholder;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Statistical;
const MIN_PERIODS: usize = 3;
const IS: &[Section] = &[Section::IncomeStatement];
const BS_IS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];
const ALL: &[Section] = &[
    Section::BalanceSheet,
    Section::IncomeStatement,
    Section::CashFlowStatement,
];
const SIGNIFICANCE: f64 = 0.05;

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        descriptive(),
        inferential(),
        correlation_analysis(),
        regression(),
        variance_analysis(),
        distribution(),
        time_series(),
        predictive(),
        comparative(),
        Placeholder::boxed("classification-analysis", "Classification analysis", CAT),
        Placeholder::boxed("clustering-analysis", "Clustering analysis", CAT),
        advanced_predictive(),
        Placeholder::boxed("advanced-classification-analysis", "Advanced classification analysis", CAT),
        Placeholder::boxed("advanced-clustering-analysis", "Advanced clustering analysis", CAT),
        Placeholder::boxed("advanced-regression-analysis", "Advanced regression analysis", CAT),
        advanced_time_series(),
        advanced_correlation(),
        Placeholder::boxed("advanced-variance-analysis", "Advanced variance analysis", CAT),
        Placeholder::boxed("advanced-distribution-analysis", "Advanced distribution analysis", CAT),
        comprehensive(),
    ]
}

fn info(id: &'static str, name: &'static str, description: &'static str) -> ModuleInfo {
    ModuleInfo::new(id, name, description, CAT, MIN_PERIODS)
}

fn series(statements: &[FinancialStatement], item: Item) -> Vec<f64> {
    f::series(statements, item)
}

fn net_margin(s: &FinancialStatement) -> f64 {
    percent(f::net_income(s), f::revenue(s))
}

/// Ordinary least squares fit with an intercept.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fit {
    /// Intercept first, then one coefficient per regressor.
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
}

impl Fit {
    pub fn predict(&self, regressors: &[f64]) -> f64 {
        self.coefficients[0]
            + self.coefficients[1..]
                .iter()
                .zip(regressors)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

/// Solves the normal equations; `None` when the regressors are collinear or
/// there are no more observations than parameters.
pub(crate) fn least_squares(regressors: &[Vec<f64>], y: &[f64]) -> Option<Fit> {
    let n = y.len();
    let k = regressors.len() + 1;
    if n <= k || regressors.iter().any(|c| c.len() != n) {
        return None;
    }
    let x = DMatrix::from_fn(n, k, |r, c| if c == 0 { 1.0 } else { regressors[c - 1][r] });
    let target = DVector::from_column_slice(y);
    let xt = x.transpose();
    let beta = (&xt * &x).try_inverse()? * &xt * &target;
    if beta.iter().any(|b| !b.is_finite()) {
        return None;
    }

    let fitted = &x * &beta;
    let m = mean(y);
    let ss_res: f64 = y.iter().zip(fitted.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|v| (v - m).powi(2)).sum();
    let r_squared = if ss_tot == 0.0 { 0.0 } else { (1.0 - ss_res / ss_tot).max(0.0) };
    Some(Fit {
        coefficients: beta.iter().copied().collect(),
        r_squared,
    })
}

/// Two-sided one-sample t-test of `sample` against a zero mean.
/// Returns (t statistic, p-value).
pub(crate) fn t_test_zero_mean(sample: &[f64]) -> Result<(f64, f64), AnalysisError> {
    if sample.len() < 2 {
        return Err(AnalysisError::needs_periods(3, sample.len() + 1));
    }
    let n = sample.len() as f64;
    let m = mean(sample);
    // sample (n - 1) standard deviation
    let sd = (variance(sample) * n / (n - 1.0)).sqrt();
    if sd == 0.0 {
        return Ok(if m == 0.0 { (0.0, 1.0) } else { (f64::INFINITY.copysign(m), 0.0) });
    }
    let t = m / (sd / n.sqrt());
    let dist = StudentsT::new(0.0, 1.0, n - 1.0)
        .map_err(|e| AnalysisError::CalculationError(format!("t distribution: {}", e)))?;
    Ok((t, 2.0 * (1.0 - dist.cdf(t.abs()))))
}

static DESCRIPTIVE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "revenueVariation",
            tiers: &[tier(AtMost(10.0), 3), tier(AtMost(25.0), 2), tier(AtMost(50.0), 1)],
        },
        ScoreCheck {
            metric: "averageNetMargin",
            tiers: &[tier(AtLeast(10.0), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "revenueVariation",
            when: Above(25.0),
            emits: &[
                Risk("Revenue varies widely between periods (CV {value}%)"),
                Recommend("Improve revenue predictability through recurring contracts"),
            ],
        },
        NarrativeRule {
            metric: "averageNetMargin",
            when: Below(0.0),
            emits: &[Weakness("Loss-making on average across the history")],
        },
    ],
    opportunities: &[
        "Use summary statistics to set realistic targets",
        "Track dispersion to spot changes early",
    ],
    threats: &[
        "High dispersion in key figures",
        "Short history limits reliability",
    ],
};

fn descriptive() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("descriptive-statistics", "Descriptive statistics", "Central tendency and dispersion of revenue and profit"),
        IS,
        &DESCRIPTIVE,
        |ctx| {
            let revenue = descriptive_stats(&series(&ctx.statements, f::revenue));
            let profit = descriptive_stats(&series(&ctx.statements, f::net_income));
            let margins = series(&ctx.statements, net_margin);
            Ok(Computed::new()
                .metric("revenueMean", revenue.mean)
                .metric("revenueMedian", revenue.median)
                .metric("revenueStandardDeviation", revenue.standard_deviation)
                .metric("revenueVariation", revenue.coefficient_of_variation * 100.0)
                .metric("averageNetMargin", mean(&margins))
                .chart(bars(
                    "Revenue distribution",
                    &[("Min", revenue.min), ("Median", revenue.median), ("Mean", revenue.mean), ("Max", revenue.max)],
                ))
                .detail("revenue", revenue)
                .detail("netIncome", profit))
        },
    )
    .boxed()
}

static INFERENTIAL: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "significantGrowth",
            tiers: &[tier(AtLeast(1.0), 3)],
        },
        ScoreCheck {
            metric: "meanGrowth",
            tiers: &[tier(Above(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "significantGrowth",
            when: AtLeast(1.0),
            emits: &[
                Note("Average revenue growth is statistically different from zero."),
                Predict("Revenue growth is likely to persist"),
            ],
        },
        NarrativeRule {
            metric: "meanGrowth",
            when: Below(0.0),
            emits: &[Risk("Revenue shrinks on average by {abs}% per period")],
        },
    ],
    opportunities: &[
        "Base decisions on statistically supported trends",
        "Extend the data history for firmer conclusions",
    ],
    threats: &[
        "Apparent trends may not be significant",
        "Small samples",
    ],
};

fn inferential() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("inferential-statistics", "Inferential statistics", "One-sample t-test of mean revenue growth against zero"),
        IS,
        &INFERENTIAL,
        |ctx| {
            let growth = period_returns(&series(&ctx.statements, f::revenue));
            let (t, p) = t_test_zero_mean(&growth)?;
            let m = mean(&growth) * 100.0;
            let significant = p < SIGNIFICANCE && m > 0.0;
            // an identical growth figure in every period gives an infinite t, stored as 0
            Ok(Computed::new()
                .metric("meanGrowth", m)
                .metric("tStatistic", t)
                .metric("pValue", p)
                .metric("degreesOfFreedom", (growth.len() - 1) as f64)
                .metric("significantGrowth", if significant { 1.0 } else { 0.0 }))
        },
    )
    .boxed()
}

static CORRELATION: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "revenueProfitCorrelation",
            tiers: &[tier(AtLeast(0.7), 3), tier(AtLeast(0.3), 2), tier(AtLeast(0.0), 1)],
        },
        ScoreCheck {
            metric: "revenueCashCorrelation",
            tiers: &[tier(AtLeast(0.7), 2), tier(AtLeast(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "revenueProfitCorrelation",
            when: Below(0.0),
            emits: &[
                Risk("Profit moves against revenue"),
                Recommend("Improve cost management so that growth converts into profit"),
            ],
        },
        NarrativeRule {
            metric: "revenueCashCorrelation",
            when: AtLeast(0.7),
            emits: &[Strength("Sales convert reliably into operating cash")],
        },
    ],
    opportunities: &[
        "Manage the drivers that move together with profit",
        "Use linked metrics as early indicators",
    ],
    threats: &[
        "Correlation may not imply causation",
        "Relationships can break down",
    ],
};

fn correlation_analysis() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("correlation-analysis", "Correlation analysis", "Co-movement of revenue with profit, cash and costs"),
        &[Section::IncomeStatement, Section::CashFlowStatement],
        &CORRELATION,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let profit = correlation(&revenue, &series(&ctx.statements, f::net_income));
            let cash = correlation(&revenue, &series(&ctx.statements, f::operating_cash_flow));
            let costs = correlation(&revenue, &series(&ctx.statements, f::total_expenses));
            Ok(Computed::new()
                .metric("revenueProfitCorrelation", profit)
                .metric("revenueCashCorrelation", cash)
                .metric("revenueCostCorrelation", costs)
                .chart(bars(
                    "Correlation with revenue",
                    &[("Net income", profit), ("Operating cash flow", cash), ("Total expenses", costs)],
                )))
        },
    )
    .boxed()
}

static REGRESSION: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "rSquared",
            tiers: &[tier(AtLeast(0.8), 3), tier(AtLeast(0.5), 2), tier(AtLeast(0.2), 1)],
        },
        ScoreCheck {
            metric: "marginalProfit",
            tiers: &[tier(Above(0.1), 2), tier(Above(0.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "marginalProfit",
            when: AtMost(0.0),
            emits: &[Risk("Additional revenue has not translated into additional profit")],
        },
        NarrativeRule {
            metric: "rSquared",
            when: AtLeast(0.8),
            emits: &[Note("Revenue explains most of the variation in net income.")],
        },
    ],
    opportunities: &[
        "Use the fitted trend for planning",
        "Identify the strongest profit drivers",
    ],
    threats: &[
        "Model fit may weaken",
        "Structural breaks in the data",
    ],
};

fn regression() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("regression-analysis", "Regression analysis", "Least-squares fit of net income on revenue"),
        IS,
        &REGRESSION,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let profit = series(&ctx.statements, f::net_income);
            let fit = least_squares(&[revenue], &profit)
                .ok_or_else(|| AnalysisError::InsufficientData("revenue does not vary across periods".into()))?;
            Ok(Computed::new()
                .metric("intercept", fit.coefficients[0])
                .metric("marginalProfit", fit.coefficients[1])
                .metric("rSquared", fit.r_squared))
        },
    )
    .boxed()
}

static VARIANCE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "growthVolatility",
            tiers: &[tier(AtMost(5.0), 3), tier(AtMost(15.0), 2), tier(AtMost(30.0), 1)],
        },
        ScoreCheck {
            metric: "marginVolatility",
            tiers: &[tier(AtMost(2.0), 2), tier(AtMost(5.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "growthVolatility",
            when: Above(30.0),
            emits: &[
                Risk("Revenue growth is highly volatile"),
                Recommend("Diversify revenue sources to stabilise growth"),
            ],
        },
        NarrativeRule {
            metric: "marginVolatility",
            when: Above(5.0),
            emits: &[Weakness("Unstable profit margins")],
        },
    ],
    opportunities: &[
        "Reduce volatility in key figures",
        "Stabilise revenue sources",
    ],
    threats: &[
        "High variability in results",
        "Unpredictable cash flows",
    ],
};

fn variance_analysis() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("variance-analysis", "Variance analysis", "Volatility of revenue growth and net margin"),
        IS,
        &VARIANCE,
        |ctx| {
            let growth: Vec<f64> = period_returns(&series(&ctx.statements, f::revenue))
                .into_iter()
                .map(|g| g * 100.0)
                .collect();
            let margins = series(&ctx.statements, net_margin);
            Ok(Computed::new()
                .metric("growthVariance", variance(&growth))
                .metric("growthVolatility", std_dev(&growth))
                .metric("marginVariance", variance(&margins))
                .metric("marginVolatility", std_dev(&margins)))
        },
    )
    .boxed()
}

static DISTRIBUTION: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "skewness",
            tiers: &[tier(AbsBelow(0.5), 2), tier(AbsBelow(1.0), 1)],
        },
        ScoreCheck {
            metric: "kurtosis",
            tiers: &[tier(AbsBelow(1.0), 2), tier(AbsBelow(3.0), 1)],
        },
        ScoreCheck {
            metric: "outliers",
            tiers: &[tier(AtMost(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "outliers",
            when: AtLeast(1.0),
            emits: &[
                Risk("{value} period(s) of revenue lie outside the normal range"),
                Recommend("Investigate the outlier periods before relying on averages in the analysis"),
            ],
        },
        NarrativeRule {
            metric: "skewness",
            when: AbsAbove(1.0),
            emits: &[Note("Revenue is strongly skewed across periods.")],
        },
    ],
    opportunities: &[
        "Plan around the typical outcome range",
        "Monitor tail outcomes",
    ],
    threats: &[
        "Skewed outcomes",
        "Extreme values",
    ],
};

fn distribution() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("distribution-analysis", "Distribution analysis", "Shape of the revenue distribution and z-score outliers"),
        IS,
        &DISTRIBUTION,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let stats = descriptive_stats(&revenue);
            let outliers = z_score_outliers(&revenue, ctx.outlier_threshold);
            Ok(Computed::new()
                .metric("skewness", stats.skewness)
                .metric("kurtosis", stats.kurtosis)
                .metric("outliers", outliers.len() as f64)
                .detail("outlierPeriods", outliers))
        },
    )
    .boxed()
}

static TIME_SERIES: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "trendGrowth",
            tiers: &[tier(Above(5.0), 3), tier(Above(0.0), 2)],
        },
        ScoreCheck {
            metric: "trendFit",
            tiers: &[tier(AtLeast(0.8), 2), tier(AtLeast(0.5), 1)],
        },
        ScoreCheck {
            metric: "consistency",
            tiers: &[tier(AtLeast(80.0), 2), tier(AtLeast(50.0), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "trendGrowth",
            when: Below(0.0),
            emits: &[
                Risk("Revenue follows a downward trend of {abs}% per period"),
                Recommend("Review the commercial strategy to reverse the declining trend"),
            ],
        },
        NarrativeRule {
            metric: "trendGrowth",
            when: Above(5.0),
            emits: &[Strength("Sustained upward revenue trend")],
        },
    ],
    opportunities: &[
        "Use the trend for forecasting",
        "Plan around seasonal or cyclical patterns",
    ],
    threats: &[
        "Trend reversals",
        "Cyclical downturns",
    ],
};

fn time_series() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("time-series-analysis", "Time series analysis", "Linear trend and consistency of revenue"),
        IS,
        &TIME_SERIES,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let t = linear_trend(&revenue);
            Ok(Computed::new()
                .metric("trendSlope", t.slope)
                .metric("trendGrowth", percent(t.slope, mean(&revenue)))
                .metric("trendFit", t.r_squared)
                .metric("consistency", consistency(&revenue))
                .chart(trend("Revenue", &ctx.statements, f::revenue)))
        },
    )
    .boxed()
}

static PREDICTIVE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "forecastGrowth",
            tiers: &[tier(Above(5.0), 3), tier(Above(0.0), 2), tier(AtLeast(-5.0), 1)],
        },
        ScoreCheck {
            metric: "forecastReliability",
            tiers: &[tier(AtLeast(0.7), 2), tier(AtLeast(0.4), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "forecastGrowth",
            when: AtLeast(0.0),
            emits: &[Predict("Revenue is forecast to change by {value}% next period")],
        },
        NarrativeRule {
            metric: "forecastGrowth",
            when: Below(0.0),
            emits: &[
                Predict("Revenue is forecast to fall by {abs}% next period"),
                Risk("Trend forecast points to lower revenue"),
            ],
        },
        NarrativeRule {
            metric: "forecastReliability",
            when: Below(0.4),
            emits: &[Note("The trend explains little of the history; treat the forecast with caution.")],
        },
    ],
    opportunities: &[
        "Use forecasts in budgeting",
        "Prepare for the projected path",
    ],
    threats: &[
        "Forecasts may prove wrong",
        "Changes in economic conditions",
    ],
};

fn predictive() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("predictive-analysis", "Predictive analysis", "Linear-trend forecast of revenue and net income"),
        IS,
        &PREDICTIVE,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let profit = series(&ctx.statements, f::net_income);
            let (rt, pt) = (linear_trend(&revenue), linear_trend(&profit));
            let n = revenue.len();
            let last = revenue.last().copied().unwrap_or(0.0);
            let next = rt.project(n, 1);
            let mut points: Vec<ChartPoint> = revenue
                .iter()
                .enumerate()
                .map(|(i, v)| ChartPoint::new(format!("Period {}", i + 1), *v))
                .collect();
            points.extend((1..=2).map(|k| ChartPoint::new(format!("Forecast +{}", k), rt.project(n, k))));
            Ok(Computed::new()
                .metric("nextRevenue", next)
                .metric("nextNetIncome", pt.project(n, 1))
                .metric("forecastGrowth", growth_percent(last, next))
                .metric("forecastReliability", rt.r_squared)
                .chart(Chart::line("Revenue forecast", points)))
        },
    )
    .boxed()
}

/// Benchmark samples the statistical comparison looks for, with whether a
/// higher value is better.
static SAMPLED: [(&str, bool, Item); 5] = [
    ("netMargin", true, net_margin),
    ("returnOnAssets", true, |s| percent(f::net_income(s), f::total_assets(s))),
    ("returnOnEquity", true, |s| percent(f::net_income(s), f::equity(s))),
    ("currentRatio", true, |s| ratio(f::current_assets(s), f::current_liabilities(s))),
    ("debtToEquity", false, |s| ratio(f::total_liabilities(s), f::equity(s))),
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Ranked {
    metric: &'static str,
    value: f64,
    percentile: f64,
    z_score: f64,
}

static COMPARATIVE: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "averagePercentile",
        tiers: &[tier(AtLeast(75.0), 4), tier(AtLeast(50.0), 3), tier(AtLeast(25.0), 2), tier(AtLeast(10.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "averagePercentile",
            when: Below(25.0),
            emits: &[
                Risk("The company ranks in the bottom quartile of its industry"),
                Recommend("Set improvement targets from the industry comparison"),
            ],
        },
        NarrativeRule {
            metric: "averagePercentile",
            when: AtLeast(75.0),
            emits: &[Strength("Top-quartile position in the industry")],
        },
    ],
    opportunities: &[
        "Learn from the best-performing periods",
        "Repeat the conditions of strong periods",
    ],
    threats: &[
        "Recent periods falling behind earlier ones",
        "Performance gaps widening",
    ],
};

fn comparative() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("comparative-statistical-analysis", "Comparative statistical analysis", "Percentile ranks of key ratios within industry samples"),
        BS_IS,
        &COMPARATIVE,
        |ctx| {
            let samples = ctx
                .benchmark
                .as_ref()
                .and_then(|b| b.group("industry"))
                .map(|g| &g.samples)
                .ok_or_else(|| AnalysisError::InsufficientData("industry samples are not available".into()))?;
            let s = crate::common::latest(ctx)?;
            let ranked: Vec<Ranked> = SAMPLED
                .iter()
                .filter_map(|(key, higher_is_better, item)| {
                    let sample = samples.get(*key).filter(|v| !v.is_empty())?;
                    let value = item(s);
                    let rank = percentile_rank(value, sample);
                    Some(Ranked {
                        metric: *key,
                        value,
                        percentile: if *higher_is_better { rank } else { 100.0 - rank },
                        z_score: z_score_of(value, sample),
                    })
                })
                .collect();
            if ranked.is_empty() {
                return Err(AnalysisError::InsufficientData("industry samples hold none of the ranked ratios".into()));
            }
            let avg = ranked.iter().map(|r| r.percentile).sum::<f64>() / ranked.len() as f64;
            let chart = Chart::bar(
                "Industry percentile",
                ranked.iter().map(|r| ChartPoint::new(r.metric, r.percentile)).collect(),
            );
            Ok(Computed::new()
                .metric("averagePercentile", avg)
                .metric("rankedMetrics", ranked.len() as f64)
                .chart(chart)
                .detail("rankings", ranked))
        },
    )
    .boxed()
}

static ADVANCED_PREDICTIVE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "adjustedRSquared",
            tiers: &[tier(AtLeast(0.8), 3), tier(AtLeast(0.5), 2), tier(AtLeast(0.2), 1)],
        },
        ScoreCheck {
            metric: "predictedGrowth",
            tiers: &[tier(Above(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "predictedGrowth",
            when: Above(0.0),
            emits: &[Predict("The multi-factor model expects net income to grow {value}%")],
        },
        NarrativeRule {
            metric: "predictedGrowth",
            when: AtMost(0.0),
            emits: &[Risk("The multi-factor model expects net income to shrink {abs}%")],
        },
    ],
    opportunities: &[
        "Refine forecasts with more drivers",
        "Use model output for scenario planning",
    ],
    threats: &[
        "Model overfitting",
        "Changes in the underlying relationships",
    ],
};

fn advanced_predictive() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(
            "advanced-predictive-analysis",
            "Advanced predictive analysis",
            "Net income regressed on revenue and operating expenses, projected one period ahead",
            CAT,
            4,
        ),
        IS,
        &ADVANCED_PREDICTIVE,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let opex = series(&ctx.statements, f::operating_expenses);
            let profit = series(&ctx.statements, f::net_income);
            let fit = least_squares(&[revenue.clone(), opex.clone()], &profit)
                .ok_or_else(|| AnalysisError::InsufficientData("revenue and operating expenses are collinear".into()))?;

            let n = profit.len();
            let next = [linear_trend(&revenue).project(n, 1), linear_trend(&opex).project(n, 1)];
            let predicted = fit.predict(&next);
            let last = profit.last().copied().unwrap_or(0.0);
            let k = 2.0;
            let adjusted = 1.0 - (1.0 - fit.r_squared) * (n as f64 - 1.0) / (n as f64 - k - 1.0);
            Ok(Computed::new()
                .metric("intercept", fit.coefficients[0])
                .metric("revenueCoefficient", fit.coefficients[1])
                .metric("expenseCoefficient", fit.coefficients[2])
                .metric("rSquared", fit.r_squared)
                .metric("adjustedRSquared", adjusted)
                .metric("predictedNetIncome", predicted)
                .metric("predictedGrowth", growth_percent(last, predicted)))
        },
    )
    .boxed()
}

static ADVANCED_TIME_SERIES: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "autocorrelation",
            tiers: &[tier(AtLeast(0.5), 3), tier(AtLeast(0.0), 2), tier(AtLeast(-0.5), 1)],
        },
        ScoreCheck {
            metric: "momentum",
            tiers: &[tier(AtLeast(0.0), 2)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "autocorrelation",
            when: Below(-0.5),
            emits: &[
                Risk("Revenue alternates between strong and weak periods"),
                Recommend("Smooth revenue cycles with a stable customer base"),
            ],
        },
        NarrativeRule {
            metric: "momentum",
            when: Below(0.0),
            emits: &[Predict("Growth is decelerating relative to its history")],
        },
        NarrativeRule {
            metric: "momentum",
            when: Above(0.0),
            emits: &[Predict("Growth is accelerating relative to its history")],
        },
    ],
    opportunities: &[
        "Exploit persistence in the trend",
        "Plan around recurring patterns",
    ],
    threats: &[
        "Regime changes",
        "Momentum reversals",
    ],
};

fn advanced_time_series() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("advanced-time-series-analysis", "Advanced time series analysis", "Lag-1 autocorrelation and growth momentum of revenue"),
        IS,
        &ADVANCED_TIME_SERIES,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let growth: Vec<f64> = period_returns(&revenue).into_iter().map(|g| g * 100.0).collect();
            let last = growth.last().copied().unwrap_or(0.0);
            Ok(Computed::new()
                .metric("autocorrelation", autocorrelation(&revenue, 1))
                .metric("latestGrowth", last)
                .metric("averageGrowth", mean(&growth))
                .metric("momentum", last - mean(&growth)))
        },
    )
    .boxed()
}

static MATRIX_SERIES: [(&str, Item); 5] = [
    ("revenue", f::revenue),
    ("netIncome", f::net_income),
    ("totalAssets", f::total_assets),
    ("operatingCashFlow", f::operating_cash_flow),
    ("totalExpenses", f::total_expenses),
];

static ADVANCED_CORRELATION: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "averageAbsCorrelation",
        tiers: &[tier(AtLeast(0.7), 3), tier(AtLeast(0.4), 2), tier(AtLeast(0.2), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "negativePairs",
            when: AtLeast(1.0),
            emits: &[Note("Some line items move against each other over the history.")],
        },
        NarrativeRule {
            metric: "averageAbsCorrelation",
            when: Below(0.4),
            emits: &[Weakness("Financial line items evolve inconsistently")],
        },
    ],
    opportunities: &[
        "Manage jointly moving metrics together",
        "Diversify weakly correlated activities",
    ],
    threats: &[
        "Concentration in correlated drivers",
        "Relationships breaking down under stress",
    ],
};

fn advanced_correlation() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("advanced-correlation-analysis", "Advanced correlation analysis", "Pairwise correlation matrix of the main line items"),
        ALL,
        &ADVANCED_CORRELATION,
        |ctx| {
            let columns: Vec<Vec<f64>> = MATRIX_SERIES.iter().map(|(_, item)| series(&ctx.statements, *item)).collect();
            let k = columns.len();
            let matrix = DMatrix::from_fn(k, k, |i, j| if i == j { 1.0 } else { correlation(&columns[i], &columns[j]) });

            let mut off_diagonal = Vec::new();
            for i in 0..k {
                for j in (i + 1)..k {
                    off_diagonal.push(matrix[(i, j)]);
                }
            }
            let avg_abs = off_diagonal.iter().map(|r| r.abs()).sum::<f64>() / off_diagonal.len() as f64;
            let rows: Vec<Vec<f64>> = (0..k).map(|i| matrix.row(i).iter().copied().collect()).collect();
            let labels: Vec<&str> = MATRIX_SERIES.iter().map(|(l, _)| *l).collect();
            Ok(Computed::new()
                .metric("averageAbsCorrelation", avg_abs)
                .metric("strongPairs", off_diagonal.iter().filter(|r| r.abs() >= 0.7).count() as f64)
                .metric("negativePairs", off_diagonal.iter().filter(|r| **r < 0.0).count() as f64)
                .detail("labels", labels)
                .detail("matrix", rows))
        },
    )
    .boxed()
}

static COMPREHENSIVE: RuleSet = RuleSet {
    checks: &[
        ScoreCheck {
            metric: "revenueVariation",
            tiers: &[tier(AtMost(15.0), 2), tier(AtMost(40.0), 1)],
        },
        ScoreCheck {
            metric: "trendGrowth",
            tiers: &[tier(Above(5.0), 2), tier(Above(0.0), 1)],
        },
        ScoreCheck {
            metric: "trendFit",
            tiers: &[tier(AtLeast(0.7), 2), tier(AtLeast(0.4), 1)],
        },
        ScoreCheck {
            metric: "revenueProfitCorrelation",
            tiers: &[tier(AtLeast(0.7), 2), tier(AtLeast(0.3), 1)],
        },
    ],
    rules: &[
        NarrativeRule {
            metric: "trendGrowth",
            when: Below(0.0),
            emits: &[Risk("The statistical profile shows a contracting business")],
        },
        NarrativeRule {
            metric: "revenueVariation",
            when: Above(40.0),
            emits: &[Recommend("Improve planning and forecasting to reduce revenue volatility")],
        },
        NarrativeRule {
            metric: "trendFit",
            when: AtLeast(0.7),
            emits: &[Strength("Predictable financial history")],
        },
    ],
    opportunities: &[
        "Combine statistical signals into planning",
        "Improve data quality",
    ],
    threats: &[
        "Conflicting statistical signals",
        "Limited data history",
    ],
};

fn comprehensive() -> Box<dyn AnalysisModule> {
    RuleModule::new(
        info("comprehensive-statistical-analysis", "Comprehensive statistical analysis", "Combined dispersion, trend and correlation profile"),
        IS,
        &COMPREHENSIVE,
        |ctx| {
            let revenue = series(&ctx.statements, f::revenue);
            let stats = descriptive_stats(&revenue);
            let t = linear_trend(&revenue);
            Ok(Computed::new()
                .metric("revenueVariation", stats.coefficient_of_variation * 100.0)
                .metric("trendGrowth", percent(t.slope, stats.mean))
                .metric("trendFit", t.r_squared)
                .metric("revenueProfitCorrelation", correlation(&revenue, &series(&ctx.statements, f::net_income))))
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::company_statements;
    use analysis_core::{AnalysisContext, BenchmarkData, PeerGroup, ResultStatus};
    use approx::assert_relative_eq;

    fn profit_history(revenue: &[f64], opex: &[f64], profit: &[f64]) -> Vec<FinancialStatement> {
        revenue
            .iter()
            .zip(opex)
            .zip(profit)
            .map(|((r, o), p)| {
                FinancialStatement::default()
                    .with_value(Section::IncomeStatement, "totalRevenue", *r)
                    .with_value(Section::IncomeStatement, "operatingExpenses", *o)
                    .with_value(Section::IncomeStatement, "netIncome", *p)
            })
            .collect()
    }

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn least_squares_recovers_exact_line() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 + 3.0 * v).collect();
        let fit = least_squares(&[x], &y).unwrap();
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.predict(&[5.0]), 17.0, epsilon = 1e-9);
    }

    #[test]
    fn least_squares_rejects_constant_regressor() {
        assert!(least_squares(&[vec![1.0, 1.0, 1.0]], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn t_test_on_symmetric_sample_is_not_significant() {
        let (t, p) = t_test_zero_mean(&[-1.0, 1.0, -2.0, 2.0]).unwrap();
        assert_relative_eq!(t, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn t_test_detects_large_shift() {
        let (t, p) = t_test_zero_mean(&[10.0, 11.0, 9.0, 10.5, 9.5]).unwrap();
        assert!(t > 10.0);
        assert!(p < 0.001);
    }

    #[test]
    fn regression_on_fixture_fits_exactly() {
        // net income is 10% of revenue in every period
        let r = regression().run(&AnalysisContext::new(company_statements()));
        assert_relative_eq!(r.results["marginalProfit"].as_f64().unwrap(), 0.1, epsilon = 1e-6);
        assert_relative_eq!(r.results["rSquared"].as_f64().unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn two_periods_degrade_every_statistical_module() {
        let mut statements = company_statements();
        statements.remove(0);
        for m in modules() {
            let r = m.run(&AnalysisContext::new(statements.clone()));
            assert!(r.is_degraded(), "{}", r.id);
        }
    }

    #[test]
    fn advanced_predictive_needs_independent_regressors() {
        let statements = profit_history(
            &[100.0, 120.0, 130.0, 160.0, 170.0],
            &[50.0, 52.0, 60.0, 61.0, 70.0],
            &[10.0, 14.0, 13.0, 20.0, 19.0],
        );
        let r = advanced_predictive().run(&AnalysisContext::new(statements));
        assert_eq!(r.status, ResultStatus::Completed);
        assert!(r.results["rSquared"].as_f64().unwrap() > 0.5);
    }

    #[test]
    fn comparative_ranks_against_industry_samples() {
        let mut group = PeerGroup::default();
        // company net margin is 10%
        group.samples.insert("netMargin".into(), vec![2.0, 4.0, 6.0, 8.0]);
        let mut bench = BenchmarkData::default();
        bench.groups.insert("industry".into(), group);
        let ctx = AnalysisContext::new(company_statements()).with_benchmark(Some(bench));
        let r = comparative().run(&ctx);
        assert_relative_eq!(r.results["averagePercentile"].as_f64().unwrap(), 100.0);
        assert_eq!(r.final_evaluation.score, 4);
    }

    #[test]
    fn matrix_is_symmetric() {
        let r = advanced_correlation().run(&AnalysisContext::new(company_statements()));
        let m = &r.results["matrix"];
        assert_relative_eq!(m[0][1].as_f64().unwrap(), m[1][0].as_f64().unwrap(), epsilon = 1e-12);
        assert_relative_eq!(m[2][2].as_f64().unwrap(), 1.0);
    }
}
