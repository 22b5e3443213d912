//! Comparative analyses: the company's key ratios against one benchmark group.

use analysis_core::metrics::{percent, percentile_rank, ratio};
use analysis_core::{AnalysisError, AnalysisModule, Category, ChartPoint, Chart, ModuleInfo, Section};
use serde::Serialize;

use crate::common::latest;
use crate::fields as f;
use crate::rules::Condition::*;
use crate::rules::Emit::*;
use crate::rules::{tier, Computed, NarrativeRule, RuleModule, RuleSet, ScoreCheck};

const CAT: Category = Category::Comparative;
const SECTIONS: &[Section] = &[Section::BalanceSheet, Section::IncomeStatement];

/// Relative band around the benchmark treated as "average".
const BAND: f64 = 0.05;

pub fn modules() -> Vec<Box<dyn AnalysisModule>> {
    vec![
        group("peer-comparison", "Peer comparison", "peers"),
        group("industry-comparison", "Industry comparison", "industry"),
        group("competitor-comparison", "Competitor comparison", "competitors"),
        group("market-leader-comparison", "Market leader comparison", "leaders"),
        group("startup-comparison", "Startup comparison", "startups"),
        group("mid-size-comparison", "Mid-size company comparison", "mid-size"),
        group("large-company-comparison", "Large company comparison", "large"),
        group("small-company-comparison", "Small company comparison", "small"),
        group("local-market-comparison", "Local market comparison", "local"),
        group("international-comparison", "International comparison", "international"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Position {
    Above,
    Average,
    Below,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Comparison {
    metric: &'static str,
    company: f64,
    benchmark: f64,
    position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentile: Option<f64>,
}

/// Compared ratio: key, label, whether higher is better.
struct Measure {
    key: &'static str,
    label: &'static str,
    higher_is_better: bool,
    value: fn(&analysis_core::FinancialStatement) -> f64,
}

static MEASURES: [Measure; 8] = [
    Measure { key: "currentRatio", label: "Current ratio", higher_is_better: true, value: |s| ratio(f::current_assets(s), f::current_liabilities(s)) },
    Measure { key: "quickRatio", label: "Quick ratio", higher_is_better: true, value: |s| ratio(f::current_assets(s) - f::inventory(s), f::current_liabilities(s)) },
    Measure { key: "debtToEquity", label: "Debt to equity", higher_is_better: false, value: |s| ratio(f::total_liabilities(s), f::equity(s)) },
    Measure { key: "grossMargin", label: "Gross margin", higher_is_better: true, value: |s| percent(f::gross_profit(s), f::revenue(s)) },
    Measure { key: "netMargin", label: "Net margin", higher_is_better: true, value: |s| percent(f::net_income(s), f::revenue(s)) },
    Measure { key: "returnOnAssets", label: "Return on assets", higher_is_better: true, value: |s| percent(f::net_income(s), f::total_assets(s)) },
    Measure { key: "returnOnEquity", label: "Return on equity", higher_is_better: true, value: |s| percent(f::net_income(s), f::equity(s)) },
    Measure { key: "assetTurnover", label: "Asset turnover", higher_is_better: true, value: |s| ratio(f::revenue(s), f::total_assets(s)) },
];

fn position(company: f64, benchmark: f64, higher_is_better: bool) -> Position {
    let band = benchmark.abs() * BAND;
    let diff = if higher_is_better {
        company - benchmark
    } else {
        benchmark - company
    };
    if diff > band {
        Position::Above
    } else if diff < -band {
        Position::Below
    } else {
        Position::Average
    }
}

static COMPARISON: RuleSet = RuleSet {
    checks: &[ScoreCheck {
        metric: "relativeScore",
        tiers: &[tier(AtLeast(80.0), 4), tier(AtLeast(60.0), 3), tier(AtLeast(40.0), 2), tier(AtLeast(20.0), 1)],
    }],
    rules: &[
        NarrativeRule {
            metric: "belowShare",
            when: Above(50.0),
            emits: &[
                Recommend("Use the {name} to set improvement targets for lagging ratios"),
                Risk("Most key ratios trail the benchmark in the {name}"),
            ],
        },
        NarrativeRule {
            metric: "aboveShare",
            when: AtLeast(50.0),
            emits: &[
                Note("The company outperforms the benchmark on most ratios."),
                Opportunity("Competitive advantage visible in the {name}"),
            ],
        },
    ],
    opportunities: &[
        "Adopt the practices of stronger benchmark companies",
        "Close gaps on lagging ratios",
        "Use the benchmark to set performance targets",
    ],
    threats: &["Benchmark companies may close the performance gap"],
};

fn group(id: &'static str, name: &'static str, group: &'static str) -> Box<dyn AnalysisModule> {
    RuleModule::new(
        ModuleInfo::new(id, name, "Key ratios against a benchmark group", CAT, 1),
        SECTIONS,
        &COMPARISON,
        move |ctx| {
            let bench = ctx
                .benchmark
                .as_ref()
                .and_then(|b| b.group(group))
                .ok_or_else(|| {
                    AnalysisError::InsufficientData(format!("benchmark data for {} is not available", group))
                })?;
            let s = latest(ctx)?;

            let mut comparisons = Vec::new();
            for m in &MEASURES {
                let Some(benchmark) = bench.averages.get(m.key).copied() else {
                    continue;
                };
                let company = (m.value)(s);
                let percentile = bench.samples.get(m.key).filter(|v| !v.is_empty()).map(|sample| {
                    let rank = percentile_rank(company, sample);
                    if m.higher_is_better {
                        rank
                    } else {
                        100.0 - rank
                    }
                });
                comparisons.push((
                    m,
                    Comparison {
                        metric: m.key,
                        company,
                        benchmark,
                        position: position(company, benchmark, m.higher_is_better),
                        percentile,
                    },
                ));
            }
            if comparisons.is_empty() {
                return Err(AnalysisError::InsufficientData(format!(
                    "benchmark group {} has no comparable averages",
                    group
                )));
            }

            let n = comparisons.len() as f64;
            let count = |p: Position| comparisons.iter().filter(|(_, c)| c.position == p).count() as f64;
            let (above, average, below) = (count(Position::Above), count(Position::Average), count(Position::Below));

            let mut c = Computed::new()
                .metric("comparedMetrics", n)
                .metric("aboveShare", above / n * 100.0)
                .metric("belowShare", below / n * 100.0)
                .metric("relativeScore", (above * 2.0 + average) / (n * 2.0) * 100.0)
                .chart(Chart::bar(
                    format!("Company vs {}", group),
                    comparisons
                        .iter()
                        .flat_map(|(m, c)| {
                            [
                                ChartPoint::new(m.label, c.company),
                                ChartPoint::new(format!("{} ({})", m.label, group), c.benchmark),
                            ]
                        })
                        .collect(),
                ));
            for (m, cmp) in &comparisons {
                match cmp.position {
                    Position::Above => c.narrative.swot.strengths.push(format!("{} ahead of {}", m.label, group)),
                    Position::Below => c.narrative.swot.weaknesses.push(format!("{} behind {}", m.label, group)),
                    Position::Average => {}
                }
            }
            let rows: Vec<Comparison> = comparisons.into_iter().map(|(_, c)| c).collect();
            Ok(c.detail("group", group).detail("comparisons", rows))
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

    fn bench(name: &str, current: f64, debt_to_equity: f64) -> BenchmarkData {
        let mut g = PeerGroup::default();
        g.averages.insert("currentRatio".into(), current);
        g.averages.insert("debtToEquity".into(), debt_to_equity);
        g.samples.insert("currentRatio".into(), vec![1.0, 1.2, 2.0, 2.5]);
        let mut b = BenchmarkData::default();
        b.groups.insert(name.into(), g);
        b
    }

    #[test]
    fn catalogue_size() {
        assert_eq!(modules().len(), CAT.expected_count());
    }

    #[test]
    fn band_and_direction() {
        assert_eq!(position(1.04, 1.0, true), Position::Average);
        assert_eq!(position(1.2, 1.0, true), Position::Above);
        assert_eq!(position(1.2, 1.0, false), Position::Below);
    }

    #[test]
    fn missing_group_degrades() {
        let ctx = AnalysisContext::new(company_statements()).with_benchmark(Some(bench("industry", 1.0, 1.0)));
        let r = group("peer-comparison", "Peer comparison", "peers").run(&ctx);
        assert_eq!(r.status, ResultStatus::InsufficientData);
        assert!(r.final_evaluation.interpretation.contains("peers"));
    }

    #[test]
    fn compares_available_averages() {
        // company: current ratio 1.5, debt to equity 1.0
        let ctx = AnalysisContext::new(company_statements()).with_benchmark(Some(bench("peers", 1.2, 2.0)));
        let r = group("peer-comparison", "Peer comparison", "peers").run(&ctx);
        assert!(!r.is_degraded());
        assert_relative_eq!(r.results["comparedMetrics"].as_f64().unwrap(), 2.0);
        assert_relative_eq!(r.results["relativeScore"].as_f64().unwrap(), 100.0);
        assert_eq!(r.results["comparisons"][0]["position"], "above");
        assert_relative_eq!(r.results["comparisons"][0]["percentile"].as_f64().unwrap(), 50.0);
        assert_eq!(r.swot.strengths.len(), 2);
    }
}
