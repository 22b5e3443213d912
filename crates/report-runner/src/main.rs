//! report-runner: run every financial analysis over a JSON input document and
//! print the executive summary.
//!
//! Usage:
//!   cargo run -p report-runner -- --input demos/company.json
//!   cargo run -p report-runner -- --input company.json --sequential --compact

use analysis_core::statements::period_labels;
use analysis_core::{BenchmarkData, Company, ExecutiveSummary, FinancialStatement, MarketData};
use analysis_orchestrator::{AnalysisOrchestrator, EngineConfig, ExecutionMode};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Everything the engine needs, resolved up front.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputDocument {
    statements: Vec<FinancialStatement>,
    #[serde(default)]
    company: Option<Company>,
    #[serde(default)]
    market: Option<MarketData>,
    #[serde(default)]
    benchmark: Option<BenchmarkData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    generated_at: DateTime<Utc>,
    company: Option<String>,
    periods: Vec<String>,
    summary: ExecutiveSummary,
}

struct Args {
    input: PathBuf,
    sequential: bool,
    compact: bool,
}

fn parse_args(args: &[String]) -> Option<Args> {
    let input = args
        .iter()
        .position(|a| a == "--input")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)?;
    Some(Args {
        input,
        sequential: args.iter().any(|a| a == "--sequential"),
        compact: args.iter().any(|a| a == "--compact"),
    })
}

fn read_input(path: &Path) -> Result<InputDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading input {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing input {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "report_runner=info,analysis_orchestrator=info".into());

    // stdout carries the report, logs go to stderr
    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let argv: Vec<String> = std::env::args().collect();
    let Some(args) = parse_args(&argv) else {
        eprintln!("Usage:");
        eprintln!("  report-runner --input FILE [--sequential] [--compact]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --sequential   Run modules one at a time instead of on the thread pool");
        eprintln!("  --compact      Print single-line JSON");
        std::process::exit(2);
    };

    let mut config = EngineConfig::from_env()?;
    if args.sequential {
        config = config.with_execution_mode(ExecutionMode::Sequential);
    }

    let document = read_input(&args.input)?;
    tracing::info!(
        input = %args.input.display(),
        periods = document.statements.len(),
        "loaded input document"
    );

    let company = document.company.as_ref().map(|c| c.name.clone());
    let periods = period_labels(&document.statements);

    let orchestrator = Arc::new(AnalysisOrchestrator::new(config)?);
    let summary = orchestrator
        .analyze(
            document.statements,
            document.company,
            document.market,
            document.benchmark,
        )
        .await?;

    let report = Report {
        generated_at: Utc::now(),
        company,
        periods,
        summary,
    };
    let out = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags() {
        let args = parse_args(&argv(&["report-runner", "--compact", "--input", "a.json"])).unwrap();
        assert_eq!(args.input, PathBuf::from("a.json"));
        assert!(args.compact);
        assert!(!args.sequential);
        assert!(parse_args(&argv(&["report-runner", "--input"])).is_none());
    }

    #[test]
    fn minimal_document_parses() {
        let doc: InputDocument = serde_json::from_str(
            r#"{"statements": [{"period": "FY2023", "incomeStatement": {"totalRevenue": 100.0, "netIncome": null}}]}"#,
        )
        .unwrap();
        assert_eq!(doc.statements.len(), 1);
        assert!(doc.company.is_none());
        assert_eq!(period_labels(&doc.statements), vec!["FY2023"]);
    }

    #[test]
    fn unnamed_periods_are_numbered() {
        let statements = vec![FinancialStatement::default(), FinancialStatement::default()];
        assert_eq!(period_labels(&statements), vec!["Period 1", "Period 2"]);
    }
}
