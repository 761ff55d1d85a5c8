use std::io::Read;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sentinel_scan::cli::{Cli, Command, OutputFormat};
use sentinel_scan::config::DEFAULT_MEMORY_STORE_CAPACITY;
use sentinel_scan::reporter::{json::JsonReporter, terminal::TerminalReporter, Reporter};
use sentinel_scan::store::{FallbackStore, FileStore, MemoryStore, SessionStore};
use sentinel_scan::types::ScanReport;
use sentinel_scan::{Orchestrator, ScanConfig, ScanError};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, ScanError> {
    let config = ScanConfig::from_env();
    let store = FallbackStore::new(
        FileStore::new(config.data_dir.clone(), config.session_ttl),
        MemoryStore::new(DEFAULT_MEMORY_STORE_CAPACITY),
    );

    let report = match cli.command {
        Command::Repo {
            ref repo,
            deadline_secs,
            max_units,
            max_depth,
            verify_secrets,
        } => {
            let (owner, name) = Command::split_repo(repo)
                .ok_or_else(|| ScanError::config(format!("invalid repository '{}'", repo)))?;
            let mut config = config.with_verify_secrets(verify_secrets);
            if let Some(n) = max_units {
                config = config.with_max_units(n);
            }
            if let Some(n) = max_depth {
                config = config.with_max_depth(n);
            }
            let orchestrator = Orchestrator::new(config);
            orchestrator
                .scan_repository(owner, name, deadline_secs.map(Duration::from_secs))
                .await?
        }

        Command::Snippet {
            ref input,
            ref language,
            deadline_secs,
        } => {
            let content = if input.as_os_str() == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                std::fs::read_to_string(input)?
            };
            let orchestrator = Orchestrator::new(config);
            orchestrator
                .scan_snippet(&content, language, deadline_secs.map(Duration::from_secs))
                .await?
        }

        Command::Bucket {
            ref bucket,
            deadline_secs,
        } => {
            let orchestrator = Orchestrator::new(config);
            orchestrator
                .scan_bucket(bucket, deadline_secs.map(Duration::from_secs))
                .await?
        }

        Command::Show { id } => {
            let Some(report) = store.load(id)? else {
                eprintln!("session {} not found (expired or never stored)", id);
                return Ok(ExitCode::from(2));
            };
            print_report(&cli, &report);
            return Ok(ExitCode::SUCCESS);
        }

        Command::Recent { limit } => {
            let summaries = store.recent(limit)?;
            if summaries.is_empty() {
                println!("no stored sessions");
            }
            for summary in summaries {
                println!(
                    "{}  {}  {}  {} findings  risk {}",
                    summary.id,
                    summary.started_at.format("%Y-%m-%d %H:%M:%S"),
                    summary.target,
                    summary.total_findings,
                    summary.overall_risk
                );
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    if let Err(e) = store.save(&report) {
        warn!(error = %e, "failed to persist session");
    }
    print_report(&cli, &report);

    // CI-friendly exit: non-zero when critical or high findings exist
    if report.session.summary.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn print_report(cli: &Cli, report: &ScanReport) {
    let output = match cli.format {
        OutputFormat::Terminal => TerminalReporter::new(cli.verbose).report(report),
        OutputFormat::Json => JsonReporter::new().report(report),
    };
    println!("{}", output);
}
