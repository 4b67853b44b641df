//! Batch job command handlers for the CLI.
//!
//! Each invocation opens its own job run with trigger source `cli`. A
//! [`JobError`] is printed and returned; per-record failures only show up in
//! the report counts and the `job_logs` table.

use std::fmt::Write as _;

use clap::Subcommand;
use leadq_core::{AppConfig, SystemClock};
use leadq_db::PgLeadRepository;
use leadq_enrich::WebsiteFetcher;
use leadq_pipeline::{
    connector_from_config, run_discovery, run_enrichment, InMemoryLeadRepository, JobConfig,
    JobError, JobReport,
};

const TRIGGER: &str = "cli";

/// Sub-commands available under `jobs`.
#[derive(Debug, Subcommand)]
pub enum JobsCommands {
    /// Discover candidates from the configured hashtags and seed accounts
    Discover {
        /// Score discovered candidates in memory without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch and classify websites of leads that have not been enriched yet
    Enrich {
        /// List the leads that would be fetched without fetching them
        #[arg(long)]
        dry_run: bool,
        /// Override the configured batch size
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

pub(crate) async fn run_jobs_command(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: JobsCommands,
) -> anyhow::Result<()> {
    let mut job_config = JobConfig::from_app_config(config)?;
    let repo = PgLeadRepository::new(pool.clone());

    match command {
        JobsCommands::Discover { .. } => {
            let connector = connector_from_config(config)?;
            let result =
                run_discovery(&repo, connector.as_ref(), &SystemClock, &job_config, TRIGGER).await;
            print_outcome(result)
        }
        JobsCommands::Enrich {
            dry_run,
            batch_size,
        } => {
            if let Some(size) = batch_size {
                job_config.batch_size = size;
            }
            if dry_run {
                return print_pending(pool, job_config.batch_size).await;
            }
            let fetcher = WebsiteFetcher::new(config.fetch_timeout_secs, &config.user_agent)
                .map_err(|e| anyhow::anyhow!("failed to build website fetcher: {e}"))?;
            let result = run_enrichment(&repo, &fetcher, &SystemClock, &job_config, TRIGGER).await;
            print_outcome(result)
        }
    }
}

/// Run discovery against an in-memory repository and print what would be
/// stored.
///
/// # Errors
///
/// Returns an error if the targets or snapshot cannot be loaded, or every
/// configured source failed.
pub(crate) async fn run_discover_dry_run(config: &AppConfig) -> anyhow::Result<()> {
    let job_config = JobConfig::from_app_config(config)?;
    let connector = connector_from_config(config)?;
    let repo = InMemoryLeadRepository::new();

    let report = run_discovery(
        &repo,
        connector.as_ref(),
        &SystemClock,
        &job_config,
        "cli-dry-run",
    )
    .await?;

    println!(
        "dry-run: {} candidates from {} hashtags and {} seed accounts",
        report.selected,
        job_config.targets.hashtags.len(),
        job_config.targets.seed_accounts.len()
    );
    let mut leads = repo.leads();
    leads.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
    println!("{:<32}{:<7}{:<11}WEBSITE", "HANDLE", "SCORE", "STATUS");
    for lead in &leads {
        println!(
            "{:<32}{:<7}{:<11}{}",
            lead.handle(),
            lead.quality_score,
            lead.status,
            lead.candidate.website_url.as_deref().unwrap_or("\u{2014}")
        );
    }
    Ok(())
}

async fn print_pending(pool: &sqlx::PgPool, batch_size: usize) -> anyhow::Result<()> {
    let limit = i64::try_from(batch_size).unwrap_or(i64::MAX);
    let pending = leadq_db::list_pending_enrichment(pool, limit).await?;
    if pending.is_empty() {
        println!("dry-run: no leads pending enrichment");
        return Ok(());
    }
    println!("dry-run: would fetch {} websites", pending.len());
    for lead in &pending {
        println!(
            "  {:<32}{} (attempts: {})",
            lead.handle(),
            lead.candidate.website_url.as_deref().unwrap_or_default(),
            lead.enrichment_attempts
        );
    }
    Ok(())
}

fn print_outcome(result: Result<JobReport, JobError>) -> anyhow::Result<()> {
    match result {
        Ok(report) => {
            println!("{}", format_report(&report));
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            Err(e.into())
        }
    }
}

pub(crate) fn format_report(report: &JobReport) -> String {
    let mut line = format!(
        "{} run {}: {} selected, {} processed, {} failed, {} unavailable, {} skipped",
        report.job,
        report.run_id,
        report.selected,
        report.processed,
        report.failed,
        report.unavailable,
        report.skipped
    );
    if report.budget_exhausted {
        line.push_str(" (job budget exhausted)");
    }
    for source in &report.sources_failed {
        let _ = write!(line, "\n  source failed: {source}");
    }
    line
}
