//! Lead review command handlers for the CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use leadq_core::{build_outreach_dm, Actor, LeadStatus, SystemClock};
use leadq_db::{LeadFilter, PgLeadRepository};
use leadq_pipeline::{lead_detail, update_lead, LeadUpdate, ReviewError};

/// Sub-commands available under `leads`.
#[derive(Debug, Subcommand)]
pub enum LeadsCommands {
    /// List leads, best score first
    List {
        /// Only leads in this status (repeatable)
        #[arg(long = "status")]
        statuses: Vec<LeadStatus>,
        #[arg(long)]
        min_score: Option<u8>,
        #[arg(long)]
        max_score: Option<u8>,
        /// Niche substring
        #[arg(long)]
        niche: Option<String>,
        /// Handle or display name substring
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "50")]
        page_size: u32,
    },
    /// Show one lead with its activity feed
    Show { handle: String },
    /// Set a lead's status
    SetStatus {
        handle: String,
        status: LeadStatus,
        /// Why the lead is dead
        #[arg(long)]
        reason: Option<String>,
        /// Override the niche guess
        #[arg(long)]
        niche: Option<String>,
        /// Name recorded on the activity event
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    /// Print the outreach message for a lead
    Dm { handle: String },
}

pub(crate) async fn run_leads_command(
    pool: &sqlx::PgPool,
    command: LeadsCommands,
) -> anyhow::Result<()> {
    match command {
        LeadsCommands::List {
            statuses,
            min_score,
            max_score,
            niche,
            search,
            page,
            page_size,
        } => {
            let filter = LeadFilter {
                statuses,
                min_score,
                max_score,
                niche,
                search,
                page,
                page_size: page_size.clamp(1, 200),
            };
            run_list(pool, &filter).await
        }
        LeadsCommands::Show { handle } => run_show(pool, &handle).await,
        LeadsCommands::SetStatus {
            handle,
            status,
            reason,
            niche,
            actor,
        } => {
            let update = LeadUpdate {
                status: Some(status),
                reason_dead: reason.map(Some),
                niche_guess: niche.map(Some),
            };
            run_set_status(pool, &handle, &update, actor).await
        }
        LeadsCommands::Dm { handle } => run_dm(pool, &handle).await,
    }
}

async fn run_list(pool: &sqlx::PgPool, filter: &LeadFilter) -> anyhow::Result<()> {
    let page = leadq_db::list_leads(pool, filter).await?;
    if page.leads.is_empty() {
        println!("no leads found; run `jobs discover` first");
        return Ok(());
    }

    println!(
        "{:<32}{:<7}{:<12}{:<14}{:<12}WEBSITE",
        "HANDLE", "SCORE", "STATUS", "NICHE", "CHANGED"
    );
    for lead in &page.leads {
        println!(
            "{:<32}{:<7}{:<12}{:<14}{:<12}{}",
            lead.handle(),
            lead.quality_score,
            lead.status,
            lead.niche_guess.as_deref().unwrap_or("\u{2014}"),
            fmt_date(lead.last_status_change_at),
            lead.candidate.website_url.as_deref().unwrap_or("\u{2014}")
        );
    }
    println!(
        "page {} of {} leads (page size {})",
        page.page, page.total, page.page_size
    );
    Ok(())
}

async fn run_show(pool: &sqlx::PgPool, handle: &str) -> anyhow::Result<()> {
    let repo = PgLeadRepository::new(pool.clone());
    let detail = lead_detail(&repo, handle).await.map_err(not_found_hint)?;
    let lead = &detail.lead;

    println!("Lead: {}", lead.handle());
    println!(
        "Status: {} (changed {})",
        lead.status,
        fmt_date(lead.last_status_change_at)
    );
    println!("Score: {}", lead.quality_score);
    if let Some(name) = &lead.candidate.display_name {
        println!("Name: {name}");
    }
    if let Some(url) = &lead.candidate.website_url {
        println!("Website: {url}");
    }
    if let Some(niche) = &lead.niche_guess {
        println!("Niche: {niche}");
    }
    if let Some(reason) = &lead.reason_dead {
        println!("Reason dead: {reason}");
    }
    println!();
    println!("{:<22}{:<16}PAYLOAD", "AT", "KIND");
    for event in &detail.activity {
        println!(
            "{:<22}{:<16}{}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.kind,
            event.payload
        );
    }
    Ok(())
}

async fn run_set_status(
    pool: &sqlx::PgPool,
    handle: &str,
    update: &LeadUpdate,
    actor: String,
) -> anyhow::Result<()> {
    let repo = PgLeadRepository::new(pool.clone());
    let lead = update_lead(&repo, &SystemClock, handle, update, &Actor::Operator(actor))
        .await
        .map_err(not_found_hint)?;
    println!("{} is now {}", lead.handle(), lead.status);
    Ok(())
}

async fn run_dm(pool: &sqlx::PgPool, handle: &str) -> anyhow::Result<()> {
    let normalized = leadq_core::normalize_handle(handle);
    let lead = leadq_db::get_lead_by_handle(pool, &normalized)
        .await?
        .ok_or_else(|| anyhow::anyhow!("lead '{normalized}' not found"))?;
    println!(
        "{}",
        build_outreach_dm(lead.handle(), lead.niche_guess.as_deref())
    );
    Ok(())
}

/// Print lead counters.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_metrics(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let metrics = leadq_db::lead_metrics(pool, Utc::now()).await?;
    println!("total leads: {}", metrics.total);
    for row in &metrics.by_status {
        println!("  {:<12}{}", row.status, row.count);
    }
    println!("discovered (7d): {}", metrics.discovered_last_7_days);
    println!("contacted (7d): {}", metrics.contacted_last_7_days);
    println!("interested (7d): {}", metrics.interested_last_7_days);
    println!("closed (30d): {}", metrics.closed_last_30_days);
    Ok(())
}

fn not_found_hint(error: ReviewError) -> anyhow::Error {
    match error {
        ReviewError::NotFound(handle) => {
            anyhow::anyhow!("lead '{handle}' not found; check `leads list`")
        }
        other => other.into(),
    }
}

fn fmt_date(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "\u{2014}".to_string(),
        |d| d.format("%Y-%m-%d").to_string(),
    )
}
