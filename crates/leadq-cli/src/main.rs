mod jobs;
mod leads;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::jobs::JobsCommands;
use crate::leads::LeadsCommands;

#[derive(Debug, Parser)]
#[command(name = "leadq-cli")]
#[command(about = "Lead qualification pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database management commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run discovery and enrichment batches
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// Review and update leads
    Leads {
        #[command(subcommand)]
        command: LeadsCommands,
    },
    /// Print pipeline counters
    Metrics,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("leadq-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = leadq_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Discovery dry runs never touch the database.
    if let Commands::Jobs {
        command: JobsCommands::Discover { dry_run: true },
    } = command
    {
        return jobs::run_discover_dry_run(&config).await;
    }

    let pool_config = leadq_db::PoolConfig::from_app_config(&config);
    let pool = leadq_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                leadq_db::ping(&pool).await?;
                println!("database: ok");
            }
            DbCommands::Migrate => {
                let applied = leadq_db::run_migrations(&pool).await?;
                println!("migrations: {applied} applied");
            }
        },
        Commands::Jobs { command } => jobs::run_jobs_command(&pool, &config, command).await?,
        Commands::Leads { command } => leads::run_leads_command(&pool, command).await?,
        Commands::Metrics => leads::run_metrics(&pool).await?,
    }

    Ok(())
}
