mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use leadq_enrich::WebsiteFetcher;
use leadq_pipeline::{connector_from_config, JobConfig};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = leadq_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = leadq_db::PoolConfig::from_app_config(&config);
    let pool = leadq_db::connect_pool(&config.database_url, pool_config).await?;
    leadq_db::run_migrations(&pool).await?;

    let jobs = JobConfig::from_app_config(&config)?;
    let fetcher = WebsiteFetcher::new(config.fetch_timeout_secs, &config.user_agent)?;
    let state = AppState {
        pool,
        connector: Arc::from(connector_from_config(&config)?),
        enricher: Arc::new(fetcher),
        jobs: Arc::new(jobs),
    };

    let _scheduler =
        scheduler::build_scheduler(state.clone(), &config.discover_cron, &config.enrich_cron)
            .await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        leadq_core::Environment::Development
    ))?;
    let app = build_app(state, auth, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, "leadq-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
