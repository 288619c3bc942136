mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(fairscore_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = fairscore_db::PoolConfig::from_app_config(&config);
    let pool = fairscore_db::connect_pool(&config.database_url, pool_config).await?;
    fairscore_db::run_migrations(&pool).await?;

    let mut scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&config)).await?;
    tracing::info!(cron = %config.schedule_cron, "scheduler started");

    shutdown_signal().await?;
    scheduler.shutdown().await?;
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    #[cfg(unix)]
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {},
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("received shutdown signal, stopping scheduler");
    Ok(())
}
