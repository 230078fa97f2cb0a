use medminder::channels::{EmailGateway, SmsGateway, SmtpEmailGateway, TwilioSmsGateway};
use medminder::db::ReminderStorage;
use medminder::service::scheduler;
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Refuse to start on a broken config or a missing admin key.
    let cfg = medminder::config::Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        listen_addr = %cfg.basic.listen_addr,
        tick_interval_secs = cfg.scheduler.tick_interval_secs,
        recurrence = ?cfg.scheduler.recurrence,
        loglevel = %cfg.basic.loglevel,
    );

    let storage = ReminderStorage::connect_with_retry(&cfg.basic.database_url).await?;

    let sms: Arc<dyn SmsGateway> = Arc::new(TwilioSmsGateway::new(&cfg.sms)?);
    let email: Arc<dyn EmailGateway> = Arc::new(SmtpEmailGateway::new(&cfg.email)?);
    if cfg.sms.account_sid.is_empty() || cfg.email.address.is_empty() {
        warn!("channel credentials are incomplete; sends will fail until configured");
    }

    let engine = Arc::new(medminder::ReminderEngine::build(
        storage,
        sms,
        email,
        &cfg.scheduler,
    ));

    let handle = scheduler::spawn(engine.clone(), cfg.scheduler.tick_interval()).await?;
    if cfg.scheduler.autostart {
        handle.start().await?;
    }

    // Build axum router and serve
    let state = medminder::router::MedminderState::new(
        engine,
        handle.clone(),
        Arc::from(cfg.basic.admin_key.as_str()),
    );
    let app = medminder::router::medminder_router(state);

    let listener = TcpListener::bind(cfg.basic.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // Let an in-flight tick finish before halting.
    if let Err(e) = handle.stop().await {
        warn!(error = %e, "scheduler did not stop cleanly");
    }
    handle.shutdown();
    Ok(())
}
