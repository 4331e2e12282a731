mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use stockwatch_core::{Clock, Environment, SystemClock};
use stockwatch_notify::TwilioClient;
use stockwatch_scraper::SourceChain;
use stockwatch_tracker::{Notifier, SmsRoute, Tracker};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    scheduler::CheckScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = stockwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = Arc::new(stockwatch_core::load_catalog(&config.catalog_path)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sources = SourceChain::standard(&catalog, &config)?;
    tracing::info!(
        product = %catalog.product_name,
        stores = catalog.stores.len(),
        variants = catalog.variants.len(),
        sources = ?sources.names(),
        "catalog loaded"
    );

    let mut notifier = Notifier::new(
        Arc::clone(&catalog),
        Arc::clone(&clock),
        config.cooldown_minutes,
        config.max_notifications_per_day,
    );
    match &config.twilio {
        Some(twilio) => {
            let client = TwilioClient::from_config(twilio, config.request_timeout_secs)?;
            notifier = notifier.with_sender(Arc::new(client), SmsRoute::from(twilio));
        }
        None => tracing::warn!("Twilio credentials not set; SMS notifications disabled"),
    }

    let tracker = Arc::new(Tracker::new(
        catalog,
        sources,
        Arc::new(notifier),
        Arc::clone(&clock),
    ));

    let scheduler = Arc::new(
        CheckScheduler::new(
            Arc::clone(&tracker),
            clock,
            config.check_interval_minutes,
            config.check_enabled,
        )
        .await?,
    );
    if config.check_enabled {
        scheduler.start().await?;
    } else {
        tracing::info!("automatic checks disabled; use the control API to start them");
    }

    let auth = AuthState::from_env(matches!(config.env, Environment::Development))?;
    let state = AppState {
        tracker,
        scheduler: Arc::clone(&scheduler),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await?;
    Ok(())
}

/// Waits for ctrl-c or SIGTERM, then stops the scheduler before the server
/// drains in-flight requests.
async fn shutdown_signal(scheduler: Arc<CheckScheduler>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "scheduler did not shut down cleanly");
    }
}
