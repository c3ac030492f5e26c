use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seatdesk_api::{app, AppState, AuthConfig};
use seatdesk_booking::BookingService;
use seatdesk_core::SystemClock;
use seatdesk_store::{app_config::Config, DbClient, PgReservationLedger, PgSeatCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seatdesk_api=debug,seatdesk_booking=debug,seatdesk_store=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Seatdesk API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let clock = Arc::new(SystemClock::with_offset_minutes(config.venue.utc_offset_minutes));
    let ledger = Arc::new(PgReservationLedger::new(db.pool.clone(), clock.clone()));
    let catalog = Arc::new(PgSeatCatalog::new(db.pool.clone()));

    let app_state = AppState {
        bookings: Arc::new(BookingService::new(catalog, ledger, clock)),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, closing database pool");
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
