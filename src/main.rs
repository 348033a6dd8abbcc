use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use energysaving_api::{
    api::{self, handlers::AppState},
    config::Config,
    controller::PowerCycleController,
    create_pool,
    repositories::{DevicesRepository, SavingsRepository, UsersRepository},
    scheduler::Scheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,energysaving_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting energysaving-api");

    let config = Config::load()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&config).await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("Database connection established");

    let devices_repository = Arc::new(DevicesRepository::new(pool.clone()));
    let users_repository = Arc::new(UsersRepository::new(pool.clone()));
    let savings_repository = Arc::new(SavingsRepository::new(pool.clone()));

    // Background power-cycle jobs
    let controller = Arc::new(PowerCycleController::new(
        pool.clone(),
        Duration::from_millis(config.scheduler.retry_backoff_ms),
    ));
    let scheduler_handle = Scheduler::new(controller, config.scheduler.clone()).start();

    let app_state = AppState {
        devices_repository,
        users_repository,
        savings_repository,
        auth: config.auth.clone(),
    };
    let app = api::create_router(app_state);

    let bind_addr = config.api_bind_address();
    tracing::info!("Starting API server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Let any in-flight sweep finish before exiting, even when the server
    // itself failed
    scheduler_handle.shutdown().await;
    serve_result?;

    tracing::info!("Application shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
