use airtrainr::api::create_routes_with_hub;
use airtrainr::auth::AuthService;
use airtrainr::config::{run_migrations, AppConfig, DatabaseConfig, DatabaseSeeder};
use airtrainr::services::{BackgroundJobService, BookingService, MessageHub};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db_config = DatabaseConfig::from_env()?;
    let pool = db_config.create_pool().await?;
    info!("Connected to database");

    run_migrations(&pool).await?;
    info!("Database migrations applied");

    if config.seed_demo_data {
        DatabaseSeeder::new(pool.clone(), &config.jwt_secret).seed_all().await?;
    }

    let jobs = BackgroundJobService::new(
        BookingService::new(pool.clone(), config.platform_fee_percent),
        AuthService::new(pool.clone(), &config.jwt_secret),
    )
    .await?;
    jobs.start().await?;

    let app = create_routes_with_hub(pool, &config, MessageHub::new());

    let address = config.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!("AirTrainr server starting on http://{} ({})", address, config.environment);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    jobs.stop().await?;

    Ok(())
}
