//! Server setup and initialization
//!
//! Provides the main application builder and server runner.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use noxly_cache::{LocalUsageFeed, RedisPool, RedisUsageFeed, SubscriberConfig, UsageFeed};
use noxly_common::{AppConfig, AppError, JwtService};
use noxly_core::SnowflakeGenerator;
use noxly_db::{
    create_pool, run_migrations, PgChallengeRepository, PgCouponRepository, PgPointRepository,
    PgStaffRepository, PgUsageRepository,
};
use noxly_service::{spawn_usage_sweeper, RedemptionSettings, ServiceContextBuilder};
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::apply_middleware;
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Result<Router, AppError> {
    let config = state.config();
    let router = apply_middleware(
        create_router(),
        &config.rate_limit,
        &config.cors,
        config.app.env.is_production(),
    )?;

    Ok(router.merge(health_routes()).with_state(state))
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    info!("Connecting to PostgreSQL...");
    let db_config = noxly_db::DatabaseConfig::from(&config.database);
    let pool = create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    if config.database.run_migrations {
        run_migrations(&pool, &config.database.migrations_dir)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }

    // Redis is only needed to share the usage feed between instances
    let (usage_feed, redis_pool): (Arc<dyn UsageFeed>, Option<RedisPool>) = match &config.redis {
        Some(redis_config) => {
            info!("Connecting to Redis...");
            let redis_pool =
                RedisPool::from_config(redis_config).map_err(|e| AppError::Cache(e.to_string()))?;
            let feed = RedisUsageFeed::start(redis_pool.clone(), SubscriberConfig::from(redis_config))
                .await
                .map_err(|e| AppError::Cache(e.to_string()))?;
            info!("Redis usage feed connected");
            (Arc::new(feed), Some(redis_pool))
        }
        None => {
            info!("REDIS_URL not set, usage feed stays in-process");
            (Arc::new(LocalUsageFeed::new()), None)
        }
    };

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));

    let snowflake_generator = Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id));

    let service_context = ServiceContextBuilder::new()
        .coupon_repo(Arc::new(PgCouponRepository::new(pool.clone())))
        .usage_repo(Arc::new(PgUsageRepository::new(pool.clone())))
        .point_repo(Arc::new(PgPointRepository::new(pool.clone())))
        .challenge_repo(Arc::new(PgChallengeRepository::new(pool.clone())))
        .staff_repo(Arc::new(PgStaffRepository::new(pool.clone())))
        .usage_feed(usage_feed)
        .jwt_service(jwt_service)
        .snowflake_generator(snowflake_generator)
        .settings(RedemptionSettings::from(&config.redemption))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let mut state = AppState::new(service_context, config).with_db_pool(pool);
    if let Some(redis_pool) = redis_pool {
        state = state.with_redis_pool(redis_pool);
    }

    Ok(state)
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .api
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid API_HOST/API_PORT: {}", e)))?;
    let sweep_period = Duration::from_secs(config.redemption.sweep_interval_seconds);

    let state = create_app_state(config).await?;
    let sweeper = spawn_usage_sweeper(state.service_context().clone(), sweep_period);

    let app = create_app(state)?;
    let result = run_server(app, addr).await;

    sweeper.abort();
    result
}
