//! Application state
//!
//! Holds the shared state for the Axum application including
//! the service context, configuration and the backing pools probed by
//! the readiness check.

use std::sync::Arc;

use noxly_cache::RedisPool;
use noxly_common::{AppConfig, JwtService};
use noxly_db::PgPool;
use noxly_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Service context containing all dependencies
    service_context: Arc<ServiceContext>,
    /// Application configuration
    config: Arc<AppConfig>,
    db_pool: Option<PgPool>,
    redis_pool: Option<RedisPool>,
}

impl AppState {
    /// Create a new AppState without backing pools
    pub fn new(service_context: ServiceContext, config: AppConfig) -> Self {
        Self {
            service_context: Arc::new(service_context),
            config: Arc::new(config),
            db_pool: None,
            redis_pool: None,
        }
    }

    /// Attach the PostgreSQL pool checked by readiness probes
    #[must_use]
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Attach the Redis pool checked by readiness probes
    #[must_use]
    pub fn with_redis_pool(mut self, pool: RedisPool) -> Self {
        self.redis_pool = Some(pool);
        self
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the JWT service from the service context
    pub fn jwt_service(&self) -> &JwtService {
        self.service_context.jwt_service()
    }

    pub fn db_pool(&self) -> Option<&PgPool> {
        self.db_pool.as_ref()
    }

    pub fn redis_pool(&self) -> Option<&RedisPool> {
        self.redis_pool.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &"ServiceContext")
            .field("config", &"AppConfig")
            .field("db_pool", &self.db_pool.is_some())
            .field("redis_pool", &self.redis_pool.is_some())
            .finish()
    }
}
