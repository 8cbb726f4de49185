//! # noxly-db
//!
//! Database layer implementing repository traits with PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! This crate provides PostgreSQL implementations for all repository traits
//! defined in `noxly-core`. It handles:
//!
//! - Connection pool management and migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - Repository implementations, with point movements inside the same
//!   transaction as the ledger change that causes them
//!
//! ## Usage
//!
//! ```rust,ignore
//! use noxly_db::pool::{create_pool, run_migrations, DatabaseConfig};
//! use noxly_db::repositories::PgUsageRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env();
//!     let pool = create_pool(&config).await?;
//!     run_migrations(&pool, "./migrations").await?;
//!     let usages = PgUsageRepository::new(pool);
//!
//!     // Use the repository...
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    PgChallengeRepository, PgCouponRepository, PgPointRepository, PgStaffRepository,
    PgUsageRepository,
};
