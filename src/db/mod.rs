//! Database layer
//!
//! SQLite access through `sqlx`: pool creation, embedded migrations and the
//! repository implementations used by the services.
//!
//! ```ignore
//! use motionhouse::config::DatabaseConfig;
//! use motionhouse::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, is_foreign_key_violation, ping, DbPool};
