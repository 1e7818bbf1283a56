//! Pool setup and the SQL behind each resource.
//!
//! Functions that issue a single statement take any SQLite executor; the
//! ones that need several statements take a `&mut SqliteConnection` so they
//! can run inside a caller's transaction.

pub mod addresses;
pub mod carts;
pub mod homes;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod sessions;
pub mod users;
pub mod wishlist;

use crate::errors::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
  let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
  let mut options = SqliteConnectOptions::from_str(database_url)?
    .create_if_missing(true)
    .foreign_keys(true);
  if !in_memory {
    options = options.journal_mode(SqliteJournalMode::Wal);
  }

  // Every connection to `:memory:` is its own database, so keep exactly one
  // alive for the lifetime of the pool.
  let pool_options = if in_memory {
    SqlitePoolOptions::new()
      .max_connections(1)
      .min_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
  } else {
    SqlitePoolOptions::new().max_connections(8)
  };

  let pool = pool_options.connect_with(options).await?;
  info!(in_memory, "Database pool ready.");
  Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
  sqlx::migrate!("./migrations").run(pool).await?;
  info!("Database migrations applied.");
  Ok(())
}
