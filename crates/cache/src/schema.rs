//! Schema creation and version check.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use tracing::{debug, error, instrument};

/// The only on-disk layout this crate reads and writes.
pub const SCHEMA_VERSION: i64 = 2;

/// Create every table, index and seed row that is missing, then make sure
/// the stored version is one we understand.
///
/// Runs inside a single `BEGIN IMMEDIATE` transaction; calling it on an
/// up-to-date database changes nothing.
#[instrument("ensuring database schema", skip(pool))]
pub(crate) async fn ensure(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await.or_raise(|| ErrorKind::Connection)?;
    if let Err(err) = sqlx::raw_sql(include_str!("../queries/schema.sql")).execute(&mut *tx).await {
        error!(error = %err, "could not create database schema");
        return Err(err).or_raise(|| ErrorKind::Migration);
    }
    tx.commit().await.or_raise(|| ErrorKind::Connection)?;
    let found = version(pool).await?;
    if found != SCHEMA_VERSION {
        error!(found, expected = SCHEMA_VERSION, "unsupported database version");
        exn::bail!(ErrorKind::Migration);
    }
    debug!(version = found, "database schema ready");
    Ok(())
}

/// Highest version recorded in `db_version`.
pub(crate) async fn version(pool: &SqlitePool) -> Result<i64> {
    let (version,): (Option<i64>,) = sqlx::query_as(include_str!("../queries/schema_version.sql"))
        .fetch_one(pool)
        .await
        .or_raise(|| ErrorKind::Migration)?;
    version.ok_or_raise(|| ErrorKind::Migration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        ensure(db.pool()).await.unwrap();
        ensure(db.pool()).await.unwrap();
        let (seeds,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM image_types").fetch_one(db.pool()).await.unwrap();
        assert_eq!(seeds, 5);
        assert_eq!(version(db.pool()).await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_unsupported_version_is_rejected() {
        let db = Database::connect_in_memory().await.unwrap();
        sqlx::query("INSERT INTO db_version VALUES (3)").execute(db.pool()).await.unwrap();
        let err = ensure(db.pool()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Migration);
    }
}
