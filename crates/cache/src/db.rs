//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use crate::error::{ErrorKind, Result};
use crate::provider::ProviderRegistry;
use crate::{Repository, schema};

/// Name of the database file inside the cache root directory.
pub const DB_FILENAME: &str = "metadata.db";
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);
// Readers never block each other in WAL mode, and writers queue on the
// busy timeout anyway.
const MAX_CONNECTIONS: u32 = 5;

/// Tunables for [`Database::open_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// File name of the database inside the root directory.
    pub filename: String,
    /// How long a statement waits for another writer's lock before failing.
    pub busy_timeout: Duration,
    pub max_connections: u32,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            filename: DB_FILENAME.to_string(),
            busy_timeout: BUSY_TIMEOUT,
            max_connections: MAX_CONNECTIONS,
        }
    }
}

/// Database connection pool for the cache.
///
/// This is the main entry point for interacting with the cache database.
/// It manages the SQLite connection pool and hands out repositories.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Applies the query-based PRAGMAs to EVERY pooled connection,
            // not only the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.max(1))
            .connect_with(options)
            .await
            .inspect_err(|err| error!(error = %err, "could not open cache database"))
            .or_raise(|| ErrorKind::Connection)?;
        schema::ensure(&pool).await?;
        Ok(Self { pool })
    }

    /// Open (or create) the cache database inside the directory `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(root, &Options::default()).await
    }

    /// Open (or create) the cache database inside the directory `root`.
    ///
    /// The directory must already exist; only the database file is created.
    #[instrument("opening cache database", skip_all, fields(root = %root.as_ref().display()))]
    pub async fn open_with(root: impl AsRef<Path>, options: &Options) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            error!("cache root is not an existing directory");
            exn::bail!(ErrorKind::Connection);
        }
        let path: PathBuf = root.join(&options.filename);
        let connect = Self::base_options(options.busy_timeout).filename(&path).create_if_missing(true);
        let db = Self::new(connect, options.max_connections).await?;
        debug!(path = %path.display(), "cache database open");
        Ok(db)
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options(BUSY_TIMEOUT).filename(":memory:");
        // Parallel connections to ":memory:" would each see a different
        // database, so keep it to one.
        Self::new(options, 1).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options(busy_timeout: Duration) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Concurrent readers alongside the single writer.
            .journal_mode(SqliteJournalMode::Wal)
            // PRAGMA synchronous = NORMAL
            .synchronous(SqliteSynchronous::Normal)
            // Bounds every wait for another writer's lock.
            .busy_timeout(busy_timeout)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA temp_store = MEMORY;
                PRAGMA cache_size = -8192;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    ///
    /// This is useful for running custom queries or transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// A repository over this database, restricted to the providers known
    /// to `registry`.
    pub fn repository(&self, registry: Arc<dyn ProviderRegistry>) -> Repository {
        Repository::new(self.pool.clone(), registry, false)
    }

    /// Checkpoint the write-ahead log and close the pool.
    ///
    /// If the checkpoint cannot run (another connection still holds a lock)
    /// the pool is left open and the call may be retried.
    #[instrument("closing cache database", skip(self))]
    pub async fn close(&self) -> Result<()> {
        let checkpoint: sqlx::Result<(i64, i64, i64)> =
            sqlx::query_as(include_str!("../queries/checkpoint.sql")).fetch_one(&self.pool).await;
        match checkpoint {
            Ok((0, _, _)) => {},
            Ok((busy, log, checkpointed)) => {
                warn!(busy, log, checkpointed, "write-ahead log is busy, database left open");
                exn::bail!(ErrorKind::Connection);
            },
            Err(err) => {
                warn!(error = %err, "could not checkpoint the write-ahead log, database left open");
                return Err(err).or_raise(|| ErrorKind::Connection);
            },
        }
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
        Ok(())
    }
}
