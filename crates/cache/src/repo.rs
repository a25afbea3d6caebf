//! Read and write pipelines over stored artifacts.
//!
//! Every write runs inside one `BEGIN IMMEDIATE` transaction, so the write
//! lock is taken before the first statement and writers never deadlock on
//! lock upgrades. Reads run on any pooled connection.

use crate::constraint::{Constraints, dimension};
use crate::error::{ErrorKind, Result};
use crate::models::{Artifact, CacheEntry, Checksum, Field, IdentityRow, MetadataRow, Query, SubjectType, unix_seconds};
use crate::provider::{self, NO_PROVIDER, ProviderRegistry};
use crate::requirements::requirements;
use crate::schema;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::ops::ControlFlow;
use std::pin::pin;
use std::sync::Arc;
use time::UtcDateTime;
use tracing::{debug, error, instrument, warn};

/// Dimension values an artifact is stored under.
struct Dimensions {
    artist: Option<String>,
    album: Option<String>,
    title: Option<String>,
}
impl Dimensions {
    /// Rejects queries lacking any field their subject is stored under.
    fn for_insert(query: &Query) -> Result<Self> {
        if let Some(field) = requirements(query.subject).first_missing(|field| query.field(field).is_some()) {
            warn!(subject = %query.subject, %field, "refusing to store artifact without required field");
            exn::bail!(ErrorKind::MissingField(field));
        }
        Ok(Self {
            artist: dimension(query, Field::Artist),
            album: dimension(query, Field::Album),
            title: dimension(query, Field::Title),
        })
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Repository for storing and retrieving cached artifacts.
///
/// Lookups and deletes only see rows written by providers that the
/// [`ProviderRegistry`] knows for the query's subject and that the query
/// itself selects. A repository created with `dry_run` reads normally but
/// reports what its writes would have done without changing anything.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    registry: Arc<dyn ProviderRegistry>,
    dry_run: bool,
}
impl Debug for Repository {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Repository")
            .field("pool", &self.pool)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool, registry: Arc<dyn ProviderRegistry>, dry_run: bool) -> Self {
        Self { pool, registry, dry_run }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .inspect_err(|err| error!(error = %err, "could not acquire the write lock"))
            .or_raise(|| ErrorKind::Connection)
    }

    async fn commit(tx: Transaction<'static, Sqlite>) -> Result<()> {
        tx.commit()
            .await
            .inspect_err(|err| error!(error = %err, "could not commit transaction"))
            .or_raise(|| ErrorKind::Connection)
    }

    fn constraints(&self, query: &Query) -> Constraints {
        let enabled = provider::enabled(self.registry.as_ref(), query);
        Constraints::compile(query, &enabled)
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Store `artifact` as a result for `query`.
    ///
    /// Returns `false` if an identical artifact (same subject, artifact type,
    /// checksum and source URL) was already stored.
    #[instrument("inserting artifact", skip_all, fields(subject = %query.subject, kind = ?artifact.kind))]
    pub async fn insert(&self, query: &Query, artifact: &Artifact) -> Result<bool> {
        let dimensions = Dimensions::for_insert(query)?;
        if self.dry_run {
            debug!("dry run, not inserting");
            return Ok(false);
        }
        let mut tx = self.begin_write().await?;
        let stored = Self::write_artifact(&mut tx, query.subject, &dimensions, artifact).await;
        Self::commit(tx).await?;
        stored
    }

    /// Replace every stored artifact with `checksum` by `artifact` (if any).
    ///
    /// The delete always runs. If `query` lacks a field `artifact` must be
    /// stored under, the delete is still committed and `MissingField` is
    /// returned. Returns the number of rows removed.
    #[instrument("replacing artifact", skip_all, fields(subject = %query.subject, %checksum))]
    pub async fn replace(&self, checksum: &Checksum, query: &Query, artifact: Option<&Artifact>) -> Result<u64> {
        if self.dry_run {
            let (count,): (i64,) = sqlx::query_as(include_str!("../queries/count_by_checksum.sql"))
                .bind(&checksum.as_bytes()[..])
                .fetch_one(&self.pool)
                .await
                .or_raise(|| ErrorKind::Statement)?;
            debug!(count, "dry run, not replacing");
            return Ok(count.unsigned_abs());
        }
        let mut tx = self.begin_write().await?;
        let deleted = match sqlx::query(include_str!("../queries/delete_by_checksum.sql"))
            .bind(&checksum.as_bytes()[..])
            .execute(&mut *tx)
            .await
        {
            Ok(done) => done.rows_affected(),
            Err(err) => {
                error!(error = %err, "could not delete artifacts by checksum");
                return Err(err).or_raise(|| ErrorKind::Statement);
            },
        };
        let stored = match artifact {
            Some(artifact) => match Dimensions::for_insert(query) {
                Ok(dimensions) => {
                    Self::write_artifact(&mut tx, query.subject, &dimensions, artifact).await.map(|_| ())
                },
                Err(err) => Err(err),
            },
            None => Ok(()),
        };
        Self::commit(tx).await?;
        stored?;
        Ok(deleted)
    }

    /// Remove what `query` matches and store `artifacts` in its place.
    ///
    /// Nothing is stored unless at least one row was removed. The delete is
    /// committed even if `query` then turns out to lack a field the artifacts
    /// must be stored under. Returns the number of rows removed.
    #[instrument("editing artifacts", skip_all, fields(subject = %query.subject, count = artifacts.len()))]
    pub async fn edit(&self, query: &Query, artifacts: &[Artifact]) -> Result<u64> {
        let constraints = self.constraints(query);
        if self.dry_run {
            let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Connection)?;
            let matching = Self::matching_identities(&mut conn, &constraints, query.limit).await?;
            debug!(count = matching.len(), "dry run, not editing");
            return Ok(matching.len() as u64);
        }
        let mut tx = self.begin_write().await?;
        let deleted = Self::delete_matching(&mut tx, &constraints, query.limit).await?;
        let mut stored = Ok(());
        if deleted == 0 || artifacts.is_empty() {
            debug!(deleted, "nothing to store");
        } else {
            match Dimensions::for_insert(query) {
                Ok(dimensions) => {
                    for artifact in artifacts {
                        if let Err(err) = Self::write_artifact(&mut tx, query.subject, &dimensions, artifact).await {
                            stored = stored.and(Err(err));
                        }
                    }
                },
                Err(err) => stored = Err(err),
            }
        }
        Self::commit(tx).await?;
        stored?;
        Ok(deleted)
    }

    async fn write_artifact(
        conn: &mut SqliteConnection,
        subject: SubjectType,
        dimensions: &Dimensions,
        artifact: &Artifact,
    ) -> Result<bool> {
        let provider = artifact
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(NO_PROVIDER)
            .to_lowercase();
        let image_format = artifact.image_format.as_deref().map(str::to_lowercase);
        let values = [
            (include_str!("../queries/insert_artist.sql"), dimensions.artist.as_deref()),
            (include_str!("../queries/insert_album.sql"), dimensions.album.as_deref()),
            (include_str!("../queries/insert_title.sql"), dimensions.title.as_deref()),
            (include_str!("../queries/insert_provider.sql"), Some(provider.as_str())),
            (include_str!("../queries/insert_image_type.sql"), image_format.as_deref()),
        ];
        for (sql, value) in values {
            let Some(value) = value else { continue };
            if let Err(err) = sqlx::query(sql).bind(value).execute(&mut *conn).await {
                warn!(error = %err, value, "could not store dimension value");
            }
        }

        if artifact.source_url.is_none() {
            warn!("storing artifact without a source url");
        }
        if artifact.payload.is_none() {
            warn!("storing artifact without a payload");
        }
        let size = i64::try_from(artifact.size).or_raise(|| ErrorKind::InvalidData("data size"))?;
        let result = sqlx::query(include_str!("../queries/insert_metadata.sql"))
            .bind(dimensions.artist.as_deref())
            .bind(dimensions.album.as_deref())
            .bind(dimensions.title.as_deref())
            .bind(provider.as_str())
            .bind(artifact.source_url.as_deref())
            .bind(image_format.as_deref())
            .bind(artifact.duration.map(i64::from))
            .bind(subject.code())
            .bind(artifact.kind.code())
            .bind(size)
            .bind(i64::from(artifact.is_image))
            .bind(&artifact.checksum.as_bytes()[..])
            .bind(artifact.payload.as_deref())
            .bind(artifact.rating)
            .bind(unix_seconds(UtcDateTime::now()))
            .execute(&mut *conn)
            .await;
        match result {
            Ok(done) => {
                let stored = done.rows_affected() > 0;
                if !stored {
                    debug!(checksum = %artifact.checksum, "artifact already cached");
                }
                Ok(stored)
            },
            Err(err) => {
                error!(error = %err, "could not store artifact");
                Err(err).or_raise(|| ErrorKind::Statement)
            },
        }
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Remove up to `query.limit` stored artifacts matching `query`.
    ///
    /// Returns the number of rows removed.
    #[instrument("deleting artifacts", skip_all, fields(subject = %query.subject, limit = query.limit))]
    pub async fn delete(&self, query: &Query) -> Result<u64> {
        let constraints = self.constraints(query);
        if self.dry_run {
            let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Connection)?;
            let matching = Self::matching_identities(&mut conn, &constraints, query.limit).await?;
            debug!(count = matching.len(), "dry run, not deleting");
            return Ok(matching.len() as u64);
        }
        let mut tx = self.begin_write().await?;
        let deleted = Self::delete_matching(&mut tx, &constraints, query.limit).await?;
        Self::commit(tx).await?;
        Ok(deleted)
    }

    async fn matching_identities(
        conn: &mut SqliteConnection,
        constraints: &Constraints,
        limit: usize,
    ) -> Result<Vec<IdentityRow>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new(include_str!("../queries/select_identity.sql"));
        constraints.push_onto(&mut builder);
        builder.push(" ORDER BY m.rowid LIMIT ").push_bind(sql_limit(limit));
        builder
            .build_query_as::<IdentityRow>()
            .fetch_all(&mut *conn)
            .await
            .inspect_err(|err| error!(error = %err, "could not select artifacts to delete"))
            .or_raise(|| ErrorKind::Statement)
    }

    async fn delete_matching(conn: &mut SqliteConnection, constraints: &Constraints, limit: usize) -> Result<u64> {
        let identities = Self::matching_identities(conn, constraints, limit).await?;
        let mut deleted = 0;
        // NULL foreign keys must match with IS, a plain = never does.
        for identity in identities.into_iter().take(limit) {
            let result = sqlx::query(include_str!("../queries/delete_identity.sql"))
                .bind(identity.row_id)
                .bind(identity.get_type)
                .bind(identity.artist_id)
                .bind(identity.album_id)
                .bind(identity.title_id)
                .bind(identity.provider_id)
                .execute(&mut *conn)
                .await;
            match result {
                Ok(done) if done.rows_affected() > 0 => deleted += 1,
                Ok(_) => debug!(row = identity.row_id, "row already gone"),
                Err(err) => warn!(error = %err, row = identity.row_id, "could not delete artifact"),
            }
        }
        Ok(deleted)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Find up to `query.limit` stored artifacts for `query`, lowest rating
    /// first.
    ///
    /// Rows that cannot be decoded are skipped. If reading fails part way
    /// through, the entries read so far are returned.
    #[instrument("looking up artifacts", skip_all, fields(subject = %query.subject, limit = query.limit))]
    pub async fn lookup(&self, query: &Query) -> Result<Vec<CacheEntry>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let constraints = self.constraints(query);
        let mut builder = QueryBuilder::<Sqlite>::new(include_str!("../queries/select_metadata.sql"));
        constraints.push_onto(&mut builder);
        builder.push(" ORDER BY m.rowid LIMIT ").push_bind(sql_limit(query.limit));

        let mut conn = self
            .pool
            .acquire()
            .await
            .inspect_err(|err| error!(error = %err, "could not acquire a connection"))
            .or_raise(|| ErrorKind::Connection)?;
        let mut entries = Vec::new();
        let mut rows = builder.build().fetch(&mut *conn);
        while let Some(row) = rows.next().await {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    error!(error = %err, read = entries.len(), "lookup failed, returning partial result");
                    break;
                },
            };
            match MetadataRow::from_row(&row)
                .or_raise(|| ErrorKind::MalformedResult("row"))
                .and_then(CacheEntry::try_from)
            {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(error = ?err, "skipping malformed cache row"),
            }
            if entries.len() >= query.limit {
                break;
            }
        }
        // Stable: equal ratings keep primary-key order.
        entries.sort_by_key(|entry| entry.rating);
        Ok(entries)
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Every stored artifact with the query it answers, ordered by rating and
    /// then by insertion time.
    pub fn stream(&self) -> impl Stream<Item = Result<(Query, CacheEntry)>> + 'static {
        let pool = self.pool.clone();
        stream! {
            for await row in sqlx::query(include_str!("../queries/select_all.sql")).fetch(&pool) {
                yield match row {
                    Ok(row) => MetadataRow::from_row(&row)
                        .or_raise(|| ErrorKind::MalformedResult("row"))
                        .and_then(<(Query, CacheEntry)>::try_from),
                    Err(err) => Err(err).or_raise(|| ErrorKind::Statement),
                };
            }
        }
    }

    /// Call `visitor` for every stored artifact in [`stream`](Self::stream)
    /// order until it breaks.
    ///
    /// Malformed rows are skipped. Returns the number of visits.
    #[instrument("exporting artifacts", skip_all)]
    pub async fn for_each<F>(&self, mut visitor: F) -> Result<u64>
    where
        F: FnMut(&Query, &CacheEntry) -> ControlFlow<()>,
    {
        let mut rows = pin!(self.stream());
        let mut visited = 0;
        while let Some(row) = rows.next().await {
            match row {
                Ok((query, entry)) => {
                    visited += 1;
                    if visitor(&query, &entry).is_break() {
                        debug!(visited, "export stopped by visitor");
                        break;
                    }
                },
                Err(err) if matches!(*err, ErrorKind::MalformedResult(_)) => {
                    warn!(error = ?err, "skipping malformed cache row");
                },
                Err(err) => {
                    error!(error = ?err, visited, "export failed");
                    return Err(err);
                },
            }
        }
        Ok(visited)
    }

    // =========================================================================
    // Counts
    // =========================================================================

    /// Number of stored artifacts.
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(include_str!("../queries/count.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Statement)?;
        Ok(count.unsigned_abs())
    }

    pub async fn schema_version(&self) -> Result<i64> {
        schema::version(&self.pool).await
    }
}
