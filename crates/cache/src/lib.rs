//! SQLite cache database for fetched music metadata.
//!
//! Callers describe what they want as a [`Query`](models::Query) (subject
//! type, artist, album, title, accepted providers, result count) and either
//! store freshly fetched [`Artifact`](models::Artifact)s under it or read
//! back the [`CacheEntry`](models::CacheEntry)s already stored for it.
//!
//! # Architecture
//! The database holds two kinds of table:
//! - **Dimensions**: artists, albums, titles, providers and image formats.
//!   Append-only, lower-cased, unique. Never cleaned up.
//! - **Metadata**: one row per stored artifact, referencing dimension rows.
//!   At most one row exists per (subject type, artifact type, checksum,
//!   source URL); many rows may answer the same query, ordered by rating.
//!
//! Which fields identify an artifact depends on its subject type (see
//! [`requirements`]). Which providers a lookup considers is decided by the
//! caller-supplied [`ProviderRegistry`].

mod constraint;
mod db;
pub mod error;
pub mod models;
pub mod provider;
pub mod requirements;
mod repo;
mod schema;

pub use crate::constraint::{Constraints, LinkFilter};
pub use crate::db::{DB_FILENAME, Database, Options};
pub use crate::provider::{ProviderRegistry, ProviderSelection, StaticRegistry};
pub use crate::repo::Repository;
pub use crate::schema::SCHEMA_VERSION;
