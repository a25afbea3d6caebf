use crate::models::{ArtifactType, Checksum, SubjectType};
use time::UtcDateTime;

/// An artifact as read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub provider: String,
    pub source_url: Option<String>,
    pub image_format: Option<String>,
    pub duration: Option<u32>,
    pub subject: SubjectType,
    pub kind: ArtifactType,
    pub size: u64,
    pub is_image: bool,
    pub checksum: Checksum,
    pub payload: Option<Vec<u8>>,
    pub rating: i32,
    /// When the artifact was stored.
    pub timestamp: UtcDateTime,
    /// Always `true` for entries produced by this crate; lets callers mixing
    /// fresh and cached results tell them apart.
    pub cached: bool,
}
