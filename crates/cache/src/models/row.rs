use crate::error::{Error, ErrorKind};
use crate::models::{ArtifactType, CacheEntry, Checksum, Query, SubjectType};
use exn::{OptionExt, ResultExt};
use time::UtcDateTime;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Fractional unix seconds, as stored in `metadata.timestamp`.
pub(crate) fn unix_seconds(at: UtcDateTime) -> f64 {
    at.unix_timestamp_nanos() as f64 / NANOS_PER_SECOND
}

fn from_unix_seconds(seconds: f64) -> Result<UtcDateTime, Error> {
    UtcDateTime::from_unix_timestamp_nanos((seconds * NANOS_PER_SECOND) as i128)
        .or_raise(|| ErrorKind::MalformedResult("timestamp"))
}

/// One `metadata` row joined to its dimension names.
///
/// Every column is nullable in the schema (databases written by older
/// versions may contain NULLs anywhere), so every column is optional here
/// and the conversion into [`CacheEntry`] decides what is acceptable.
#[derive(sqlx::FromRow)]
pub(crate) struct MetadataRow {
    pub(crate) artist_name: Option<String>,
    pub(crate) album_name: Option<String>,
    pub(crate) title_name: Option<String>,
    pub(crate) provider_name: Option<String>,
    pub(crate) source_url: Option<String>,
    pub(crate) image_type_name: Option<String>,
    pub(crate) track_duration: Option<i64>,
    pub(crate) get_type: Option<i64>,
    pub(crate) data_type: Option<i64>,
    pub(crate) data_size: Option<i64>,
    pub(crate) data_is_image: Option<i64>,
    pub(crate) data_checksum: Option<Vec<u8>>,
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) rating: Option<i64>,
    pub(crate) timestamp: Option<f64>,
}
impl MetadataRow {
    fn subject(&self) -> Result<SubjectType, Error> {
        SubjectType::try_from(self.get_type.ok_or_raise(|| ErrorKind::MalformedResult("subject type"))?)
    }
}
impl TryFrom<MetadataRow> for CacheEntry {
    type Error = Error;
    fn try_from(row: MetadataRow) -> Result<Self, Self::Error> {
        let subject = row.subject()?;
        Ok(Self {
            provider: row.provider_name.ok_or_raise(|| ErrorKind::MalformedResult("provider"))?,
            source_url: row.source_url,
            image_format: row.image_type_name,
            duration: row
                .track_duration
                .map(|d| u32::try_from(d).or_raise(|| ErrorKind::MalformedResult("track duration")))
                .transpose()?,
            subject,
            kind: ArtifactType::try_from(row.data_type.unwrap_or_default())?,
            size: u64::try_from(row.data_size.unwrap_or_default())
                .or_raise(|| ErrorKind::MalformedResult("data size"))?,
            is_image: row.data_is_image.is_some_and(|flag| flag != 0),
            checksum: Checksum::try_from(
                row.data_checksum
                    .as_deref()
                    .ok_or_raise(|| ErrorKind::MalformedResult("checksum"))?,
            )?,
            payload: row.data,
            rating: i32::try_from(row.rating.unwrap_or_default())
                .or_raise(|| ErrorKind::MalformedResult("rating"))?,
            timestamp: from_unix_seconds(row.timestamp.unwrap_or_default())?,
            cached: true,
        })
    }
}
impl TryFrom<MetadataRow> for (Query, CacheEntry) {
    type Error = Error;
    fn try_from(mut row: MetadataRow) -> Result<Self, Self::Error> {
        let mut query = Query::new(row.subject()?);
        query.artist = row.artist_name.take();
        query.album = row.album_name.take();
        query.title = row.title_name.take();
        let entry = CacheEntry::try_from(row)?;
        query.links_only = entry.kind == ArtifactType::ImageUrl;
        Ok((query, entry))
    }
}

/// The foreign-key identity of a `metadata` row, as enumerated by delete.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct IdentityRow {
    pub(crate) row_id: i64,
    pub(crate) get_type: Option<i64>,
    pub(crate) artist_id: Option<i64>,
    pub(crate) album_id: Option<i64>,
    pub(crate) title_id: Option<i64>,
    pub(crate) provider_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lyrics_row() -> MetadataRow {
        MetadataRow {
            artist_name: Some("radiohead".to_string()),
            album_name: None,
            title_name: Some("creep".to_string()),
            provider_name: Some("lyricswiki".to_string()),
            source_url: Some("https://lyrics.example.org/creep".to_string()),
            image_type_name: None,
            track_duration: Some(238),
            get_type: Some(SubjectType::Lyrics.code()),
            data_type: Some(ArtifactType::Lyrics.code()),
            data_size: Some(12),
            data_is_image: Some(0),
            data_checksum: Some(Checksum::of("when you were here").as_bytes().to_vec()),
            data: Some(b"when you were here".to_vec()),
            rating: Some(3),
            timestamp: Some(1_700_000_000.5),
        }
    }

    #[test]
    fn test_row_to_entry() {
        let entry = CacheEntry::try_from(lyrics_row()).unwrap();
        assert_eq!(entry.provider, "lyricswiki");
        assert_eq!(entry.subject, SubjectType::Lyrics);
        assert_eq!(entry.kind, ArtifactType::Lyrics);
        assert_eq!(entry.duration, Some(238));
        assert_eq!(entry.rating, 3);
        assert!(entry.cached);
        assert_eq!(entry.timestamp.unix_timestamp(), 1_700_000_000);
        assert!(entry.timestamp.nanosecond() > 0);
    }

    #[test]
    fn test_row_to_query_pair() {
        let (query, entry) = <(Query, CacheEntry)>::try_from(lyrics_row()).unwrap();
        assert_eq!(query.subject, SubjectType::Lyrics);
        assert_eq!(query.artist.as_deref(), Some("radiohead"));
        assert_eq!(query.album, None);
        assert_eq!(query.title.as_deref(), Some("creep"));
        assert!(!query.links_only);
        assert_eq!(entry.payload.as_deref(), Some(&b"when you were here"[..]));
    }

    #[test]
    fn test_row_with_short_checksum_is_malformed() {
        let mut row = lyrics_row();
        row.data_checksum = Some(vec![1, 2, 3]);
        let err = CacheEntry::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::MalformedResult("checksum width"));
    }

    #[test]
    fn test_row_with_unknown_subject_is_malformed() {
        let mut row = lyrics_row();
        row.get_type = Some(99);
        assert!(CacheEntry::try_from(row).is_err());
    }

    #[test]
    fn test_unix_seconds_round_trip() {
        let now = UtcDateTime::now();
        let back = from_unix_seconds(unix_seconds(now)).unwrap();
        // f64 only carries about a microsecond of precision at this magnitude.
        assert!((back - now).abs() < time::Duration::milliseconds(1));
    }
}
