use crate::models::{ArtifactType, Checksum, Field, SubjectType};
use crate::provider::ProviderSelection;

/// Number of results a query asks for when no limit is given.
pub const DEFAULT_LIMIT: usize = 1;

/// Describes what the caller is looking for.
///
/// Which of `artist`, `album` and `title` matter depends on the subject type
/// (see [`requirements`](crate::requirements)). Empty strings are treated as
/// absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub subject: SubjectType,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    /// Which providers the caller is willing to accept results from.
    pub providers: ProviderSelection,
    /// Upper bound on results returned (lookup) or rows removed (delete).
    pub limit: usize,
    /// For image subjects: only links to images (`true`), or only the image
    /// data itself (`false`).
    pub links_only: bool,
}
impl Query {
    pub fn new(subject: SubjectType) -> Self {
        Self {
            subject,
            artist: None,
            album: None,
            title: None,
            providers: ProviderSelection::All,
            limit: DEFAULT_LIMIT,
            links_only: false,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_providers(mut self, providers: ProviderSelection) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn links_only(mut self, links_only: bool) -> Self {
        self.links_only = links_only;
        self
    }

    /// The value of `field`, if set to something non-empty.
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Artist => self.artist.as_deref(),
            Field::Album => self.album.as_deref(),
            Field::Title => self.title.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// A fetched artifact, as handed over by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Name of the provider that produced the artifact. Stored as `"none"`
    /// when unset.
    pub provider: Option<String>,
    pub source_url: Option<String>,
    pub image_format: Option<String>,
    /// Track duration in seconds, for artifacts describing a track.
    pub duration: Option<u32>,
    pub kind: ArtifactType,
    pub size: u64,
    pub is_image: bool,
    pub checksum: Checksum,
    /// Raw payload. `None` for link-only artifacts.
    pub payload: Option<Vec<u8>>,
    pub rating: i32,
    /// How many fetches the provider liked to run in parallel. Informational
    /// only, never persisted.
    pub parallelism_hint: u32,
}
impl Artifact {
    /// Create an artifact holding `payload`, with size and checksum derived
    /// from it.
    pub fn new(kind: ArtifactType, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        Self {
            provider: None,
            source_url: None,
            image_format: None,
            duration: None,
            kind,
            size: payload.len() as u64,
            is_image: false,
            checksum: Checksum::of(&payload),
            payload: Some(payload),
            rating: 0,
            parallelism_hint: 1,
        }
    }

    /// Create a link-only artifact pointing at `url`.
    pub fn link(kind: ArtifactType, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            provider: None,
            size: url.len() as u64,
            checksum: Checksum::of(url.as_bytes()),
            source_url: Some(url),
            image_format: None,
            duration: None,
            kind,
            is_image: false,
            payload: None,
            rating: 0,
            parallelism_hint: 1,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_image_format(mut self, format: impl Into<String>) -> Self {
        self.image_format = Some(format.into());
        self.is_image = true;
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = checksum;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_absent() {
        let query = Query::new(SubjectType::Lyrics).with_artist("").with_title("Creep");
        assert_eq!(query.field(Field::Artist), None);
        assert_eq!(query.field(Field::Title), Some("Creep"));
        assert_eq!(query.field(Field::Album), None);
    }

    #[test]
    fn test_artifact_derives_size_and_checksum() {
        let artifact = Artifact::new(ArtifactType::Lyrics, "la la la");
        assert_eq!(artifact.size, 8);
        assert_eq!(artifact.checksum, Checksum::of("la la la"));
        assert!(!artifact.is_image);
    }

    #[test]
    fn test_link_artifact_has_no_payload() {
        let artifact = Artifact::link(ArtifactType::ImageUrl, "https://example.org/cover.jpg");
        assert_eq!(artifact.payload, None);
        assert_eq!(artifact.source_url.as_deref(), Some("https://example.org/cover.jpg"));
    }
}
