use super::sanitize;
use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// What a query asks for.
///
/// Stored as `metadata.get_type`. The integer codes are part of the on-disk
/// format and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubjectType {
    CoverArt,
    Lyrics,
    ArtistPhoto,
    ArtistBio,
    SimilarArtists,
    SimilarSongs,
    AlbumReview,
    Tracklist,
    Tags,
    Relations,
    AlbumList,
    GuitarTabs,
    Backdrops,
    /// Type-agnostic wildcard. Requires no identifying fields.
    Any,
}
impl SubjectType {
    pub const ALL: [SubjectType; 14] = [
        Self::CoverArt,
        Self::Lyrics,
        Self::ArtistPhoto,
        Self::ArtistBio,
        Self::SimilarArtists,
        Self::SimilarSongs,
        Self::AlbumReview,
        Self::Tracklist,
        Self::Tags,
        Self::Relations,
        Self::AlbumList,
        Self::GuitarTabs,
        Self::Backdrops,
        Self::Any,
    ];

    pub fn code(&self) -> i64 {
        match self {
            Self::CoverArt => 1,
            Self::Lyrics => 2,
            Self::ArtistPhoto => 3,
            Self::ArtistBio => 4,
            Self::SimilarArtists => 5,
            Self::SimilarSongs => 6,
            Self::AlbumReview => 7,
            Self::Tracklist => 8,
            Self::Tags => 9,
            Self::Relations => 10,
            Self::AlbumList => 11,
            Self::GuitarTabs => 12,
            Self::Backdrops => 13,
            Self::Any => 14,
        }
    }

    /// Subjects whose artifacts are images, and which may therefore be
    /// stored either as raw image data or as a link to it.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::CoverArt | Self::ArtistPhoto | Self::Backdrops)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoverArt => "cover_art",
            Self::Lyrics => "lyrics",
            Self::ArtistPhoto => "artist_photo",
            Self::ArtistBio => "artist_bio",
            Self::SimilarArtists => "similar_artists",
            Self::SimilarSongs => "similar_songs",
            Self::AlbumReview => "album_review",
            Self::Tracklist => "tracklist",
            Self::Tags => "tags",
            Self::Relations => "relations",
            Self::AlbumList => "album_list",
            Self::GuitarTabs => "guitar_tabs",
            Self::Backdrops => "backdrops",
            Self::Any => "any",
        }
    }
}
impl TryFrom<i64> for SubjectType {
    type Error = Error;
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|subject| subject.code() == code)
            .ok_or_else(|| Error::new(ErrorKind::MalformedResult("subject type")))
    }
}
impl FromStr for SubjectType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "cover" | "coverart" | "covers" => Self::CoverArt,
            "lyrics" | "lyric" => Self::Lyrics,
            "artistphoto" | "artistphotos" | "photos" => Self::ArtistPhoto,
            "artistbio" | "bio" | "biography" => Self::ArtistBio,
            "similarartists" | "similarartist" => Self::SimilarArtists,
            "similarsongs" | "similarsong" => Self::SimilarSongs,
            "albumreview" | "review" => Self::AlbumReview,
            "tracklist" | "tracks" => Self::Tracklist,
            "tags" | "tag" => Self::Tags,
            "relations" | "relation" => Self::Relations,
            "albumlist" | "albums" => Self::AlbumList,
            "guitartabs" | "guitartab" | "tabs" => Self::GuitarTabs,
            "backdrops" | "backdrop" => Self::Backdrops,
            "any" | "all" => Self::Any,
            _ => exn::bail!(ErrorKind::InvalidData("subject type")),
        })
    }
}
impl Display for SubjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// What kind of payload a stored row holds.
///
/// Stored as `metadata.data_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactType {
    Unknown,
    Lyrics,
    AlbumReview,
    ArtistPhoto,
    CoverArt,
    ArtistBio,
    SimilarArtist,
    SimilarSong,
    AlbumList,
    Tag,
    TagArtist,
    TagAlbum,
    TagTitle,
    Relation,
    /// A link to an image rather than the image itself.
    ImageUrl,
    TextUrl,
    Track,
    GuitarTab,
    Backdrop,
}
impl ArtifactType {
    const ALL: [ArtifactType; 19] = [
        Self::Unknown,
        Self::Lyrics,
        Self::AlbumReview,
        Self::ArtistPhoto,
        Self::CoverArt,
        Self::ArtistBio,
        Self::SimilarArtist,
        Self::SimilarSong,
        Self::AlbumList,
        Self::Tag,
        Self::TagArtist,
        Self::TagAlbum,
        Self::TagTitle,
        Self::Relation,
        Self::ImageUrl,
        Self::TextUrl,
        Self::Track,
        Self::GuitarTab,
        Self::Backdrop,
    ];

    pub fn code(&self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Lyrics => 1,
            Self::AlbumReview => 2,
            Self::ArtistPhoto => 3,
            Self::CoverArt => 4,
            Self::ArtistBio => 5,
            Self::SimilarArtist => 6,
            Self::SimilarSong => 7,
            Self::AlbumList => 8,
            Self::Tag => 9,
            Self::TagArtist => 10,
            Self::TagAlbum => 11,
            Self::TagTitle => 12,
            Self::Relation => 13,
            Self::ImageUrl => 14,
            Self::TextUrl => 15,
            Self::Track => 16,
            Self::GuitarTab => 17,
            Self::Backdrop => 18,
        }
    }
}
impl TryFrom<i64> for ArtifactType {
    type Error = Error;
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| Error::new(ErrorKind::MalformedResult("artifact type")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cover", SubjectType::CoverArt)]
    #[case("Cover Art", SubjectType::CoverArt)]
    #[case("cover_art", SubjectType::CoverArt)]
    #[case("LYRICS", SubjectType::Lyrics)]
    #[case("artist-photos", SubjectType::ArtistPhoto)]
    #[case("guitartabs", SubjectType::GuitarTabs)]
    #[case("any", SubjectType::Any)]
    fn test_subject_from_str(#[case] input: &str, #[case] expected: SubjectType) {
        assert_eq!(input.parse::<SubjectType>().unwrap(), expected);
    }

    #[test]
    fn test_subject_from_str_invalid() {
        assert!("podcast".parse::<SubjectType>().is_err());
    }

    #[test]
    fn test_subject_display_parses_back() {
        for subject in SubjectType::ALL {
            assert_eq!(subject.to_string().parse::<SubjectType>().unwrap(), subject);
        }
    }

    #[test]
    fn test_codes_are_unique() {
        for subject in SubjectType::ALL {
            assert_eq!(SubjectType::try_from(subject.code()).unwrap(), subject);
        }
        for kind in ArtifactType::ALL {
            assert_eq!(ArtifactType::try_from(kind.code()).unwrap(), kind);
        }
    }

    #[rstest]
    #[case(0)]
    #[case(15)]
    #[case(-1)]
    fn test_unknown_subject_code(#[case] code: i64) {
        let err = SubjectType::try_from(code).unwrap_err();
        assert_eq!(*err, ErrorKind::MalformedResult("subject type"));
    }

    #[test]
    fn test_image_subjects() {
        let images: Vec<_> = SubjectType::ALL.into_iter().filter(SubjectType::is_image).collect();
        assert_eq!(images, vec![SubjectType::CoverArt, SubjectType::ArtistPhoto, SubjectType::Backdrops]);
    }
}
