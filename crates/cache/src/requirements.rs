//! Which query fields each subject type depends on.

use crate::models::{Field, FieldSet, SubjectType};

/// Fields a subject type needs to identify a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    /// Must be present on every query for this subject.
    pub mandatory: FieldSet,
    /// Must be present to store an artifact; narrows lookups when present.
    pub optional: FieldSet,
}
impl Requirements {
    const fn new(mandatory: FieldSet, optional: FieldSet) -> Self {
        Self { mandatory, optional }
    }

    /// Every field that takes part in storage and matching.
    pub fn applicable(&self) -> FieldSet {
        self.mandatory.union(self.optional)
    }

    /// The first applicable field that `present` lacks.
    pub fn first_missing(&self, present: impl Fn(Field) -> bool) -> Option<Field> {
        self.applicable().iter().find(|field| !present(*field))
    }
}

const ARTIST: FieldSet = FieldSet::of(&[Field::Artist]);
const ARTIST_ALBUM: FieldSet = FieldSet::of(&[Field::Artist, Field::Album]);
const ARTIST_TITLE: FieldSet = FieldSet::of(&[Field::Artist, Field::Title]);
const ALBUM: FieldSet = FieldSet::of(&[Field::Album]);
const ALBUM_TITLE: FieldSet = FieldSet::of(&[Field::Album, Field::Title]);

/// Resolve the field requirements of `subject`.
pub fn requirements(subject: SubjectType) -> Requirements {
    use SubjectType::*;
    match subject {
        CoverArt | AlbumReview | Tracklist => Requirements::new(ARTIST_ALBUM, FieldSet::EMPTY),
        Lyrics => Requirements::new(ARTIST_TITLE, ALBUM),
        SimilarSongs | GuitarTabs => Requirements::new(ARTIST_TITLE, FieldSet::EMPTY),
        ArtistPhoto | ArtistBio | SimilarArtists | AlbumList | Backdrops => {
            Requirements::new(ARTIST, FieldSet::EMPTY)
        },
        Tags | Relations => Requirements::new(ARTIST, ALBUM_TITLE),
        Any => Requirements::new(FieldSet::EMPTY, FieldSet::EMPTY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const A: Field = Field::Artist;
    const B: Field = Field::Album;
    const T: Field = Field::Title;

    #[rstest]
    #[case(SubjectType::CoverArt, &[A, B], &[])]
    #[case(SubjectType::Lyrics, &[A, T], &[B])]
    #[case(SubjectType::ArtistPhoto, &[A], &[])]
    #[case(SubjectType::ArtistBio, &[A], &[])]
    #[case(SubjectType::SimilarArtists, &[A], &[])]
    #[case(SubjectType::SimilarSongs, &[A, T], &[])]
    #[case(SubjectType::AlbumReview, &[A, B], &[])]
    #[case(SubjectType::Tracklist, &[A, B], &[])]
    #[case(SubjectType::Tags, &[A], &[B, T])]
    #[case(SubjectType::Relations, &[A], &[B, T])]
    #[case(SubjectType::AlbumList, &[A], &[])]
    #[case(SubjectType::GuitarTabs, &[A, T], &[])]
    #[case(SubjectType::Backdrops, &[A], &[])]
    #[case(SubjectType::Any, &[], &[])]
    fn test_requirements_table(
        #[case] subject: SubjectType,
        #[case] mandatory: &[Field],
        #[case] optional: &[Field],
    ) {
        let req = requirements(subject);
        assert_eq!(req.mandatory, FieldSet::of(mandatory));
        assert_eq!(req.optional, FieldSet::of(optional));
    }

    #[test]
    fn test_mandatory_and_optional_are_disjoint() {
        for subject in SubjectType::ALL {
            let req = requirements(subject);
            assert!(req.mandatory.iter().all(|field| !req.optional.contains(field)), "{subject}");
        }
    }

    #[test]
    fn test_first_missing() {
        let req = requirements(SubjectType::Lyrics);
        assert_eq!(req.first_missing(|field| field != Field::Title), Some(Field::Title));
        assert_eq!(req.first_missing(|field| field != Field::Album), Some(Field::Album));
        assert_eq!(req.first_missing(|_| true), None);
        let req = requirements(SubjectType::ArtistBio);
        assert_eq!(req.first_missing(|field| field == Field::Artist), None);
        assert_eq!(requirements(SubjectType::Any).first_missing(|_| false), None);
    }
}
