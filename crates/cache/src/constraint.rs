//! Turns a sparse [`Query`] into SQL predicates.
//!
//! Compilation is pure; rendering appends predicate text to a
//! [`QueryBuilder`] and binds every caller-supplied value as a parameter.
//! The rendered text assumes the table aliases used by the `select_*.sql`
//! queries (`m`, `a`, `b`, `t`, `p`).

use crate::models::{ArtifactType, Field, Query};
use crate::provider::NO_PROVIDER;
use crate::requirements::requirements;
use sqlx::{QueryBuilder, Sqlite};

/// The lower-cased value of `field` if the query's subject stores it and the
/// query sets it.
pub(crate) fn dimension(query: &Query, field: Field) -> Option<String> {
    requirements(query.subject)
        .applicable()
        .contains(field)
        .then(|| query.field(field))
        .flatten()
        .map(str::to_lowercase)
}

/// Restriction on whether image rows are links or image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFilter {
    LinksOnly,
    DataOnly,
}

/// The predicates a query compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    pub subject: i64,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub link: Option<LinkFilter>,
    /// Lower-cased, always starting with [`NO_PROVIDER`] so artifacts stored
    /// without a provider stay visible.
    pub providers: Vec<String>,
}
impl Constraints {
    pub fn compile(query: &Query, enabled: &[String]) -> Self {
        let link = query.subject.is_image().then_some(if query.links_only {
            LinkFilter::LinksOnly
        } else {
            LinkFilter::DataOnly
        });
        let mut providers = vec![NO_PROVIDER.to_string()];
        for name in enabled.iter().map(|name| name.to_lowercase()) {
            if !providers.contains(&name) {
                providers.push(name);
            }
        }
        Self {
            subject: query.subject.code(),
            artist: dimension(query, Field::Artist),
            album: dimension(query, Field::Album),
            title: dimension(query, Field::Title),
            link,
            providers,
        }
    }

    /// Append ` WHERE ...` for these constraints to `builder`.
    pub fn push_onto(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE m.get_type = ").push_bind(self.subject);
        if let Some(artist) = &self.artist {
            builder.push(" AND a.artist_name = ").push_bind(artist.clone());
        }
        if let Some(album) = &self.album {
            builder.push(" AND b.album_name = ").push_bind(album.clone());
        }
        if let Some(title) = &self.title {
            builder.push(" AND t.title_name = ").push_bind(title.clone());
        }
        builder.push(" AND p.provider_name IN (");
        let mut list = builder.separated(", ");
        for provider in &self.providers {
            list.push_bind(provider.clone());
        }
        list.push_unseparated(")");
        match self.link {
            Some(LinkFilter::LinksOnly) => {
                builder.push(" AND m.data_type = ").push_bind(ArtifactType::ImageUrl.code());
            },
            Some(LinkFilter::DataOnly) => {
                builder.push(" AND NOT m.data_type = ").push_bind(ArtifactType::ImageUrl.code());
            },
            None => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectType;

    fn providers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_compile_lowercases_applicable_fields() {
        let query = Query::new(SubjectType::Lyrics).with_artist("Radiohead").with_title("Creep");
        let constraints = Constraints::compile(&query, &providers(&["LyricsWiki"]));
        assert_eq!(constraints.subject, SubjectType::Lyrics.code());
        assert_eq!(constraints.artist.as_deref(), Some("radiohead"));
        assert_eq!(constraints.album, None);
        assert_eq!(constraints.title.as_deref(), Some("creep"));
        assert_eq!(constraints.link, None);
        assert_eq!(constraints.providers, vec![NO_PROVIDER, "lyricswiki"]);
    }

    #[test]
    fn test_compile_ignores_inapplicable_fields() {
        let query = Query::new(SubjectType::ArtistBio)
            .with_artist("Björk")
            .with_album("Post")
            .with_title("Hyperballad");
        let constraints = Constraints::compile(&query, &[]);
        assert_eq!(constraints.artist.as_deref(), Some("björk"));
        assert_eq!(constraints.album, None);
        assert_eq!(constraints.title, None);
    }

    #[test]
    fn test_compile_always_includes_placeholder() {
        let query = Query::new(SubjectType::ArtistBio).with_artist("x");
        assert_eq!(Constraints::compile(&query, &[]).providers, vec![NO_PROVIDER]);
        let constraints = Constraints::compile(&query, &providers(&["LastFM", "none", "lastfm"]));
        assert_eq!(constraints.providers, vec![NO_PROVIDER, "lastfm"]);
    }

    #[test]
    fn test_compile_link_filter() {
        let query = Query::new(SubjectType::CoverArt).with_artist("a").with_album("b");
        assert_eq!(Constraints::compile(&query, &[]).link, Some(LinkFilter::DataOnly));
        let query = query.links_only(true);
        assert_eq!(Constraints::compile(&query, &[]).link, Some(LinkFilter::LinksOnly));
        let query = Query::new(SubjectType::Lyrics).links_only(true);
        assert_eq!(Constraints::compile(&query, &[]).link, None);
    }

    #[test]
    fn test_render_binds_every_value() {
        let query = Query::new(SubjectType::CoverArt)
            .with_artist("Guns N' Roses")
            .with_album("x'); DROP TABLE metadata; --")
            .links_only(true);
        let constraints = Constraints::compile(&query, &providers(&["lastfm", "amazon"]));
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT 1 FROM metadata AS m");
        constraints.push_onto(&mut builder);
        let sql = builder.sql();
        assert_eq!(
            sql,
            "SELECT 1 FROM metadata AS m WHERE m.get_type = ? AND a.artist_name = ? AND b.album_name = ? \
             AND p.provider_name IN (?, ?, ?) AND m.data_type = ?"
        );
        assert!(!sql.contains("roses"));
        assert!(!sql.contains("DROP"));
    }
}
