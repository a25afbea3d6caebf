//! Provider enablement.
//!
//! The cache never talks to providers itself, but lookups and deletes are
//! restricted to rows written by providers that are both registered for the
//! subject and selected by the query. Which providers exist is supplied by
//! the caller through [`ProviderRegistry`].

use crate::error::Error;
use crate::models::{Query, SubjectType};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Name stored for artifacts without a provider, and the placeholder used
/// when no provider is enabled at all.
pub const NO_PROVIDER: &str = "none";

/// Knows which providers can produce artifacts for a subject type.
pub trait ProviderRegistry: Send + Sync {
    /// Names of every provider registered for `subject`, including the ones
    /// registered for [`SubjectType::Any`].
    fn providers_for(&self, subject: SubjectType) -> Vec<String>;
}

/// In-memory [`ProviderRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRegistry {
    providers: BTreeMap<SubjectType, Vec<String>>,
}
impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` (case-insensitive) for `subject`.
    pub fn register(&mut self, subject: SubjectType, name: impl AsRef<str>) -> &mut Self {
        let name = name.as_ref().trim().to_lowercase();
        let names = self.providers.entry(subject).or_default();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
        self
    }

    pub fn with(mut self, subject: SubjectType, name: impl AsRef<str>) -> Self {
        self.register(subject, name);
        self
    }
}
impl ProviderRegistry for StaticRegistry {
    fn providers_for(&self, subject: SubjectType) -> Vec<String> {
        let mut names = self.providers.get(&subject).cloned().unwrap_or_default();
        if subject != SubjectType::Any {
            for name in self.providers.get(&SubjectType::Any).into_iter().flatten() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}
impl<S: AsRef<str>> FromIterator<(SubjectType, S)> for StaticRegistry {
    fn from_iter<I: IntoIterator<Item = (SubjectType, S)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (subject, name) in iter {
            registry.register(subject, name);
        }
        registry
    }
}

/// Which providers a query accepts results from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProviderSelection {
    #[default]
    All,
    /// Lower-cased provider names.
    Only(Vec<String>),
}
impl ProviderSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Only(
            names
                .into_iter()
                .map(|name| name.as_ref().trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    pub fn allows(&self, provider: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|name| name.eq_ignore_ascii_case(provider)),
        }
    }
}
impl FromStr for ProviderSelection {
    type Err = Error;
    /// Parse a `;`-separated list of provider names. `all` anywhere in the
    /// list selects every provider.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let names: Vec<&str> = s.split(';').map(str::trim).filter(|name| !name.is_empty()).collect();
        if names.iter().any(|name| name.eq_ignore_ascii_case("all")) {
            return Ok(Self::All);
        }
        Ok(Self::only(names))
    }
}
impl Display for ProviderSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(names) => f.write_str(&names.join(";")),
        }
    }
}

/// Providers registered for the query's subject that the query also selects.
pub fn enabled(registry: &dyn ProviderRegistry, query: &Query) -> Vec<String> {
    registry
        .providers_for(query.subject)
        .into_iter()
        .filter(|name| query.providers.allows(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn registry() -> StaticRegistry {
        [
            (SubjectType::Lyrics, "LyricsWiki"),
            (SubjectType::Lyrics, "musixmatch"),
            (SubjectType::CoverArt, "lastfm"),
            (SubjectType::Any, "local"),
        ]
        .into_iter()
        .collect()
    }

    #[rstest]
    #[case("all", ProviderSelection::All)]
    #[case("ALL", ProviderSelection::All)]
    #[case("lyricswiki;all", ProviderSelection::All)]
    #[case("lyricswiki", ProviderSelection::Only(vec!["lyricswiki".into()]))]
    #[case("LyricsWiki; musixmatch;", ProviderSelection::Only(vec!["lyricswiki".into(), "musixmatch".into()]))]
    #[case("", ProviderSelection::Only(vec![]))]
    fn test_selection_from_str(#[case] input: &str, #[case] expected: ProviderSelection) {
        assert_eq!(input.parse::<ProviderSelection>().unwrap(), expected);
    }

    #[test]
    fn test_registry_includes_any() {
        let registry = registry();
        assert_eq!(registry.providers_for(SubjectType::Lyrics), vec!["lyricswiki", "musixmatch", "local"]);
        assert_eq!(registry.providers_for(SubjectType::Backdrops), vec!["local"]);
        assert_eq!(registry.providers_for(SubjectType::Any), vec!["local"]);
    }

    #[test]
    fn test_registry_ignores_duplicates() {
        let registry = StaticRegistry::new().with(SubjectType::Lyrics, "a").with(SubjectType::Lyrics, "A");
        assert_eq!(registry.providers_for(SubjectType::Lyrics), vec!["a"]);
    }

    #[test]
    fn test_enabled_filters_by_selection() {
        let registry = registry();
        let query = Query::new(SubjectType::Lyrics).with_providers("MUSIXMATCH;local".parse().unwrap());
        assert_eq!(enabled(&registry, &query), vec!["musixmatch", "local"]);
        let query = Query::new(SubjectType::Lyrics).with_providers("lastfm".parse().unwrap());
        assert!(enabled(&registry, &query).is_empty());
    }
}
