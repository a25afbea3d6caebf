use std::fmt::{Display, Formatter, Result as FmtResult};

/// An identifying dimension of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Artist,
    Album,
    Title,
}
impl Field {
    pub const ALL: [Field; 3] = [Self::Artist, Self::Album, Self::Title];

    const fn bit(self) -> u8 {
        match self {
            Self::Artist => 0b001,
            Self::Album => 0b010,
            Self::Title => 0b100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Title => "title",
        }
    }
}
impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A set of [`Field`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldSet(u8);
impl FieldSet {
    pub const EMPTY: FieldSet = FieldSet(0);

    pub const fn of(fields: &[Field]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < fields.len() {
            bits |= fields[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub const fn union(self, other: FieldSet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|field| self.contains(*field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set() {
        let set = FieldSet::of(&[Field::Artist, Field::Title]);
        assert!(set.contains(Field::Artist));
        assert!(!set.contains(Field::Album));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Field::Artist, Field::Title]);
        assert_eq!(set.union(FieldSet::of(&[Field::Album])), FieldSet::of(&Field::ALL));
        assert_eq!(FieldSet::EMPTY.iter().count(), 0);
    }
}
