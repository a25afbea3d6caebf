mod checksum;
mod entry;
mod field;
mod kind;
mod query;
mod row;

pub use self::checksum::{CHECKSUM_LEN, Checksum};
pub use self::entry::CacheEntry;
pub use self::field::{Field, FieldSet};
pub use self::kind::{ArtifactType, SubjectType};
pub use self::query::{Artifact, DEFAULT_LIMIT, Query};
pub(crate) use self::row::{IdentityRow, MetadataRow, unix_seconds};

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace(['/', '-', '_', ' '], "")
}
