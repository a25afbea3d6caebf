use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};

pub const CHECKSUM_LEN: usize = 16;

/// Fixed-width digest over an artifact payload.
///
/// Part of the deduplication identity of a stored artifact. The cache never
/// verifies it against the payload; whatever the fetch layer computed is
/// stored as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Checksum([u8; CHECKSUM_LEN]);
impl Checksum {
    /// Truncated BLAKE3 digest of `data`.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        let hash = blake3::hash(data.as_ref());
        let mut bytes = [0u8; CHECKSUM_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..CHECKSUM_LEN]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LEN] {
        &self.0
    }
}
impl From<[u8; CHECKSUM_LEN]> for Checksum {
    fn from(bytes: [u8; CHECKSUM_LEN]) -> Self {
        Self(bytes)
    }
}
impl TryFrom<&[u8]> for Checksum {
    type Error = Error;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; CHECKSUM_LEN] =
            bytes.try_into().map_err(|_| Error::new(ErrorKind::MalformedResult("checksum width")))?;
        Ok(Self(bytes))
    }
}
impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
