//! Fixed-size content identifiers.
//!
//! An `Id` is the digest that names a piece of immutable content. The
//! containers only rely on `Hash + Eq`; this type is provided so callers
//! have a concrete key that hashes and compares over the digest bytes.

use crate::error::IdError;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::str::FromStr;

const MAX_LEN: usize = 32;

/// Digest algorithm inferred from the identifier length.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IdKind {
    Md5,
    Sha1,
    Sha256,
}

impl IdKind {
    /// Digest size in bytes.
    pub const fn len(self) -> usize {
        match self {
            IdKind::Md5 => 16,
            IdKind::Sha1 => 20,
            IdKind::Sha256 => 32,
        }
    }

    fn from_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(IdKind::Md5),
            20 => Some(IdKind::Sha1),
            32 => Some(IdKind::Sha256),
            _ => None,
        }
    }
}

/// Immutable digest of 16, 20 or 32 bytes.
#[derive(Copy, Clone)]
pub struct Id {
    bytes: [u8; MAX_LEN],
    kind: IdKind,
}

impl Id {
    /// All-zero identifier of the given kind.
    pub const fn zero(kind: IdKind) -> Self {
        Self {
            bytes: [0; MAX_LEN],
            kind,
        }
    }

    pub fn from_bytes(digest: &[u8]) -> Result<Self, IdError> {
        let kind = IdKind::from_len(digest.len()).ok_or(IdError::InvalidLength(digest.len()))?;
        let mut bytes = [0; MAX_LEN];
        bytes[..digest.len()].copy_from_slice(digest);
        Ok(Self { bytes, kind })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.kind.len()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kind.len()
    }

    /// Always false; kept for parity with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn kind(&self) -> IdKind {
        self.kind
    }

    /// The digest read as consecutive native-endian `u32` words: 4 for
    /// MD5, 5 for SHA-1, 8 for SHA-256. Digests are already uniformly
    /// distributed, so each word serves as an independent filter hash.
    pub fn hashes(&self) -> impl Iterator<Item = u32> + '_ {
        self.as_bytes()
            .chunks_exact(4)
            .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl TryFrom<&[u8]> for Id {
    type Error = IdError;

    fn try_from(digest: &[u8]) -> Result<Self, Self::Error> {
        Id::from_bytes(digest)
    }
}

impl FromStr for Id {
    type Err = IdError;

    /// Parses 32, 40 or 64 hexadecimal digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = hex::decode(s)?;
        Id::from_bytes(&digest)
    }
}

impl fmt::LowerHex for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(self, f)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({:?}:{})", self.kind, self)
    }
}
