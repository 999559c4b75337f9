//! Error types for container and identifier operations.

use thiserror::Error;

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by [`IdentifierMap`](crate::IdentifierMap),
/// [`IdentifierSet`](crate::IdentifierSet) and their iterators.
///
/// A missing key is never an error: lookups return `None`, removals of
/// absent keys succeed, and iterator exhaustion is a plain `None`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The container has no live table (never initialized, or reset).
    #[error("container is not initialized")]
    Uninitialized,

    /// `init` was called on a container that is already live.
    #[error("container is already initialized")]
    AlreadyInitialized,

    /// `remove_current` without a preceding successful `next`, or twice
    /// for the same entry.
    #[error("iterator has no current entry")]
    NoCurrentEntry,
}

/// Failures parsing or constructing an [`Id`](crate::Id).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdError {
    /// Digest length is not one of the supported sizes (16, 20, 32 bytes).
    #[error("invalid identifier length: {0} bytes")]
    InvalidLength(usize),

    /// Input contained something other than hexadecimal digits.
    #[error("invalid identifier encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Failures from [`Filter`](crate::Filter) bit access and merging.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    /// Merging filters whose bitmaps differ in size.
    #[error("incompatible filter sizes: {left} and {right} bytes")]
    SizeMismatch { left: usize, right: usize },

    #[error("bit {index} is out of bounds for a {bits}-bit filter")]
    BitOutOfBounds { index: usize, bits: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(Error::Uninitialized.to_string(), "container is not initialized");
        assert_eq!(
            Error::AlreadyInitialized.to_string(),
            "container is already initialized"
        );
        assert_eq!(IdError::InvalidLength(3).to_string(), "invalid identifier length: 3 bytes");
        assert_eq!(
            FilterError::SizeMismatch { left: 8, right: 4 }.to_string(),
            "incompatible filter sizes: 8 and 4 bytes"
        );
    }
}
