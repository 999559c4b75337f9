//! Bloom filter over identifiers.
//!
//! A fixed-size bitmap answering "possibly present" or "definitely absent"
//! for an [`Id`]. Each identifier sets one bit per word of its digest
//! ([`Id::hashes`]), so no extra hashing is done. Filters of equal size
//! merge with bitwise or/and/xor, which makes them cheap to exchange as
//! summaries of an [`IdentifierSet`].
//!
//! A `Filter` is a plain value with no interior locking; share it behind
//! whatever synchronization the caller already uses.

use crate::error::FilterError;
use crate::id::Id;
use crate::set::IdentifierSet;
use core::fmt;
use core::hash::BuildHasher;

/// Bitmap size in bytes used by [`Filter::new`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// Bits reserved per expected identifier when sizing from a count.
pub const BITS_PER_ELEMENT: usize = 8;

/// Bitwise operation applied by [`Filter::merge`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MergeOp {
    Or,
    And,
    Xor,
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    bitmap: Vec<u8>,
}

impl Filter {
    /// Empty filter of [`DEFAULT_CAPACITY`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Empty filter of `bytes` bytes (at least one).
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bitmap: vec![0; bytes.max(1)],
        }
    }

    /// Empty filter sized for `n` identifiers at [`BITS_PER_ELEMENT`].
    pub fn for_count(n: usize) -> Self {
        Self::with_capacity((n * BITS_PER_ELEMENT).div_ceil(8))
    }

    /// Filter over an existing bitmap. An empty bitmap becomes one zero byte.
    pub fn from_bytes(bitmap: Vec<u8>) -> Self {
        if bitmap.is_empty() {
            return Self::with_capacity(1);
        }
        Self { bitmap }
    }

    /// Filter sized for and populated from `ids`.
    pub fn from_ids<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a Id>,
        I::IntoIter: ExactSizeIterator,
    {
        let ids = ids.into_iter();
        let mut filter = Self::for_count(ids.len());
        for id in ids {
            filter.insert(id);
        }
        filter
    }

    /// Filter summarizing the current members of `set`.
    ///
    /// Members are snapshotted under the set's read lock; the filter is
    /// built after the lock is released.
    pub fn from_set<S>(set: &IdentifierSet<Id, S>) -> Self
    where
        S: BuildHasher + Clone,
    {
        let members = set.keys();
        let filter = Self::from_ids(&members);
        log::trace!(
            "filter built from {} identifiers ({} bytes)",
            members.len(),
            filter.len()
        );
        filter
    }

    /// Size of the bitmap in bytes.
    pub fn len(&self) -> usize {
        self.bitmap.len()
    }

    pub fn bit_len(&self) -> usize {
        self.bitmap.len() * 8
    }

    /// True when no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bitmap.iter().all(|b| *b == 0)
    }

    /// Fraction of bits still unset, in `0.0..=1.0`.
    pub fn space(&self) -> f64 {
        let set: u32 = self.bitmap.iter().map(|b| b.count_ones()).sum();
        1.0 - set as f64 / self.bit_len() as f64
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bitmap
    }

    /// Bit at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bitmap
            .get(index / 8)
            .map(|byte| byte & (1u8 << (index % 8)) != 0)
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<(), FilterError> {
        let bits = self.bit_len();
        let byte = self
            .bitmap
            .get_mut(index / 8)
            .ok_or(FilterError::BitOutOfBounds { index, bits })?;
        let mask = 1u8 << (index % 8);
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        Ok(())
    }

    #[inline]
    fn slot(&self, hash: u32) -> (usize, u8) {
        let bit = hash as usize % self.bit_len();
        (bit / 8, 1u8 << (bit % 8))
    }

    pub fn insert(&mut self, id: &Id) {
        for h in id.hashes() {
            let (q, mask) = self.slot(h);
            self.bitmap[q] |= mask;
        }
    }

    /// Whether `id` may have been inserted. False positives are possible,
    /// false negatives are not.
    pub fn contains(&self, id: &Id) -> bool {
        id.hashes().all(|h| {
            let (q, mask) = self.slot(h);
            self.bitmap[q] & mask != 0
        })
    }

    /// `1` if `id` may be present, `0` otherwise.
    pub fn count(&self, id: &Id) -> usize {
        usize::from(self.contains(id))
    }

    /// Unsets every bit, keeping the size.
    pub fn clear(&mut self) {
        self.bitmap.fill(0);
    }

    /// Combines `other` into `self` bit by bit.
    pub fn merge_from(&mut self, other: &Filter, op: MergeOp) -> Result<(), FilterError> {
        if self.len() != other.len() {
            return Err(FilterError::SizeMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        for (a, b) in self.bitmap.iter_mut().zip(&other.bitmap) {
            match op {
                MergeOp::Or => *a |= b,
                MergeOp::And => *a &= b,
                MergeOp::Xor => *a ^= b,
            }
        }
        Ok(())
    }

    pub fn merge(&self, other: &Filter, op: MergeOp) -> Result<Filter, FilterError> {
        let mut out = self.clone();
        out.merge_from(other, op)?;
        Ok(out)
    }

    /// Lossless: equal to a filter built from the union of both inputs.
    pub fn union(&self, other: &Filter) -> Result<Filter, FilterError> {
        self.merge(other, MergeOp::Or)
    }

    /// May report more false positives than a filter built from the
    /// intersection directly.
    pub fn intersection(&self, other: &Filter) -> Result<Filter, FilterError> {
        self.merge(other, MergeOp::And)
    }

    pub fn symmetric_difference(&self, other: &Filter) -> Result<Filter, FilterError> {
        self.merge(other, MergeOp::Xor)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for Filter {
    fn as_ref(&self) -> &[u8] {
        &self.bitmap
    }
}

impl fmt::LowerHex for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.bitmap))
    }
}

/// Most significant bit first within each byte.
impl fmt::Binary for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.bitmap {
            write!(f, "{byte:08b}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(self, f)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("bytes", &self.len())
            .field("space", &self.space())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdKind;
    use proptest::prelude::*;

    fn md5(hex: &str) -> Id {
        hex.parse().unwrap()
    }

    #[test]
    fn new_filter_is_empty() {
        let f = Filter::new();
        assert_eq!(f.len(), DEFAULT_CAPACITY);
        assert!(f.is_empty());
        assert_eq!(f.space(), 1.0);
        assert!(!f.contains(&Id::zero(IdKind::Md5)));
        assert_eq!(f.count(&Id::zero(IdKind::Md5)), 0);
    }

    #[test]
    fn insert_then_contains() {
        let id = md5("d41d8cd98f00b204e9800998ecf8427e");
        let mut f = Filter::with_capacity(64);
        f.insert(&id);
        assert!(f.contains(&id));
        assert_eq!(f.count(&id), 1);
        assert!(!f.is_empty());
        // Four words set at most four bits.
        assert!(f.space() >= 1.0 - 4.0 / 512.0);

        f.clear();
        assert!(f.is_empty());
        assert_eq!(f.len(), 64);
        assert!(!f.contains(&id));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut f = Filter::with_capacity(0);
        assert_eq!(f.len(), 1);
        f.insert(&Id::zero(IdKind::Sha256));
        assert!(f.contains(&Id::zero(IdKind::Sha256)));
        assert_eq!(Filter::from_bytes(Vec::new()).len(), 1);
        assert_eq!(Filter::for_count(0).len(), 1);
        assert_eq!(Filter::for_count(3).len(), 3);
    }

    #[test]
    fn bit_access_and_rendering() {
        let mut f = Filter::with_capacity(2);
        assert_eq!(f.get(0), Some(false));
        f.set(0, true).unwrap();
        f.set(15, true).unwrap();
        assert_eq!(format!("{f}"), "0180");
        assert_eq!(format!("{f:b}"), "0000000110000000");
        f.set(15, false).unwrap();
        assert_eq!(f.as_bytes(), &[0x01, 0x00]);
        assert_eq!(f.get(16), None);
        assert_eq!(
            f.set(16, true),
            Err(FilterError::BitOutOfBounds { index: 16, bits: 16 })
        );
    }

    #[test]
    fn merges_require_equal_sizes() {
        let a_id = md5("00000000000000000000000000000001");
        let b_id = md5("00000000000000000000000000000102");
        let mut a = Filter::with_capacity(32);
        let mut b = Filter::with_capacity(32);
        a.insert(&a_id);
        b.insert(&b_id);

        let both = a.union(&b).unwrap();
        assert!(both.contains(&a_id) && both.contains(&b_id));
        let mut direct = Filter::with_capacity(32);
        direct.insert(&a_id);
        direct.insert(&b_id);
        assert_eq!(both, direct);

        assert!(a.symmetric_difference(&a).unwrap().is_empty());
        assert_eq!(a.intersection(&a).unwrap(), a);

        let small = Filter::with_capacity(16);
        assert_eq!(
            a.union(&small),
            Err(FilterError::SizeMismatch { left: 32, right: 16 })
        );
        assert_eq!(
            a.merge_from(&small, MergeOp::And),
            Err(FilterError::SizeMismatch { left: 32, right: 16 })
        );
    }

    #[test]
    fn from_set_covers_every_member() {
        let set: IdentifierSet<Id> = IdentifierSet::new();
        let ids: Vec<Id> = (0u8..50)
            .map(|n| Id::from_bytes(&[n; 20]).unwrap())
            .collect();
        for id in &ids {
            set.insert(*id).unwrap();
        }
        let f = Filter::from_set(&set);
        assert_eq!(f.len(), 50);
        assert!(ids.iter().all(|id| f.contains(id)));

        // An uninitialized set summarizes to an empty filter.
        let empty = Filter::from_set(&IdentifierSet::<Id>::uninit());
        assert!(empty.is_empty());
    }

    proptest! {
        #[test]
        fn prop_no_false_negatives(
            digests in proptest::collection::vec(any::<[u8; 20]>(), 0..200),
            bytes in 1usize..64,
        ) {
            let ids: Vec<Id> = digests.iter().map(|d| Id::from_bytes(d).unwrap()).collect();
            let mut f = Filter::with_capacity(bytes);
            for id in &ids {
                f.insert(id);
            }
            for id in &ids {
                prop_assert!(f.contains(id));
            }
        }
    }
}
