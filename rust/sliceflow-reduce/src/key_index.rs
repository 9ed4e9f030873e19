//! Hash index from key hashes to rows of a frame.

use std::{
    collections::HashMap,
    hash::{BuildHasherDefault, Hasher},
};

use tinyvec::TinyVec;

/// A hasher that passes pre-computed 32-bit key hashes through unchanged.
///
/// Keys stored in a [`KeyIndex`] are already well-distributed hashes produced
/// by the key type's ops, so hashing them again would only cost time.
#[derive(Default)]
pub struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline]
    fn write(&mut self, _: &[u8]) {
        unimplemented!("IdentityHasher is only implemented for u32 keys");
    }

    #[inline]
    fn write_u32(&mut self, n: u32) {
        // Spread the 32 bits over the high half too; hashbrown takes its
        // control bits from the top of the hash.
        self.0 = (n as u64) | ((n as u64) << 32);
    }
}

/// Rows sharing one key hash. Almost always a single row.
pub type Bucket = TinyVec<[usize; 2]>;

/// Maps a key hash to the rows whose key produced that hash.
///
/// The index knows nothing about keys themselves: callers resolve hash
/// collisions by comparing the keys of the rows in a bucket.
#[derive(Default)]
pub struct KeyIndex {
    buckets: HashMap<u32, Bucket, BuildHasherDefault<IdentityHasher>>,
}

impl KeyIndex {
    pub fn new() -> KeyIndex {
        KeyIndex::default()
    }

    /// Returns the rows recorded under `hash`, if any.
    pub fn rows(&self, hash: u32) -> &[usize] {
        match self.buckets.get(&hash) {
            Some(bucket) => bucket.as_slice(),
            None => &[],
        }
    }

    /// Records `row` under `hash`.
    pub fn insert(&mut self, hash: u32, row: usize) {
        self.buckets.entry(hash).or_default().push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_hasher() {
        let mut hasher = IdentityHasher::default();
        hasher.write_u32(0xdead_beef);
        assert_eq!(hasher.finish(), 0xdead_beef_dead_beef);
    }

    #[test]
    fn test_collisions_share_bucket() {
        let mut index = KeyIndex::new();
        assert!(index.rows(7).is_empty());
        index.insert(7, 0);
        index.insert(9, 1);
        index.insert(7, 2);
        index.insert(7, 3);
        assert_eq!(index.rows(7), &[0, 2, 3]);
        assert_eq!(index.rows(9), &[1]);
        assert!(index.rows(8).is_empty());
    }
}
