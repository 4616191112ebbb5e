use core::hash::BuildHasher;
use core::hash::Hasher;

/// Maps a key to a bucket index for a table with a given number of buckets.
///
/// Implementations must be deterministic: the same `key` and `capacity` must
/// always produce the same index, and the index must lie in `0..capacity`.
/// The table re-invokes the hasher with the new capacity every time it grows,
/// so the result has to be a function of `capacity` rather than of a capacity
/// remembered from an earlier call.
///
/// Any `Fn(&[u8], usize) -> usize` is a `BucketHasher`:
///
/// ```rust
/// use blob_table::BucketHasher;
///
/// let first_byte = |key: &[u8], capacity: usize| {
///     key.first().map_or(0, |&b| b as usize) % capacity
/// };
/// assert_eq!(first_byte.bucket_index(b"\x0bcd", 8), 3);
/// ```
pub trait BucketHasher {
    /// Returns the bucket index of `key` in a table of `capacity` buckets.
    fn bucket_index(&self, key: &[u8], capacity: usize) -> usize;
}

impl<F> BucketHasher for F
where
    F: Fn(&[u8], usize) -> usize,
{
    #[inline]
    fn bucket_index(&self, key: &[u8], capacity: usize) -> usize {
        self(key, capacity)
    }
}

/// Adapts a [`BuildHasher`] into a [`BucketHasher`].
///
/// Every call hashes the key bytes with a freshly built hasher and reduces the
/// 64-bit result modulo the capacity. The adapter is only as deterministic as
/// the wrapped builder: builders with per-instance random keys (such as
/// `RandomState`) are fine, since the keys are fixed once the builder exists.
///
/// # Examples
///
/// ```rust
/// use blob_table::BucketHasher;
/// use blob_table::bucket_hasher::BuildHasherIndex;
/// use siphasher::sip::SipHasher;
/// # use core::hash::BuildHasherDefault;
///
/// let hasher = BuildHasherIndex::new(BuildHasherDefault::<SipHasher>::default());
/// let index = hasher.bucket_index(b"key", 16);
/// assert!(index < 16);
/// assert_eq!(index, hasher.bucket_index(b"key", 16));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildHasherIndex<S> {
    hash_builder: S,
}

impl<S> BuildHasherIndex<S> {
    /// Wraps `hash_builder`.
    pub const fn new(hash_builder: S) -> Self {
        Self { hash_builder }
    }

    /// Returns a reference to the wrapped hash builder.
    pub fn hash_builder(&self) -> &S {
        &self.hash_builder
    }
}

impl<S> BucketHasher for BuildHasherIndex<S>
where
    S: BuildHasher,
{
    #[inline]
    fn bucket_index(&self, key: &[u8], capacity: usize) -> usize {
        let mut hasher = self.hash_builder.build_hasher();
        hasher.write(key);
        (hasher.finish() % capacity as u64) as usize
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hash builder used by [`DefaultBucketHasher`].
        ///
        /// With the `foldhash` feature this is foldhash's fixed-seed fast
        /// hasher, which needs no per-instance state.
        pub type DefaultHashBuilder = foldhash::fast::FixedState;

        /// The bucket hasher used by
        /// [`HashTable::with_default_hasher`](crate::HashTable::with_default_hasher).
        pub type DefaultBucketHasher = BuildHasherIndex<DefaultHashBuilder>;
    } else if #[cfg(feature = "std")] {
        /// The hash builder used by [`DefaultBucketHasher`].
        ///
        /// Without the `foldhash` feature this falls back to the standard
        /// library's SipHash-based hasher with fixed keys.
        pub type DefaultHashBuilder = core::hash::BuildHasherDefault<std::hash::DefaultHasher>;

        /// The bucket hasher used by
        /// [`HashTable::with_default_hasher`](crate::HashTable::with_default_hasher).
        pub type DefaultBucketHasher = BuildHasherIndex<DefaultHashBuilder>;
    }
}

#[cfg(test)]
mod tests {
    use core::hash::BuildHasherDefault;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    #[test]
    fn closure_is_a_bucket_hasher() {
        let constant = |_: &[u8], _: usize| 3usize;
        assert_eq!(constant.bucket_index(b"anything", 8), 3);
        assert_eq!(constant.bucket_index(b"", 64), 3);

        fn by_len(key: &[u8], capacity: usize) -> usize {
            key.len() % capacity
        }
        assert_eq!(by_len.bucket_index(b"abcdefghij", 8), 2);
    }

    #[test]
    fn build_hasher_index_stays_in_range() {
        let hasher = BuildHasherIndex::new(SipHashBuilder::default());
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut key = [0u8; 24];

        for capacity in [8usize, 16, 32, 64, 1 << 12] {
            for _ in 0..256 {
                let len = rng.random_range(0..=key.len());
                rng.fill(&mut key[..len]);
                let index = hasher.bucket_index(&key[..len], capacity);
                assert!(index < capacity, "{index} >= {capacity}");
            }
        }
    }

    #[test]
    fn build_hasher_index_is_deterministic() {
        let hasher = BuildHasherIndex::new(SipHashBuilder::default());
        let copy = hasher.clone();
        for capacity in [8usize, 16, 128] {
            for key in [&b""[..], b"a", b"hello world", &[0xff; 40]] {
                assert_eq!(
                    hasher.bucket_index(key, capacity),
                    copy.bucket_index(key, capacity)
                );
            }
        }
    }

    #[test]
    fn build_hasher_index_matches_manual_hash() {
        let hasher = BuildHasherIndex::new(BuildHasherDefault::<SipHasher>::default());
        let mut manual = SipHasher::new();
        manual.write(b"blob");
        let expected = (manual.finish() % 16) as usize;
        assert_eq!(hasher.bucket_index(b"blob", 16), expected);
    }

    #[cfg(any(feature = "foldhash", feature = "std"))]
    #[test]
    fn default_bucket_hasher_is_stable_across_instances() {
        let a = DefaultBucketHasher::default();
        let b = DefaultBucketHasher::default();
        for key in [&b"alpha"[..], b"beta", b"gamma"] {
            assert_eq!(a.bucket_index(key, 32), b.bucket_index(key, 32));
        }
    }
}
