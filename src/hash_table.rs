//! A separately chained hash table keyed and valued by byte slices.
//!
//! The table owns a power-of-two-growing array of buckets. Each bucket is the
//! head of a singly linked chain of entries whose keys were mapped to that
//! bucket by the table's [`BucketHasher`]. Keys compare by exact byte
//! equality, so `b"ab"` and `b"ab\0"` are distinct keys.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;

use crate::bucket_hasher::BucketHasher;
use crate::error::Fallibility;
use crate::error::TryReserveError;

/// Number of buckets in a freshly created table.
const INITIAL_CAPACITY: usize = 8;

/// Returns `true` once `count / capacity` has reached the 0.8 load factor.
///
/// Evaluated as `count * 5 >= capacity * 4` in `u128` so the threshold is
/// exact and cannot overflow.
#[inline(always)]
fn at_max_load(count: usize, capacity: usize) -> bool {
    count as u128 * 5 >= capacity as u128 * 4
}

type Link = Option<Box<Node>>;

struct Node {
    key: Box<[u8]>,
    value: Box<[u8]>,
    next: Link,
}

fn reserve_exact<T>(
    vec: &mut Vec<T>,
    additional: usize,
    fallibility: Fallibility,
) -> Result<(), TryReserveError> {
    if vec.try_reserve_exact(additional).is_ok() {
        return Ok(());
    }

    let layout = vec
        .len()
        .checked_add(additional)
        .and_then(|len| Layout::array::<T>(len).ok());
    Err(match layout {
        Some(layout) => fallibility.alloc_err(layout),
        None => fallibility.capacity_overflow(),
    })
}

fn copy_bytes(bytes: &[u8], fallibility: Fallibility) -> Result<Box<[u8]>, TryReserveError> {
    let mut buffer = Vec::new();
    reserve_exact(&mut buffer, bytes.len(), fallibility)?;
    buffer.extend_from_slice(bytes);
    Ok(buffer.into_boxed_slice())
}

fn alloc_node(node: Node, fallibility: Fallibility) -> Result<Box<Node>, TryReserveError> {
    let layout = Layout::new::<Node>();
    // SAFETY: `Node` is not zero-sized, so `layout` is valid for `alloc`. A
    // non-null result is a fresh allocation with `Node`'s layout from the global
    // allocator, which is exactly what `Box::from_raw` requires once the value
    // has been written into it.
    unsafe {
        let raw = alloc::alloc::alloc(layout).cast::<Node>();
        if raw.is_null() {
            return Err(fallibility.alloc_err(layout));
        }
        raw.write(node);
        Ok(Box::from_raw(raw))
    }
}

/// Chain-length and occupancy statistics for a [`HashTable`].
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of keys currently in the table
    pub populated: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Number of buckets whose chain is empty
    pub empty_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Sum of the lengths of all stored keys
    pub total_key_bytes: usize,
    /// Sum of the lengths of all stored values
    pub total_value_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} buckets ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Buckets: {} empty ({:.2}%), longest chain {}",
            self.empty_buckets,
            if self.capacity == 0 {
                0.0
            } else {
                (self.empty_buckets as f64 / self.capacity as f64) * 100.0
            },
            self.longest_chain
        );
        println!(
            "Payload: {} key bytes, {} value bytes",
            self.total_key_bytes, self.total_value_bytes
        );
    }
}

/// A hash table mapping byte-string keys to byte-string values.
///
/// `HashTable<H>` resolves collisions by chaining and delegates bucket
/// selection to a caller-supplied [`BucketHasher`] `H`. Both keys and values are
/// copied into buffers owned by the table, so the slices passed to
/// [`insert`](Self::insert) can be reused as soon as the call returns.
///
/// The table starts with 8 buckets and doubles its bucket count whenever an
/// insert finds the load factor at or above 0.8. It never shrinks.
///
/// No ordering of entries is defined, and the table exposes no iteration.
///
/// ## Example
///
/// ```rust
/// use blob_table::HashTable;
///
/// let mut table = HashTable::new(|key: &[u8], capacity: usize| {
///     key.iter().fold(0usize, |h, &b| h.wrapping_mul(31).wrapping_add(b as usize)) % capacity
/// });
///
/// table.insert(b"name", b"ferris");
/// table.insert(b"\x00\x01", &[0xde, 0xad, 0xbe, 0xef]);
///
/// assert_eq!(table.get(b"name"), Some(&b"ferris"[..]));
/// assert_eq!(table.get_with_size(b"\x00\x01"), Some((&[0xde, 0xad, 0xbe, 0xef][..], 4)));
/// assert!(!table.contains_key(b"missing"));
///
/// table.remove(b"name");
/// assert_eq!(table.get(b"name"), None);
/// ```
pub struct HashTable<H> {
    buckets: Vec<Link>,
    count: usize,
    hasher: H,
}

impl<H> Debug for HashTable<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("count", &self.count)
            .field("capacity", &self.buckets.len())
            .field(
                "chains",
                &self
                    .buckets
                    .iter()
                    .map(|head| chain(head).count())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<H> Clone for HashTable<H>
where
    H: Clone,
{
    fn clone(&self) -> Self {
        let mut buckets = Vec::with_capacity(self.buckets.len());
        for head in &self.buckets {
            let mut cloned: Link = None;
            let mut tail = &mut cloned;
            for node in chain(head) {
                tail = &mut tail
                    .insert(Box::new(Node {
                        key: node.key.clone(),
                        value: node.value.clone(),
                        next: None,
                    }))
                    .next;
            }
            buckets.push(cloned);
        }

        Self {
            buckets,
            count: self.count,
            hasher: self.hasher.clone(),
        }
    }
}

impl<H> Drop for HashTable<H> {
    fn drop(&mut self) {
        // Unlink one node at a time so chain length never turns into drop
        // recursion depth.
        for head in &mut self.buckets {
            let mut link = head.take();
            while let Some(mut node) = link {
                link = node.next.take();
            }
        }
    }
}

impl<H> Default for HashTable<H>
where
    H: BucketHasher + Default,
{
    fn default() -> Self {
        Self::new(H::default())
    }
}

#[inline]
fn chain(head: &Link) -> impl Iterator<Item = &Node> {
    core::iter::successors(head.as_deref(), |node| node.next.as_deref())
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl HashTable<crate::bucket_hasher::DefaultBucketHasher> {
    /// Creates an empty table using the crate's default bucket hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::with_default_hasher();
    /// table.insert(b"k", b"v");
    /// assert!(table.contains_key(b"k"));
    /// ```
    pub fn with_default_hasher() -> Self {
        Self::new(Default::default())
    }
}

impl<H> HashTable<H>
where
    H: BucketHasher,
{
    /// Creates an empty table with 8 buckets that places keys with `hasher`.
    ///
    /// Aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
    /// if the bucket array cannot be allocated. Use
    /// [`try_new`](Self::try_new) to handle that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 8);
    /// ```
    pub fn new(hasher: H) -> Self {
        match Self::new_impl(hasher, Fallibility::Infallible) {
            Ok(table) => table,
            Err(_) => unreachable!("infallible allocation returned an error"),
        }
    }

    /// Creates an empty table with 8 buckets, returning an error instead of
    /// aborting if the bucket array cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let table = HashTable::try_new(|_: &[u8], _: usize| 0usize).expect("allocation failed");
    /// assert_eq!(table.len(), 0);
    /// ```
    pub fn try_new(hasher: H) -> Result<Self, TryReserveError> {
        Self::new_impl(hasher, Fallibility::Fallible)
    }

    fn new_impl(hasher: H, fallibility: Fallibility) -> Result<Self, TryReserveError> {
        let mut buckets = Vec::new();
        reserve_exact(&mut buckets, INITIAL_CAPACITY, fallibility)?;
        buckets.resize_with(INITIAL_CAPACITY, || None);

        Ok(Self {
            buckets,
            count: 0,
            hasher,
        })
    }

    #[inline(always)]
    fn bucket_of(&self, key: &[u8]) -> usize {
        let capacity = self.buckets.len();
        let index = self.hasher.bucket_index(key, capacity);
        debug_assert!(
            index < capacity,
            "bucket hasher returned index {index} for a table of {capacity} buckets"
        );
        index % capacity
    }

    fn find(&self, key: &[u8]) -> Option<&Node> {
        chain(&self.buckets[self.bucket_of(key)]).find(|node| *node.key == *key)
    }

    /// Returns `true` if the table holds a value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// table.insert(b"abc", b"");
    /// assert!(table.contains_key(b"abc"));
    /// assert!(!table.contains_key(b"abd"));
    /// ```
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Returns the value stored for `key`, borrowed from the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// table.insert(b"k", b"value");
    /// assert_eq!(table.get(b"k"), Some(&b"value"[..]));
    /// assert_eq!(table.get(b"other"), None);
    /// ```
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.find(key).map(|node| &*node.value)
    }

    /// Returns the value stored for `key` together with its length in bytes.
    ///
    /// The length is always the slice's own `len()`; entries keep no separate
    /// size field. This form exists for callers that want the pair in one call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// table.insert(b"k", b"four");
    /// assert_eq!(table.get_with_size(b"k"), Some((&b"four"[..], 4)));
    /// ```
    pub fn get_with_size(&self, key: &[u8]) -> Option<(&[u8], usize)> {
        self.find(key).map(|node| (&*node.value, node.value.len()))
    }

    /// Stores a copy of `value` under a copy of `key`.
    ///
    /// If the key is already present its value is replaced and the number of
    /// keys does not change. Before the key is placed, the table doubles its
    /// bucket count if it is at or above its maximum load.
    ///
    /// Aborts on allocation failure; see [`try_insert`](Self::try_insert).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// table.insert(b"k", b"first");
    /// table.insert(b"k", b"second, longer");
    /// assert_eq!(table.len(), 1);
    /// assert_eq!(table.get(b"k"), Some(&b"second, longer"[..]));
    /// ```
    pub fn insert(&mut self, key: &[u8], value: &[u8]) {
        if self.insert_impl(key, value, Fallibility::Infallible).is_err() {
            unreachable!("infallible allocation returned an error");
        }
    }

    /// Fallible version of [`insert`](Self::insert).
    ///
    /// On error the key is not stored (or keeps its previous value). The table
    /// may have grown if the failure happened after the growth step; every
    /// previously stored key remains retrievable either way.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// table.try_insert(b"k", b"v").expect("allocation failed");
    /// assert_eq!(table.get(b"k"), Some(&b"v"[..]));
    /// ```
    pub fn try_insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), TryReserveError> {
        self.insert_impl(key, value, Fallibility::Fallible)
    }

    fn insert_impl(
        &mut self,
        key: &[u8],
        value: &[u8],
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        if at_max_load(self.count, self.buckets.len()) {
            self.grow(fallibility)?;
        }

        let index = self.bucket_of(key);
        let mut link = &mut self.buckets[index];
        while let Some(node) = link {
            if *node.key == *key {
                if node.value.len() == value.len() {
                    node.value.copy_from_slice(value);
                } else {
                    node.value = copy_bytes(value, fallibility)?;
                }
                return Ok(());
            }
            link = &mut node.next;
        }

        let mut node = alloc_node(
            Node {
                key: copy_bytes(key, fallibility)?,
                value: copy_bytes(value, fallibility)?,
                next: None,
            },
            fallibility,
        )?;
        let head = &mut self.buckets[index];
        node.next = head.take();
        *head = Some(node);
        self.count += 1;

        Ok(())
    }

    /// Removes `key` and its value from the table, releasing both buffers.
    ///
    /// Removing a key that is not present does nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// table.insert(b"k", b"v");
    /// table.remove(b"k");
    /// table.remove(b"never inserted");
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(&mut self, key: &[u8]) {
        let index = self.bucket_of(key);
        let mut link = &mut self.buckets[index];
        loop {
            match link {
                None => return,
                Some(node) if *node.key == *key => {
                    *link = node.next.take();
                    self.count -= 1;
                    return;
                }
                Some(node) => link = &mut node.next,
            }
        }
    }

    /// Doubles the bucket count and redistributes every entry.
    ///
    /// All chains are first spliced onto one carryover list, then each entry
    /// is pushed onto the head of the bucket the hasher picks for the new
    /// capacity. Entries that shared a bucket and land together again may come
    /// out in a different relative order.
    #[cold]
    fn grow(&mut self, fallibility: Fallibility) -> Result<(), TryReserveError> {
        let old_capacity = self.buckets.len();
        let new_capacity = old_capacity
            .checked_mul(2)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        self.rehash_into(new_capacity, fallibility)
    }

    /// Extends the bucket array to `new_capacity` and redistributes every
    /// entry. The bucket array is reserved before any entry moves, so an error
    /// leaves the table untouched.
    fn rehash_into(
        &mut self,
        new_capacity: usize,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let old_capacity = self.buckets.len();
        debug_assert!(new_capacity >= old_capacity);
        reserve_exact(&mut self.buckets, new_capacity - old_capacity, fallibility)?;
        self.buckets.resize_with(new_capacity, || None);

        let mut carryover: Link = None;
        for head in &mut self.buckets[..old_capacity] {
            let mut link = head.take();
            while let Some(mut node) = link {
                link = node.next.take();
                node.next = carryover;
                carryover = Some(node);
            }
        }

        while let Some(mut node) = carryover {
            carryover = node.next.take();
            let index = self.bucket_of(&node.key);
            let head = &mut self.buckets[index];
            node.next = head.take();
            *head = Some(node);
        }

        Ok(())
    }

    /// Returns a reference to the table's bucket hasher.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }
}

impl<H> HashTable<H> {
    /// Returns the number of keys in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blob_table::HashTable;
    ///
    /// let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
    /// assert_eq!(table.len(), 0);
    /// table.insert(b"a", b"1");
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the table holds no keys.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the current number of buckets.
    ///
    /// This starts at 8 and doubles on every growth; it is not a bound on how
    /// many keys the table can hold.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Counts buckets by chain length: entry `n` of the result is the number
    /// of buckets whose chain holds exactly `n` entries.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> ChainHistogram {
        let mut buckets = alloc::vec![0usize; 1];
        for head in &self.buckets {
            let len = chain(head).count();
            if len >= buckets.len() {
                buckets.resize(len + 1, 0);
            }
            buckets[len] += 1;
        }
        ChainHistogram { buckets }
    }

    /// Returns occupancy statistics for debugging and tuning hashers.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let mut empty_buckets = 0;
        let mut longest_chain = 0;
        let mut total_key_bytes = 0;
        let mut total_value_bytes = 0;

        for head in &self.buckets {
            let mut len = 0;
            for node in chain(head) {
                len += 1;
                total_key_bytes += node.key.len();
                total_value_bytes += node.value.len();
            }
            if len == 0 {
                empty_buckets += 1;
            }
            longest_chain = longest_chain.max(len);
        }

        DebugStats {
            populated: self.count,
            capacity: self.buckets.len(),
            load_factor: self.count as f64 / self.buckets.len() as f64,
            empty_buckets,
            longest_chain,
            total_key_bytes,
            total_value_bytes,
        }
    }
}

/// Bucket counts indexed by chain length, from
/// [`HashTable::chain_histogram`].
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHistogram {
    buckets: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ChainHistogram {
    /// Returns the per-length bucket counts; index `n` is chain length `n`.
    pub fn as_slice(&self) -> &[usize] {
        &self.buckets
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.buckets.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("chain histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "chain histogram ({} buckets):",
            self.buckets.iter().sum::<usize>()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            if let Some(ch) = partial {
                bar.push(ch);
            }
            bar
        };

        for (len, &count) in self.buckets.iter().enumerate() {
            println!("{:>3} | {} ({})", len, make_bar(count), count);
        }
    }
}
