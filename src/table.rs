//! Separate-chaining hash table over variable-length byte keys.

use crate::chain::{Chain, ChainCursor, ChainNode};
use crate::errors::QbankError;
use crate::types::{BucketIndex, NormalizedKey};

/// Pluggable bucket hash. Must map `(bytes, bucket_count)` into
/// `[0, bucket_count)` deterministically; out-of-range results make every
/// table operation report "invalid" for that key.
pub type HashFn = fn(&[u8], usize) -> BucketIndex;

/// Deterministic base-256 integer folding reduced modulo the bucket count.
pub fn fold_hash(bytes: &[u8], bucket_count: usize) -> BucketIndex {
    if bucket_count == 0 {
        return 0;
    }
    let modulo = bucket_count as u64;
    let mut hash = 0u64;
    for &byte in bytes {
        hash = hash.wrapping_mul(256).wrapping_add(u64::from(byte)) % modulo;
    }
    hash as BucketIndex
}

/// Position of a node within the table: its bucket plus the link cursor
/// inside that bucket's chain. Valid until the table is next mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCursor {
    bucket: BucketIndex,
    link: ChainCursor,
}

/// Fixed-capacity hash table of independent bucket chains. No load factor,
/// no resizing; collision behavior degrades to a linear scan within a
/// bucket, so size the bucket count to the expected key cardinality.
#[derive(Debug)]
pub struct HashTable<T> {
    buckets: Vec<Chain<T>>,
    hash_fn: HashFn,
    len: usize,
}

impl<T> HashTable<T> {
    /// Table with `bucket_count` buckets and the default folding hash.
    pub fn new(bucket_count: usize) -> Result<Self, QbankError> {
        Self::with_hash(bucket_count, fold_hash)
    }

    /// Table with `bucket_count` buckets and a caller-supplied hash.
    pub fn with_hash(bucket_count: usize, hash_fn: HashFn) -> Result<Self, QbankError> {
        if bucket_count == 0 {
            return Err(QbankError::Configuration(
                "hash table needs at least one bucket".into(),
            ));
        }
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, Chain::new);
        Ok(Self {
            buckets,
            hash_fn,
            len: 0,
        })
    }

    /// Bucket a key hashes into. `None` for the empty key (invalid input by
    /// the hash contract) or a hash result outside the bucket range.
    pub fn bucket_index(&self, key: &[u8]) -> Option<BucketIndex> {
        if key.is_empty() {
            return None;
        }
        let index = (self.hash_fn)(key, self.buckets.len());
        (index < self.buckets.len()).then_some(index)
    }

    /// Insert a new keyed node, even when an equal key already exists
    /// (multi-valued semantics). The node is keyed before it is returned;
    /// an unkeyed node is never reachable from outside the table.
    pub fn insert(&mut self, key: &[u8]) -> Option<&mut ChainNode<T>> {
        let bucket = self.bucket_index(key)?;
        self.len += 1;
        let node = self.buckets[bucket].prepend();
        node.set_key(key.to_vec());
        Some(node)
    }

    /// Return the node already holding `key`, inserting a keyed node when
    /// none exists (idempotent per key, the membership-index primitive).
    pub fn find_or_insert(&mut self, key: &[u8]) -> Option<&mut ChainNode<T>> {
        let bucket = self.bucket_index(key)?;
        let chain = &mut self.buckets[bucket];
        if let Some(cursor) = chain.find(key) {
            return chain.node_mut(cursor);
        }
        self.len += 1;
        let node = chain.prepend();
        node.set_key(key.to_vec());
        Some(node)
    }

    /// Locate the node holding `key`. With multi-valued `insert` this
    /// reaches one of the equal-keyed nodes (the most recent).
    pub fn find(&self, key: &[u8]) -> Option<TableCursor> {
        let bucket = self.bucket_index(key)?;
        let link = self.buckets[bucket].find(key)?;
        Some(TableCursor { bucket, link })
    }

    /// Borrow the node a cursor points at, if it still exists.
    pub fn node(&self, cursor: TableCursor) -> Option<&ChainNode<T>> {
        self.buckets.get(cursor.bucket)?.node(cursor.link)
    }

    /// Mutably borrow the node a cursor points at, if it still exists.
    pub fn node_mut(&mut self, cursor: TableCursor) -> Option<&mut ChainNode<T>> {
        self.buckets.get_mut(cursor.bucket)?.node_mut(cursor.link)
    }

    /// Unlink the node a cursor points at. Returns 1 when a node was
    /// removed, 0 otherwise.
    pub fn remove(&mut self, cursor: TableCursor) -> usize {
        let Some(chain) = self.buckets.get_mut(cursor.bucket) else {
            return 0;
        };
        let removed = chain.remove(cursor.link);
        self.len -= removed;
        removed
    }

    /// Remove every node from every bucket, handing keys and payloads to
    /// `on_remove`. Returns the total number of nodes removed.
    pub fn clear(&mut self, mut on_remove: impl FnMut(NormalizedKey, Option<T>)) -> usize {
        let mut removed = 0;
        for chain in &mut self.buckets {
            removed += chain.clear(&mut on_remove);
        }
        self.len = 0;
        removed
    }

    /// Number of live nodes across all buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bucket holds a node.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets fixed at construction.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
