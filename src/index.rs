//! Normalized-key membership index over question text.

use crate::constants::bank::{MAX_QUESTION_LEN, MAX_QUESTIONS};
use crate::table::HashTable;
use crate::types::NormalizedKey;

/// Strip ASCII whitespace, lower-case the remaining bytes, and truncate at
/// `max_len` bytes.
///
/// Two questions normalize equal iff they are case- and
/// whitespace-insensitive duplicates (within the truncation bound; keys
/// agreeing on their first `max_len` normalized bytes are treated as
/// equal). Normalization is deterministic and idempotent; non-ASCII bytes
/// pass through unchanged.
pub fn normalize_key(text: &str, max_len: usize) -> NormalizedKey {
    let mut key = Vec::with_capacity(text.len().min(max_len));
    for byte in text.bytes() {
        if key.len() == max_len {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        key.push(byte.to_ascii_lowercase());
    }
    key
}

/// Membership index answering "has a question normalizing like this been
/// seen before?".
///
/// The underlying table is built lazily on the first `mark_seen`, sized
/// once, and never resized. The index is an explicitly constructed value
/// owned by the caller and threaded into sampling as a parameter.
#[derive(Debug)]
pub struct SeenIndex {
    table: Option<HashTable<()>>,
    bucket_count: usize,
    max_key_len: usize,
}

impl Default for SeenIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SeenIndex {
    /// Index sized to the bank format limits.
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUESTIONS, MAX_QUESTION_LEN)
    }

    /// Index with an explicit bucket count and normalized-key length bound.
    /// A zero bucket count is bumped to one.
    pub fn with_capacity(bucket_count: usize, max_key_len: usize) -> Self {
        Self {
            table: None,
            bucket_count: bucket_count.max(1),
            max_key_len,
        }
    }

    /// Record that a question has been seen. Questions normalizing to the
    /// empty key (all whitespace) have no identity and are ignored.
    pub fn mark_seen(&mut self, text: &str) {
        let key = normalize_key(text, self.max_key_len);
        if key.is_empty() {
            return;
        }
        let bucket_count = self.bucket_count;
        let table = self.table.get_or_insert_with(|| {
            HashTable::new(bucket_count).expect("bucket count validated at construction")
        });
        let _ = table.find_or_insert(&key);
    }

    /// True when a question normalizing equal to `text` was marked seen.
    pub fn is_seen(&self, text: &str) -> bool {
        let Some(table) = self.table.as_ref() else {
            return false;
        };
        let key = normalize_key(text, self.max_key_len);
        table.find(&key).is_some()
    }

    /// Number of distinct normalized keys recorded.
    pub fn len(&self) -> usize {
        self.table.as_ref().map_or(0, |table| table.len())
    }

    /// True when nothing has been marked seen.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every recorded key. Returns the number of keys dropped.
    pub fn clear(&mut self) -> usize {
        self.table.as_mut().map_or(0, |table| table.clear(|_, _| {}))
    }
}
