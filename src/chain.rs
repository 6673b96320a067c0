//! Slab-backed singly-linked bucket chains with link-level cursors.

use crate::types::NormalizedKey;

/// One entry in a bucket chain: an owned byte key plus an optional payload.
///
/// The chain owns only the linkage; key and payload belong to whoever
/// inserted the node and travel with it when the node is removed.
#[derive(Debug)]
pub struct ChainNode<T> {
    key: NormalizedKey,
    payload: Option<T>,
    next: Option<usize>,
}

impl<T> ChainNode<T> {
    /// The node's lookup key (empty until assigned).
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Assign the node's lookup key.
    pub fn set_key(&mut self, key: NormalizedKey) {
        self.key = key;
    }

    /// Borrow the payload, if one was stored.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Mutably borrow the payload, if one was stored.
    pub fn payload_mut(&mut self) -> Option<&mut T> {
        self.payload.as_mut()
    }

    /// Store a payload, replacing any previous one.
    pub fn set_payload(&mut self, payload: T) {
        self.payload = Some(payload);
    }

    /// Take the payload out of the node.
    pub fn take_payload(&mut self) -> Option<T> {
        self.payload.take()
    }
}

/// Opaque position of the link pointing at a node, so the node can be
/// unlinked in O(1) without re-scanning the chain.
///
/// A cursor stays valid only until the chain is next mutated. Cursors are
/// stamped with the chain's mutation generation, so a stale cursor always
/// resolves to no node, never a wrong one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainCursor {
    link: Link,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Head,
    After(usize),
}

/// Singly-linked chain of keyed nodes backed by a slab of slots.
#[derive(Debug, Default)]
pub struct Chain<T> {
    slots: Vec<Option<ChainNode<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    len: usize,
    generation: u64,
}

impl<T> Chain<T> {
    /// An empty chain.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            len: 0,
            generation: 0,
        }
    }

    /// Number of live nodes in the chain.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the chain holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Link a new zero-valued node (no key, no payload) at the head of the
    /// chain and return it for immediate field population.
    pub fn prepend(&mut self) -> &mut ChainNode<T> {
        let node = ChainNode {
            key: Vec::new(),
            payload: None,
            next: self.head,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.head = Some(slot);
        self.len += 1;
        self.generation += 1;
        self.slots[slot].as_mut().expect("freshly filled chain slot")
    }

    /// Locate the link pointing at the first node whose key equals `key`
    /// (length first, then byte-exact). Degenerate inputs (empty key,
    /// empty chain) are `None`, never an error.
    pub fn find(&self, key: &[u8]) -> Option<ChainCursor> {
        if key.is_empty() {
            return None;
        }
        let mut link = Link::Head;
        let mut current = self.head;
        while let Some(slot) = current {
            let node = self.slots[slot].as_ref().expect("linked chain slot");
            if node.key.len() == key.len() && node.key.as_slice() == key {
                return Some(ChainCursor {
                    link,
                    generation: self.generation,
                });
            }
            link = Link::After(slot);
            current = node.next;
        }
        None
    }

    /// Return the existing node matching `key`, or prepend a fresh unkeyed
    /// node when no match exists. This is the idempotent-insertion building
    /// block used by membership indexes.
    pub fn find_or_insert(&mut self, key: &[u8]) -> &mut ChainNode<T> {
        match self.find(key) {
            Some(cursor) => {
                let slot = self.target_slot(cursor).expect("cursor from fresh find");
                self.slots[slot].as_mut().expect("linked chain slot")
            }
            None => self.prepend(),
        }
    }

    /// Borrow the node a cursor points at, if it still exists.
    pub fn node(&self, cursor: ChainCursor) -> Option<&ChainNode<T>> {
        let slot = self.target_slot(cursor)?;
        self.slots.get(slot)?.as_ref()
    }

    /// Mutably borrow the node a cursor points at, if it still exists.
    pub fn node_mut(&mut self, cursor: ChainCursor) -> Option<&mut ChainNode<T>> {
        let slot = self.target_slot(cursor)?;
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Unlink the node a cursor points at, splicing its successor into the
    /// link position. Returns 1 when a node was removed, 0 otherwise.
    pub fn remove(&mut self, cursor: ChainCursor) -> usize {
        let Some(slot) = self.target_slot(cursor) else {
            return 0;
        };
        let Some(node) = self.slots.get_mut(slot).and_then(Option::take) else {
            return 0;
        };
        match cursor.link {
            Link::Head => self.head = node.next,
            Link::After(prev) => {
                if let Some(prev_node) = self.slots.get_mut(prev).and_then(Option::as_mut) {
                    prev_node.next = node.next;
                }
            }
        }
        self.free.push(slot);
        self.len -= 1;
        self.generation += 1;
        1
    }

    /// Remove every node, handing each node's key and payload to
    /// `on_remove`, and reset the chain to empty. Returns the number of
    /// nodes removed.
    pub fn clear(&mut self, mut on_remove: impl FnMut(NormalizedKey, Option<T>)) -> usize {
        let mut removed = 0;
        let mut current = self.head.take();
        while let Some(slot) = current {
            let node = self.slots[slot].take().expect("linked chain slot");
            current = node.next;
            self.free.push(slot);
            on_remove(node.key, node.payload);
            removed += 1;
        }
        self.len = 0;
        self.generation += 1;
        removed
    }

    fn target_slot(&self, cursor: ChainCursor) -> Option<usize> {
        if cursor.generation != self.generation {
            return None;
        }
        match cursor.link {
            Link::Head => self.head,
            Link::After(slot) => self.slots.get(slot)?.as_ref()?.next,
        }
    }
}
