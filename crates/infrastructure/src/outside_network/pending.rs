//! Index of in-flight outbound queries.
//!
//! Queries live in an arena keyed by [`QueryId`]; an ordered map from
//! [`PendingKey`] to that handle enforces that at most one query exists per
//! (transaction ID, peer address) pair. Handles are never reused, so a stale
//! handle held by a timer or a caller simply finds nothing.

use outnet_domain::AddressFamily;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::net::SocketAddr;

/// Opaque handle of one pending query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u64);

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Lookup key of a pending query: the transaction ID and the peer it was
/// sent to.
///
/// The ordering only has to be a consistent total order for the tree; it
/// carries no meaning. Equality is defined by that ordering, so IPv6 flow
/// info and scope ID do not take part in matching.
#[derive(Debug, Clone, Copy)]
pub struct PendingKey {
    pub id: u16,
    pub addr: SocketAddr,
}

impl PendingKey {
    pub fn new(id: u16, addr: SocketAddr) -> Self {
        Self { id, addr }
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.addr)
    }

    pub fn addr_len(&self) -> usize {
        self.family().record_len()
    }

    /// Port as stored in the address record (network byte order), compared
    /// without conversion.
    fn raw_port(&self) -> u16 {
        u16::from_ne_bytes(self.addr.port().to_be_bytes())
    }
}

impl Ord for PendingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.addr_len().cmp(&other.addr_len()))
            .then_with(|| self.family().cmp(&other.family()))
            .then_with(|| match (self.addr, other.addr) {
                (SocketAddr::V4(a), SocketAddr::V4(b)) => self
                    .raw_port()
                    .cmp(&other.raw_port())
                    .then_with(|| a.ip().octets().cmp(&b.ip().octets())),
                (SocketAddr::V6(a), SocketAddr::V6(b)) => self
                    .raw_port()
                    .cmp(&other.raw_port())
                    .then_with(|| a.ip().octets().cmp(&b.ip().octets())),
                // Mixed families were already ordered by record length.
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for PendingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingKey {}

struct Slot<T> {
    key: PendingKey,
    value: T,
}

/// Ordered index of pending queries.
pub struct PendingIndex<T> {
    tree: BTreeMap<PendingKey, QueryId>,
    arena: FxHashMap<QueryId, Slot<T>>,
    next_id: u64,
}

impl<T> Default for PendingIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingIndex<T> {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
            arena: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Hands out a fresh handle. The handle is not live until inserted.
    pub fn allocate_id(&mut self) -> QueryId {
        let id = QueryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Inserts `value` under `key`. When another query already owns the
    /// key, nothing changes and the value is handed back.
    pub fn insert(&mut self, query: QueryId, key: PendingKey, value: T) -> Result<(), T> {
        debug_assert!(!self.arena.contains_key(&query), "query handle reused");
        match self.tree.entry(key) {
            Entry::Occupied(_) => Err(value),
            Entry::Vacant(vacant) => {
                vacant.insert(query);
                self.arena.insert(query, Slot { key, value });
                Ok(())
            }
        }
    }

    /// Exact-match lookup on every key field.
    pub fn lookup(&self, key: &PendingKey) -> Option<QueryId> {
        self.tree.get(key).copied()
    }

    pub fn contains_key(&self, key: &PendingKey) -> bool {
        self.tree.contains_key(key)
    }

    pub fn get(&self, query: QueryId) -> Option<&T> {
        self.arena.get(&query).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, query: QueryId) -> Option<&mut T> {
        self.arena.get_mut(&query).map(|slot| &mut slot.value)
    }

    /// Unlinks the query from the tree and hands ownership back in one step.
    pub fn remove(&mut self, query: QueryId) -> Option<(PendingKey, T)> {
        let slot = self.arena.remove(&query)?;
        let removed = self.tree.remove(&slot.key);
        debug_assert_eq!(removed, Some(query));
        Some((slot.key, slot.value))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Empties the index, yielding every live query in key order.
    pub fn drain(&mut self) -> Vec<(QueryId, PendingKey, T)> {
        let tree = std::mem::take(&mut self.tree);
        tree.into_iter()
            .filter_map(|(key, query)| {
                self.arena
                    .remove(&query)
                    .map(|slot| (query, key, slot.value))
            })
            .collect()
    }
}
