//! This file contains the [`RoutingTable`] data structure.
//! It owns the [`PartitioningScheme`] provided during construction and delegates
//! queries like: Which node owns a given key to it.
//!
//! A routing table is read far more often than it is written: every request routed by the calling
//! service asks for a key owner, while nodes only join or leave when an operator (or an external
//! membership protocol) says so. Readers share a [`RwLock`] read guard, and each `add_node`/`remove_node`
//! holds the write guard for the duration of that single call. Since [`PartitioningScheme`] mutations
//! are all-or-nothing, a reader can never observe a ring that is halfway through a membership change.
use bytes::Bytes;
use std::{
    collections::HashSet,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{event, instrument, Level};

use super::{
    error::{Error, Result},
    partitioning::PartitioningScheme,
};

type SyncPartitioningScheme = Box<dyn PartitioningScheme + Send + Sync>;

/// Shared, thread-safe handle to a [`PartitioningScheme`]. Cloning it is cheap and every clone
/// points to the same underlying ring.
#[derive(Clone)]
pub struct RoutingTable {
    inner: Arc<RwLock<SyncPartitioningScheme>>,
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_read() {
            Ok(inner) => {
                write!(f, "RoutingTable: {:?}", inner.members())
            }
            Err(_) => {
                write!(f, "Unable to acquire lock for logging at this time...")
            }
        }
    }
}

impl RoutingTable {
    pub fn new(partitioning_scheme: SyncPartitioningScheme) -> Self {
        Self {
            inner: Arc::new(RwLock::new(partitioning_scheme)),
        }
    }

    /// A fail to acquire a lock is considered an [`Error::Logic`] since the only reason why
    /// this can fail is [`RwLock`] poisoning
    fn acquire_read_lock(&self) -> Result<RwLockReadGuard<SyncPartitioningScheme>> {
        self.inner.read().map_err(|_| Error::Logic {
            reason: "Unable to acquire read lock for RoutingTable - poisoned...".to_string(),
        })
    }

    fn acquire_write_lock(&self) -> Result<RwLockWriteGuard<SyncPartitioningScheme>> {
        self.inner.write().map_err(|_| Error::Logic {
            reason: "Unable to acquire write lock for RoutingTable - poisoned...".to_string(),
        })
    }

    #[instrument(name = "routing_table::add_node", level = "info", skip(self))]
    pub fn add_node(&self, node: Bytes) -> Result<()> {
        let mut guard = self.acquire_write_lock()?;
        guard.add_node(node)?;
        event!(Level::INFO, "ring now has {} nodes", guard.members().len());
        Ok(())
    }

    #[instrument(name = "routing_table::remove_node", level = "info", skip(self))]
    pub fn remove_node(&self, node: &[u8]) -> Result<()> {
        let mut guard = self.acquire_write_lock()?;
        guard.remove_node(node)?;
        event!(Level::INFO, "ring now has {} nodes", guard.members().len());
        Ok(())
    }

    /// Whenever a request for a key is received, this API is called to understand which node owns the given key.
    pub fn key_owner(&self, key: &[u8]) -> Result<Bytes> {
        let guard = self.acquire_read_lock()?;
        guard.key_owner(key)
    }

    pub fn preference_list(&self, key: &[u8], list_size: usize) -> Result<Vec<Bytes>> {
        let guard = self.acquire_read_lock()?;
        guard.preference_list(key, list_size)
    }

    /// Returns a copy of the current members. Further membership changes are not reflected on it.
    pub fn members(&self) -> Result<HashSet<Bytes>> {
        let guard = self.acquire_read_lock()?;
        Ok(guard.members().clone())
    }

    pub fn contains_node(&self, node: &[u8]) -> Result<bool> {
        let guard = self.acquire_read_lock()?;
        Ok(guard.contains_node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::RoutingTable;
    use crate::{
        cluster::{
            error::Error,
            partitioning::{consistent_hashing::ConsistentHashing, hash::Murmur3},
        },
        utils::generate_random_ascii_string,
    };
    use bytes::Bytes;
    use std::collections::HashSet;

    fn routing_table(nodes: &[&'static str]) -> RoutingTable {
        let ring = ConsistentHashing::new(16, 64, Murmur3).unwrap();
        let table = RoutingTable::new(Box::new(ring));
        for node in nodes.iter().copied() {
            table.add_node(Bytes::from_static(node.as_bytes())).unwrap();
        }

        table
    }

    #[test]
    fn test_delegates_to_partitioning_scheme() {
        let table = routing_table(&["node1", "node2", "node3"]);

        assert_eq!(
            table.members().unwrap(),
            HashSet::from([
                Bytes::from_static(b"node1"),
                Bytes::from_static(b"node2"),
                Bytes::from_static(b"node3"),
            ])
        );
        assert!(table.contains_node(b"node2").unwrap());

        let owner = table.key_owner(b"user1").unwrap();
        assert_eq!(owner, table.preference_list(b"user1", 2).unwrap()[0]);

        table.remove_node(b"node2").unwrap();
        assert!(!table.contains_node(b"node2").unwrap());
        assert!(matches!(
            table.remove_node(b"node2"),
            Err(Error::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_clones_share_the_same_ring() {
        let table = routing_table(&["node1"]);
        let clone = table.clone();

        clone.add_node(Bytes::from_static(b"node2")).unwrap();
        assert!(table.contains_node(b"node2").unwrap());
    }

    #[test]
    fn test_empty_routing_table() {
        let table = routing_table(&[]);
        assert!(table.key_owner(b"user1").unwrap_err().is_empty_ring());
        assert!(table.members().unwrap().is_empty());
    }

    // Readers run while a writer keeps adding and removing a node. Every answer must come from
    // a consistent ring: either the one with "flapping" or the one without it.
    #[test]
    fn test_concurrent_lookups_during_membership_changes() {
        let table = routing_table(&["node1", "node2", "node3"]);
        let keys: Vec<String> = (0..200).map(|_| generate_random_ascii_string(12)).collect();

        let stable: Vec<Bytes> = keys
            .iter()
            .map(|key| table.key_owner(key.as_bytes()).unwrap())
            .collect();

        std::thread::scope(|s| {
            let writer = table.clone();
            s.spawn(move || {
                for _ in 0..50 {
                    writer.add_node(Bytes::from_static(b"flapping")).unwrap();
                    writer.remove_node(b"flapping").unwrap();
                }
            });

            for _ in 0..4 {
                let reader = table.clone();
                let keys = &keys;
                let stable = &stable;
                s.spawn(move || {
                    for _ in 0..20 {
                        for (key, stable_owner) in keys.iter().zip(stable.iter()) {
                            let owner = reader.key_owner(key.as_bytes()).unwrap();
                            assert!(owner == *stable_owner || owner == "flapping");
                        }
                    }
                });
            }
        });

        for (key, stable_owner) in keys.iter().zip(stable.iter()) {
            assert_eq!(*stable_owner, table.key_owner(key.as_bytes()).unwrap());
        }
    }
}
