//! Module that contains different partitioning schemes
use crate::cluster::error::Result;
use bytes::Bytes;
use std::collections::HashSet;

pub mod consistent_hashing;
pub mod hash;

/// This trait defines a PartitioningScheme (ie: how should keys be split amongst cluster nodes)
///
/// For the 2 mutating operations: `add_node` and `remove_node`, keys change owners.
/// On the caller side this usually means moving data between nodes (resharding), which is expensive.
/// For this reason, implementations must keep the amount of keys that change owners to a minimum.
///
/// Both mutating operations are all-or-nothing: on error, the scheme is left exactly as it was.
pub trait PartitioningScheme {
    /// adds a new node to the partition state
    fn add_node(&mut self, node: Bytes) -> Result<()>;

    /// removes a node from the partition state
    fn remove_node(&mut self, node: &[u8]) -> Result<()>;

    /// returns the owner of a given key
    fn key_owner(&self, key: &[u8]) -> Result<Bytes>;

    /// returns the list of distinct nodes in which the given key should reside, owner first
    fn preference_list(&self, key: &[u8], list_size: usize) -> Result<Vec<Bytes>>;

    /// returns the set of nodes currently part of the partition state
    fn members(&self) -> &HashSet<Bytes>;

    fn contains_node(&self, node: &[u8]) -> bool {
        self.members().contains(node)
    }
}
