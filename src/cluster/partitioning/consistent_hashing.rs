//! Consistent-hashing is the default [`PartitioningScheme`] for ringroute
use crate::cluster::error::{Error, Result};
use bytes::Bytes;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{event, Level};

use super::hash::{hash_space_mask, HashFunction, HashFunctionReturnType, Murmur3};
use super::PartitioningScheme;

pub const DEFAULT_VIRTUAL_NODES: usize = 128;
pub const DEFAULT_HASH_WIDTH: u32 = HashFunctionReturnType::BITS;
/// How many extra salts are tried for a single replica before [`Error::CollisionExhausted`] is returned
pub const MAX_COLLISION_RETRIES: usize = 16;

/// ConsistentHashing is the partitioning scheme implemented by ringroute.
/// The goal of consistent hashing is to enable a distributed system to decide
/// which node should own a specific key. It does it by creating a
/// fixed hash space - in this case from [0, 2^hash_width)
/// and computing the hash of both the nodes and the keys being routed.
/// The node that owns the key is the first node whose hash is higher than or equal to the hash of the key.
/// Note that this hash space should be viewed as a circular buffer (or hash ring). Let's
/// try to understand the hash ring statement through an example:
///
/// In this example we have a hash space that goes from 0 to 10 (ie: the hash function returns a number between 0 and 10).
/// Nodes:     ['A', 'B', 'C']
/// Nodes_hash:[ 2 ,  5 ,  8 ]
///
/// key to route: 'foo', hash('foo') = 4 -> owned by node B (hash 5)
/// key to route: 'bar', hash('bar) = 7 -> owned by node C (hash 8)
/// key to route: 'zoo', hash('zoo') = 9 -> owned by node A (hash 2)
///   - this last one shows the circular nature of the Nodes_hash, which is why
///    we refer to this array as a 'hash ring'
///
/// **The important property of consistent hashing is that if a node is added/removed, only the keys
/// owned by that node change owners.**
///
/// With a single position per node, the arcs between positions are very uneven. That's why every node
/// is placed `virtual_nodes` times on the ring, at `hash("<node>#<replica>")` for each replica in
/// `[0, virtual_nodes)`. If a replica lands on an occupied position, the salt is extended to
/// `"<node>#<replica>#<attempt>"` until a free position is found or [`MAX_COLLISION_RETRIES`] is exhausted.
///
/// Implementation notes:
///  1. positions live in a sorted vector (`hashes`) with a parallel vector of owners (`nodes`).
///    Lookups are a binary search. Inserts and removals shift the vectors, which is fine since
///    membership changes are rare compared to lookups.
///  2. `node_positions` records which positions each node owns so that removing a node never
///    needs to recompute hashes or scan the whole ring.
#[derive(Clone)]
pub struct ConsistentHashing {
    hashes: Vec<HashFunctionReturnType>,
    nodes: Vec<Bytes>,
    node_positions: HashMap<Bytes, Vec<HashFunctionReturnType>>,
    members: HashSet<Bytes>,
    virtual_nodes: usize,
    hash_width: u32,
    mask: HashFunctionReturnType,
    hash_fn: Arc<dyn HashFunction>,
}

impl std::fmt::Debug for ConsistentHashing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistentHashing")
            .field("virtual_nodes", &self.virtual_nodes)
            .field("hash_width", &self.hash_width)
            .field("members", &self.members)
            .field("positions", &self.hashes.len())
            .finish_non_exhaustive()
    }
}

impl Default for ConsistentHashing {
    fn default() -> Self {
        Self {
            hashes: Default::default(),
            nodes: Default::default(),
            node_positions: Default::default(),
            members: Default::default(),
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            hash_width: DEFAULT_HASH_WIDTH,
            mask: hash_space_mask(DEFAULT_HASH_WIDTH),
            hash_fn: Arc::new(Murmur3),
        }
    }
}

impl ConsistentHashing {
    /// Creates an empty ring.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `virtual_nodes` is 0 or `hash_width` is not within `1..=64`
    pub fn new<H: HashFunction + 'static>(
        virtual_nodes: usize,
        hash_width: u32,
        hash_fn: H,
    ) -> Result<Self> {
        if virtual_nodes == 0 {
            return Err(Error::InvalidArgument {
                reason: "virtual_nodes must be greater than 0".to_string(),
            });
        }

        if hash_width == 0 || hash_width > HashFunctionReturnType::BITS {
            return Err(Error::InvalidArgument {
                reason: format!(
                    "hash_width must be within [1, {}], got {}",
                    HashFunctionReturnType::BITS,
                    hash_width
                ),
            });
        }

        Ok(Self {
            hashes: Vec::new(),
            nodes: Vec::new(),
            node_positions: HashMap::new(),
            members: HashSet::new(),
            virtual_nodes,
            hash_width,
            mask: hash_space_mask(hash_width),
            hash_fn: Arc::new(hash_fn),
        })
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }

    pub fn hash_width(&self) -> u32 {
        self.hash_width
    }

    /// Number of nodes in the ring
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of positions (virtual nodes) in the ring
    pub fn vnode_count(&self) -> usize {
        self.hashes.len()
    }

    /// Position of the given key in this ring's hash space
    pub fn key_position(&self, key: &[u8]) -> HashFunctionReturnType {
        self.hash_fn.hash(key) & self.mask
    }

    /// Returns the sorted positions owned by the given node
    pub fn node_positions(&self, node: &[u8]) -> Result<&[HashFunctionReturnType]> {
        self.node_positions
            .get(node)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::NodeNotFound {
                node: Bytes::copy_from_slice(node),
            })
    }

    /// Iterates over every (position, owner) pair, in ring order
    pub fn entries(&self) -> impl Iterator<Item = (HashFunctionReturnType, &Bytes)> + '_ {
        self.hashes.iter().copied().zip(self.nodes.iter())
    }

    fn key_owner_index(&self, key: &[u8]) -> Result<usize> {
        if key.is_empty() {
            return Err(Error::InvalidArgument {
                reason: "Can't compute the owner of an empty key".to_string(),
            });
        }

        if self.hashes.is_empty() {
            return Err(Error::EmptyRing);
        }

        let key_hash = self.key_position(key);
        // partition_point returns hashes.len() if key_hash is bigger than every position,
        // which wraps around to the first position
        Ok(self.hashes.partition_point(|elem| *elem < key_hash) % self.hashes.len())
    }

    /// Computes every position for a new node without mutating the ring.
    /// Returned positions are sorted and are guaranteed to be free.
    fn generate_positions(&self, node: &Bytes) -> Result<Vec<HashFunctionReturnType>> {
        let mut positions = HashSet::with_capacity(self.virtual_nodes);
        for replica in 0..self.virtual_nodes {
            let position = (0..=MAX_COLLISION_RETRIES)
                .map(|attempt| self.key_position(&virtual_node_key(node, replica, attempt)))
                .find(|position| {
                    self.hashes.binary_search(position).is_err() && !positions.contains(position)
                });

            match position {
                Some(position) => {
                    positions.insert(position);
                }
                None => {
                    event!(
                        Level::WARN,
                        "unable to find a free position for replica {} of node {:?}",
                        replica,
                        node
                    );
                    return Err(Error::CollisionExhausted {
                        node: node.clone(),
                        replica,
                        attempts: MAX_COLLISION_RETRIES + 1,
                    });
                }
            }
        }

        let mut positions: Vec<HashFunctionReturnType> = positions.into_iter().collect();
        positions.sort_unstable();
        Ok(positions)
    }
}

/// `<node>#<replica>` for the first attempt, `<node>#<replica>#<attempt>` for retries
fn virtual_node_key(node: &[u8], replica: usize, attempt: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(node.len() + 16);
    key.extend_from_slice(node);
    key.push(b'#');
    key.extend_from_slice(replica.to_string().as_bytes());
    if attempt > 0 {
        key.push(b'#');
        key.extend_from_slice(attempt.to_string().as_bytes());
    }

    key
}

impl PartitioningScheme for ConsistentHashing {
    fn add_node(&mut self, node: Bytes) -> Result<()> {
        if node.is_empty() {
            return Err(Error::InvalidArgument {
                reason: "node id must not be empty".to_string(),
            });
        }

        if self.members.contains(&node) {
            return Err(Error::NodeAlreadyExists { node });
        }

        let positions = self.generate_positions(&node)?;
        for position in positions.iter() {
            let index = self.hashes.partition_point(|elem| elem < position);
            self.hashes.insert(index, *position);
            self.nodes.insert(index, node.clone());
        }

        event!(
            Level::DEBUG,
            "added node {:?} with {} positions",
            node,
            positions.len()
        );
        self.node_positions.insert(node.clone(), positions);
        self.members.insert(node);

        Ok(())
    }

    fn remove_node(&mut self, node: &[u8]) -> Result<()> {
        let positions = match self.node_positions.remove(node) {
            Some(positions) => positions,
            None => {
                return Err(Error::NodeNotFound {
                    node: Bytes::copy_from_slice(node),
                })
            }
        };

        for position in positions.iter() {
            if let Ok(index) = self.hashes.binary_search(position) {
                self.hashes.remove(index);
                self.nodes.remove(index);
            }
        }
        self.members.remove(node);

        event!(
            Level::DEBUG,
            "removed node {:?} and its {} positions",
            String::from_utf8_lossy(node),
            positions.len()
        );

        Ok(())
    }

    fn key_owner(&self, key: &[u8]) -> Result<Bytes> {
        let index = self.key_owner_index(key)?;
        Ok(self.nodes[index].clone())
    }

    fn preference_list(&self, key: &[u8], list_size: usize) -> Result<Vec<Bytes>> {
        if list_size == 0 {
            return Err(Error::InvalidArgument {
                reason: "preference list size must be greater than 0".to_string(),
            });
        }

        let owner_index = self.key_owner_index(key)?;
        let wanted = list_size.min(self.members.len());
        let mut res = Vec::with_capacity(wanted);

        // walk clockwise, skipping positions of nodes that are already in the list
        for i in 0..self.nodes.len() {
            if res.len() == wanted {
                break;
            }

            let node = &self.nodes[(owner_index + i) % self.nodes.len()];
            if !res.contains(node) {
                res.push(node.clone());
            }
        }

        Ok(res)
    }

    fn members(&self) -> &HashSet<Bytes> {
        &self.members
    }
}
