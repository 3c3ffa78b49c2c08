use std::fmt::Display;

use bytes::Bytes;
use serde::Serialize;

use crate::utils::serde_utf8_bytes;

/// Errors returned by a [`crate::cluster::partitioning::PartitioningScheme`] and by
/// [`crate::cluster::routing_table::RoutingTable`].
///
/// None of these are fatal. A call that returns an error never leaves the ring partially mutated.
#[derive(Debug, Serialize)]
pub enum Error {
    /// Empty key or node id, or an unusable construction parameter
    InvalidArgument { reason: String },
    /// A key owner was requested while no node is part of the ring
    EmptyRing,
    NodeAlreadyExists {
        #[serde(with = "serde_utf8_bytes")]
        node: Bytes,
    },
    NodeNotFound {
        #[serde(with = "serde_utf8_bytes")]
        node: Bytes,
    },
    /// Every salted retry for one of the node's replicas landed on an occupied position
    CollisionExhausted {
        #[serde(with = "serde_utf8_bytes")]
        node: Bytes,
        replica: usize,
        attempts: usize,
    },
    Logic { reason: String },
}

impl Error {
    /// Returns true if this is an instance of a [`Error::EmptyRing`] variant
    pub fn is_empty_ring(&self) -> bool {
        matches!(self, Error::EmptyRing)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
