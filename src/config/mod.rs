//! JSON configuration describing a ring and its initial members.
//!
//! ```json
//! {
//!   "ring": { "virtual_nodes": 128, "hash_width": 64, "hash_function": "murmur3" },
//!   "nodes": ["127.0.0.1:3001", "127.0.0.1:3002"]
//! }
//! ```
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{event, Level};

use crate::{
    cluster::{
        partitioning::{
            consistent_hashing::{ConsistentHashing, DEFAULT_HASH_WIDTH},
            hash::{Murmur3, Sha256},
            PartitioningScheme,
        },
        routing_table::RoutingTable,
    },
    error::Result,
    utils::serde_vec_utf8_bytes,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub ring: RingConfig,
    /// Initial members, added in order
    #[serde(with = "serde_vec_utf8_bytes", default)]
    pub nodes: Vec<Bytes>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RingConfig {
    pub virtual_nodes: usize,
    #[serde(default = "default_hash_width")]
    pub hash_width: u32,
    #[serde(default)]
    pub hash_function: HashFunction,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFunction {
    #[default]
    Murmur3,
    Sha256,
}

fn default_hash_width() -> u32 {
    DEFAULT_HASH_WIDTH
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let c = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&c)?)
    }

    /// Constructs the ring described by this config, including its initial members
    pub fn build_partitioning_scheme(&self) -> Result<ConsistentHashing> {
        let RingConfig {
            virtual_nodes,
            hash_width,
            hash_function,
        } = self.ring;

        let mut ring = match hash_function {
            HashFunction::Murmur3 => ConsistentHashing::new(virtual_nodes, hash_width, Murmur3)?,
            HashFunction::Sha256 => ConsistentHashing::new(virtual_nodes, hash_width, Sha256)?,
        };

        for node in self.nodes.iter() {
            ring.add_node(node.clone())?;
        }

        event!(
            Level::DEBUG,
            "ring built with {} nodes and {} positions",
            ring.len(),
            ring.vnode_count()
        );

        Ok(ring)
    }

    pub fn build_routing_table(&self) -> Result<RoutingTable> {
        Ok(RoutingTable::new(Box::new(self.build_partitioning_scheme()?)))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use bytes::Bytes;

    use super::{Config, HashFunction, RingConfig};
    use crate::{cluster::error::Error as ClusterError, error::Error};

    #[test]
    fn deserialize_ring_config() {
        let mut config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        config_path.push("conf/ring.json");

        let config = Config::from_path(config_path).unwrap();

        assert!(matches!(
            config.ring,
            RingConfig {
                virtual_nodes: 128,
                hash_width: 64,
                hash_function: HashFunction::Murmur3,
            }
        ));
        assert_eq!(
            config.nodes,
            vec![
                Bytes::from_static(b"127.0.0.1:3001"),
                Bytes::from_static(b"127.0.0.1:3002"),
                Bytes::from_static(b"127.0.0.1:3003"),
            ]
        );
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "ring": { "virtual_nodes": 3 } }"#).unwrap();

        assert!(matches!(
            config.ring,
            RingConfig {
                virtual_nodes: 3,
                hash_width: 64,
                hash_function: HashFunction::Murmur3,
            }
        ));
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn build_routing_table() {
        let config: Config = serde_json::from_str(
            r#"{
                "ring": { "virtual_nodes": 3, "hash_width": 32, "hash_function": "sha256" },
                "nodes": ["node1", "node2", "node3"]
            }"#,
        )
        .unwrap();

        let ring = config.build_partitioning_scheme().unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.vnode_count(), 9);
        assert_eq!(ring.hash_width(), 32);

        let table = config.build_routing_table().unwrap();
        assert_eq!(table.members().unwrap().len(), 3);
    }

    #[test]
    fn build_with_duplicated_nodes() {
        let config: Config = serde_json::from_str(
            r#"{ "ring": { "virtual_nodes": 3 }, "nodes": ["node1", "node1"] }"#,
        )
        .unwrap();

        assert!(matches!(
            config.build_partitioning_scheme(),
            Err(Error::Cluster(ClusterError::NodeAlreadyExists { .. }))
        ));
    }

    #[test]
    fn build_with_invalid_ring_parameters() {
        let config: Config =
            serde_json::from_str(r#"{ "ring": { "virtual_nodes": 0 } }"#).unwrap();

        assert!(matches!(
            config.build_routing_table(),
            Err(Error::Cluster(ClusterError::InvalidArgument { .. }))
        ));
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(
            serde_json::from_str::<Config>(r#"{ "ring": { "hash_width": 64 } }"#)
                .map_err(Error::from),
            Err(Error::InvalidConfig { .. })
        ));

        assert!(matches!(
            Config::from_path("conf/does_not_exist.json"),
            Err(Error::Io { .. })
        ));
    }
}
