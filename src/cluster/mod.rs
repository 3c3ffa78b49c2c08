//! Module that contains the key-to-node routing algorithms
pub mod error;
pub mod partitioning;
pub mod routing_table;
