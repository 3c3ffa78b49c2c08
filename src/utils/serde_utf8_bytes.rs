//! serde helpers to represent a node id ([`Bytes`]) as a utf8 string
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde::{Deserializer, Serializer};

/// Serializes a node id as a utf8 [`String`]
///
/// # Errors
/// This function returns an error if the node id is not valid utf8
pub fn serialize<S: Serializer>(v: &Bytes, s: S) -> Result<S::Ok, S::Error> {
    let stringified = std::str::from_utf8(v).map_err(|e| {
        serde::ser::Error::custom(format!("node id is not a valid utf8 string - {}", e))
    })?;
    str::serialize(stringified, s)
}

/// Deserializes a utf8 [`String`] into a node id
pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
    let stringified = String::deserialize(d)?;
    Ok(Bytes::from(stringified))
}
