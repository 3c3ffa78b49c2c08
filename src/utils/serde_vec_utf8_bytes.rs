//! serde helpers to represent a list of node ids (`Vec<Bytes>`) as a list of utf8 strings
use std::fmt;

use bytes::Bytes;
use serde::de::{SeqAccess, Visitor};
use serde::Serialize;
use serde::{Deserializer, Serializer};

pub fn serialize<S: Serializer>(v: &[Bytes], s: S) -> Result<S::Ok, S::Error> {
    let col: Vec<_> = v.iter().map(|b| String::from_utf8_lossy(b)).collect();
    col.serialize(s)
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Bytes>, D::Error> {
    struct NodeListParser;
    impl<'de> Visitor<'de> for NodeListParser {
        type Value = Vec<Bytes>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a list of node ids")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut v = Vec::with_capacity(seq.size_hint().unwrap_or_default());

            while let Some(elem) = seq.next_element::<String>()? {
                v.push(Bytes::from(elem));
            }

            Ok(v)
        }
    }

    d.deserialize_seq(NodeListParser)
}
