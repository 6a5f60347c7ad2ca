// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! `serde(with = "fixed_name")`: a node name packed into a constant-width
//! byte array, so a node record has the same `sizeof` no matter how long its
//! name is (truncated, not rejected — matching the original's silent
//! `strncpy` into `char name[100]`).
//!
//! `[u8; N]` for large `N` doesn't derive `Serialize`/`Deserialize` the way a
//! tuple of primitives would, so this is hand-rolled, the way the teacher
//! hand-rolls `serialize_rawhandle`/`deserialize_rawhandle` for platform
//! handle fields serde can't derive for.

use std::fmt;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserializer, Serializer};

use super::types::NODE_NAME_LEN;

pub fn pack(name: &str) -> [u8; NODE_NAME_LEN] {
    let mut buf = [0u8; NODE_NAME_LEN];
    let bytes = name.as_bytes();
    let n = bytes.len().min(NODE_NAME_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

pub fn unpack(buf: &[u8; NODE_NAME_LEN]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(NODE_NAME_LEN);
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

pub fn serialize<S: Serializer>(name: &str, serializer: S) -> Result<S::Ok, S::Error> {
    let packed = pack(name);
    let mut tup = serializer.serialize_tuple(NODE_NAME_LEN)?;
    for byte in packed {
        tup.serialize_element(&byte)?;
    }
    tup.end()
}

struct NameVisitor;

impl<'de> Visitor<'de> for NameVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NODE_NAME_LEN} bytes of node name")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut buf = [0u8; NODE_NAME_LEN];
        for slot in buf.iter_mut() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| serde::de::Error::invalid_length(NODE_NAME_LEN, &self))?;
        }
        Ok(unpack(&buf))
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_tuple(NODE_NAME_LEN, NameVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_short_name() {
        let packed = pack("sort");
        assert_eq!(unpack(&packed), "sort");
    }

    #[test]
    fn truncates_overlong_name() {
        let long = "x".repeat(NODE_NAME_LEN + 20);
        let packed = pack(&long);
        assert_eq!(unpack(&packed).len(), NODE_NAME_LEN);
    }
}
