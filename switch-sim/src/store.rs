//! Typed Value Store: hierarchical key → tagged scalar.
//!
//! A key's type tag is fixed by its first write. Later writes carrying a
//! different tag are rejected and the previous value stays in place.

use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;

/// Tagged scalar held under one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OidValue {
    OctetString(Vec<u8>),
    Integer(i32),
    /// Wraps at 2^32.
    Counter32(u32),
    Gauge32(u32),
    /// Hundredths of a second.
    TimeTicks(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    OctetString,
    Integer,
    Counter32,
    Gauge32,
    TimeTicks,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::OctetString => "OctetString",
            ValueKind::Integer => "Integer",
            ValueKind::Counter32 => "Counter32",
            ValueKind::Gauge32 => "Gauge32",
            ValueKind::TimeTicks => "TimeTicks",
        };
        f.write_str(name)
    }
}

impl OidValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            OidValue::OctetString(_) => ValueKind::OctetString,
            OidValue::Integer(_) => ValueKind::Integer,
            OidValue::Counter32(_) => ValueKind::Counter32,
            OidValue::Gauge32(_) => ValueKind::Gauge32,
            OidValue::TimeTicks(_) => ValueKind::TimeTicks,
        }
    }

    pub fn text(value: &str) -> Self {
        OidValue::OctetString(value.as_bytes().to_vec())
    }

    /// Cumulative 64-bit counter reduced modulo 2^32.
    pub fn counter(cumulative: u64) -> Self {
        OidValue::Counter32(cumulative as u32)
    }
}

#[derive(Debug, Default)]
pub struct OidStore {
    entries: RwLock<BTreeMap<String, OidValue>>,
}

impl OidStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<OidValue> {
        self.entries.read().get(key).cloned()
    }

    /// Inserts a new key or replaces the value of an existing one with the same tag.
    pub fn upsert(&self, key: &str, value: OidValue) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(current) if current.kind() != value.kind() => Err(StoreError::TypeMismatch {
                key: key.to_string(),
                established: current.kind(),
                offered: value.kind(),
            }),
            Some(current) => {
                *current = value;
                Ok(())
            }
            None => {
                entries.insert(key.to_string(), value);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Every entry at or below `prefix`, in key order.
    pub fn walk(&self, prefix: &str) -> Vec<(String, OidValue)> {
        let subtree = format!("{prefix}.");
        self.entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.as_str() == prefix || key.starts_with(&subtree))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
