//! # Keyspace Engine
//!
//! Owns the mapping from keys to typed [`Value`]s and exposes the command-level operations a
//! minimal keyspace needs. Every operation here is atomic with respect to every other: each
//! takes the single keyspace-wide write lock for its full read-modify-write sequence, including
//! the lazy-expiry check it performs on the way in.
//!
//! [COMMAND](https://redis.io/docs/latest/commands/command/): Redis command names are
//! case-insensitive, handled by [`crate::cmd`] before reaching here.

use crate::errors::CmdError;
use crate::resp::Frame;
use crate::types::{Expiry, Keyspace, SharedKeyspace, Value};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

fn wrongtype() -> Frame {
    Frame::error(CmdError::WrongType.to_string())
}

/// The shared, concurrently-accessed keyspace.
///
/// Cloning a [`Store`] is cheap: it just clones the inner [`Arc`], so every connection task and
/// the sweeper hold the same map.
#[derive(Debug, Clone)]
pub struct Store {
    keyspace: SharedKeyspace,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            keyspace: Arc::new(RwLock::new(Keyspace::new())),
        }
    }

    /// Hands out a clone of the underlying [`SharedKeyspace`], for the sweeper (`crate::expiry`)
    /// to enumerate and delete expired keys with the same locking discipline as the commands
    /// below.
    pub fn shared_keyspace(&self) -> SharedKeyspace {
        Arc::clone(&self.keyspace)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Keyspace> {
        self.keyspace.write().expect("keyspace lock poisoned")
    }

    /// `SET key value [EX seconds | PX millis]`. Always overwrites any existing value/type.
    pub fn set(&self, key: String, data: String, expiry: Expiry) -> Frame {
        let mut map = self.write();
        map.insert(key, Value::StringValue { data, expiry });
        Frame::SimpleString("OK".into())
    }

    /// `GET key`
    pub fn get(&self, key: &str) -> Frame {
        let mut map = self.write();
        lazy_expire(&mut map, key);
        match map.get(key) {
            None => Frame::BulkString(None),
            Some(Value::StringValue { data, .. }) => Frame::BulkString(Some(data.clone())),
            Some(Value::ListValue { .. }) => wrongtype(),
        }
    }

    /// `INCR key`
    pub fn incr(&self, key: &str) -> Frame {
        self.incr_by(key, 1)
    }

    /// `DECR key`
    pub fn decr(&self, key: &str) -> Frame {
        self.incr_by(key, -1)
    }

    fn incr_by(&self, key: &str, delta: i64) -> Frame {
        let mut map = self.write();
        lazy_expire(&mut map, key);
        match map.get(key) {
            None => {
                map.insert(
                    key.to_string(),
                    Value::StringValue {
                        data: delta.to_string(),
                        expiry: None,
                    },
                );
                Frame::Integer(delta)
            }
            Some(Value::ListValue { .. }) => wrongtype(),
            Some(Value::StringValue { data, expiry }) => {
                let current: Option<i64> = data.parse().ok();
                match current.and_then(|n| n.checked_add(delta)) {
                    None => Frame::error("value is not an integer or out of range"),
                    Some(new_value) => {
                        let expiry = *expiry;
                        map.insert(
                            key.to_string(),
                            Value::StringValue {
                                data: new_value.to_string(),
                                expiry,
                            },
                        );
                        Frame::Integer(new_value)
                    }
                }
            }
        }
    }

    /// `EXISTS key...`. Counts keys currently present, lazily deleting any that have expired
    /// during the scan.
    pub fn exists(&self, keys: &[String]) -> Frame {
        let mut map = self.write();
        let mut count: i64 = 0;
        for key in keys {
            lazy_expire(&mut map, key);
            if map.contains_key(key) {
                count += 1;
            }
        }
        Frame::Integer(count)
    }

    /// `LPUSH key v1 v2 ... vk`. Prepends each argument in order, so `vk` ends up at the head.
    pub fn lpush(&self, key: &str, values: &[String]) -> Frame {
        let mut map = self.write();
        lazy_expire(&mut map, key);
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Value::ListValue { items: Vec::new() });
        match entry {
            Value::StringValue { .. } => wrongtype(),
            Value::ListValue { items } => {
                for value in values {
                    items.insert(0, value.clone());
                }
                Frame::Integer(items.len() as i64)
            }
        }
    }

    /// `RPUSH key v1 v2 ... vk`. Appends the arguments to the tail, in order.
    pub fn rpush(&self, key: &str, values: &[String]) -> Frame {
        let mut map = self.write();
        lazy_expire(&mut map, key);
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Value::ListValue { items: Vec::new() });
        match entry {
            Value::StringValue { .. } => wrongtype(),
            Value::ListValue { items } => {
                items.extend(values.iter().cloned());
                Frame::Integer(items.len() as i64)
            }
        }
    }

    /// `LRANGE key start stop`. Inclusive, Python-style negative indexing.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> Frame {
        let mut map = self.write();
        lazy_expire(&mut map, key);
        match map.get(key) {
            None => Frame::Array(Some(Vec::new())),
            Some(Value::StringValue { .. }) => wrongtype(),
            Some(Value::ListValue { items }) => {
                let len = items.len() as i64;
                let start = if start < 0 { (start + len).max(0) } else { start };
                let stop = if stop < 0 { stop + len } else { stop };
                let start = start.clamp(0, len);
                let stop = stop.clamp(-1, len - 1);
                if start > stop {
                    return Frame::Array(Some(Vec::new()));
                }
                let slice = &items[start as usize..=stop as usize];
                Frame::Array(Some(
                    slice
                        .iter()
                        .cloned()
                        .map(|item| Frame::BulkString(Some(item)))
                        .collect(),
                ))
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Deletes `key` from `map` if it holds a [`Value::StringValue`] whose expiry has elapsed.
///
/// Called at the top of every operation that reads or mutates a single key: any read of a
/// `StringValue` whose expiry has passed must behave as if the key were absent, and the key is
/// removed from the mapping before returning.
fn lazy_expire(map: &mut Keyspace, key: &str) {
    if matches!(map.get(key), Some(v) if v.is_expired()) {
        map.remove(key);
    }
}
