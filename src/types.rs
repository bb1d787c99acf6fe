//! # Types
//!
//! Types used throughout the application.
//!
//! Redis is originally a simple in-memory key-value data store. Here the keyspace maps keys to a
//! single tagged [`Value`] rather than mixing two differently-shaped collections, so a key can
//! never simultaneously hold a string and a list.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Primary key.
pub type StorageKey = String;

/// Absolute wall-clock instant at which a [`Value::StringValue`] becomes logically absent.
/// `None` means the key has no TTL.
pub type Expiry = Option<Instant>;

/// A value stored in the keyspace.
///
/// A key is either absent or present with exactly one of these variants; a key can never
/// simultaneously hold both shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string with an optional expiration instant.
    StringValue { data: String, expiry: Expiry },
    /// A list. Lists carry no TTL.
    ListValue { items: Vec<String> },
}

impl Value {
    /// `true` if this is a [`Value::StringValue`] whose `expiry` is in the past.
    pub fn is_expired(&self) -> bool {
        match self {
            Value::StringValue { expiry: Some(at), .. } => *at <= Instant::now(),
            _ => false,
        }
    }
}

/// The keyspace: a mapping from key to [`Value`].
pub type Keyspace = HashMap<StorageKey, Value>;

/// Wrapper around [`Keyspace`] that makes it safely shared across connection tasks and the
/// sweeper. A single lock over the whole map is sufficient: no command holds it across an
/// `.await` point, so a synchronous [`RwLock`] is the right tool, not `tokio::sync`'s.
pub type SharedKeyspace = Arc<RwLock<Keyspace>>;
