//! Scoped key-value persistence.
//!
//! Every namespace is read and written as a whole. A `save` replaces the
//! previous contents of exactly one namespace and never touches any other, so
//! an interrupted write can lose at most the update being written.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error;

use std::collections::BTreeMap;

use serde_json::Value;

pub trait KeyValueStore {
    /// Loads a namespace. A namespace that was never written is empty.
    fn load(&self, namespace: &str) -> error::Result<Namespace>;

    /// Replaces the whole namespace with `values`.
    fn save(&self, namespace: &str, values: &Namespace) -> error::Result<()>;

    fn clear(&self, namespace: &str) -> error::Result<()> {
        self.save(namespace, &Namespace::default())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &'_ S {
    fn load(&self, namespace: &str) -> error::Result<Namespace> {
        (**self).load(namespace)
    }

    fn save(&self, namespace: &str, values: &Namespace) -> error::Result<()> {
        (**self).save(namespace, values)
    }
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Namespace(BTreeMap<String, Value>);

impl Namespace {
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), Value::from(value));
    }

    pub fn put_str(&mut self, key: impl Into<String>, value: &str) {
        self.0.insert(key.into(), Value::from(value));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
