use super::*;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// An in-process store. Clones share the same contents.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    namespaces: Rc<RefCell<HashMap<String, Namespace>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, namespace: &str) -> error::Result<Namespace> {
        Ok(self
            .namespaces
            .borrow()
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, namespace: &str, values: &Namespace) -> error::Result<()> {
        self.namespaces
            .borrow_mut()
            .insert(namespace.to_owned(), values.clone());

        Ok(())
    }
}
