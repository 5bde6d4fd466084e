use super::{Storage, StorageError, TransactionalStorage};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Status {
    Update(Vec<u8>),
    Delete,
}

/// In-memory storage with a stack of pending change sets.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    state: BTreeMap<Vec<u8>, Vec<u8>>,
    pending: Vec<BTreeMap<Vec<u8>, Status>>,
}

impl Memory {
    /// Every visible key-value pair, with pending change sets applied.
    pub fn entries(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        let mut entries = self.state.clone();
        for layer in &self.pending {
            for (key, status) in layer {
                match status {
                    Status::Update(value) => {
                        entries.insert(key.clone(), value.clone());
                    }
                    Status::Delete => {
                        entries.remove(key);
                    }
                }
            }
        }
        entries
    }

    fn visible_keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        self.entries()
            .into_keys()
            .filter(|key| key.starts_with(prefix))
            .collect()
    }
}

impl Storage for Memory {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        for layer in self.pending.iter().rev() {
            match layer.get(key) {
                Some(Status::Update(value)) => return Some(value.clone()),
                Some(Status::Delete) => return None,
                None => {}
            }
        }
        self.state.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        match self.pending.last_mut() {
            Some(layer) => {
                layer.insert(key.to_vec(), Status::Update(value.to_vec()));
            }
            None => {
                self.state.insert(key.to_vec(), value.to_vec());
            }
        }
    }

    fn clear(&mut self, key: &[u8]) {
        match self.pending.last_mut() {
            Some(layer) => {
                layer.insert(key.to_vec(), Status::Delete);
            }
            None => {
                self.state.remove(key);
            }
        }
    }

    fn clear_prefix(&mut self, prefix: &[u8], limit: Option<u32>) -> u32 {
        let keys = self.visible_keys_with_prefix(prefix);
        let limit = limit.map_or(keys.len(), |limit| limit as usize);
        let mut removed = 0;
        for key in keys.into_iter().take(limit) {
            self.clear(&key);
            removed += 1;
        }
        removed
    }
}

impl TransactionalStorage for Memory {
    fn start_transaction(&mut self) {
        self.pending.push(BTreeMap::new());
    }

    fn commit_transaction(&mut self) -> Result<(), StorageError> {
        let changes = self
            .pending
            .pop()
            .ok_or(StorageError::NoOpenTransaction { action: "commit" })?;
        for (key, status) in changes {
            match status {
                Status::Update(value) => self.set(&key, &value),
                Status::Delete => self.clear(&key),
            }
        }
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<(), StorageError> {
        self.pending
            .pop()
            .ok_or(StorageError::NoOpenTransaction { action: "rollback" })?;
        Ok(())
    }

    fn transaction_depth(&self) -> usize {
        self.pending.len()
    }
}
