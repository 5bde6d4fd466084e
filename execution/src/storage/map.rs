use super::{decode_len, Storage, StorageError};
use crate::hashing::{storage_prefix, StorageHasher};
use commonware_codec::{Decode, Encode, EncodeSize, Read, Write};
use std::marker::PhantomData;

/// Typed map stored as one key per entry: `prefix ++ H::hash(encode(key))`.
pub struct StorageMap<K, V: Read, H> {
    prefix: [u8; 32],
    cfg: V::Cfg,
    default: Option<V>,
    _phantom: PhantomData<(K, H)>,
}

impl<K, V: Read<Cfg = ()>, H> StorageMap<K, V, H> {
    pub fn new(prefix: &str, name: &str) -> Self {
        Self::with_cfg(prefix, name, ())
    }
}

impl<K, V: Read, H> StorageMap<K, V, H> {
    pub fn with_cfg(prefix: &str, name: &str, cfg: V::Cfg) -> Self {
        Self {
            prefix: storage_prefix(prefix, name),
            cfg,
            default: None,
            _phantom: PhantomData,
        }
    }

    pub fn with_default(mut self, default: V) -> Self {
        self.default = Some(default);
        self
    }

    /// Shared prefix of every entry in the map.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Remove up to `limit` entries (all if `None`). Returns how many were removed.
    pub fn clear<S: Storage>(&self, storage: &mut S, limit: Option<u32>) -> u32 {
        storage.clear_prefix(&self.prefix, limit)
    }
}

impl<K: Write + EncodeSize, V: Read, H: StorageHasher> StorageMap<K, V, H> {
    pub fn key_for(&self, key: &K) -> Vec<u8> {
        let hashed = H::hash(&key.encode());
        let mut out = Vec::with_capacity(self.prefix.len() + hashed.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&hashed);
        out
    }

    pub fn exists<S: Storage>(&self, storage: &S, key: &K) -> bool {
        storage.exists(&self.key_for(key))
    }

    pub fn remove<S: Storage>(&self, storage: &mut S, key: &K) {
        storage.clear(&self.key_for(key));
    }

    pub fn decode_len<S: Storage>(&self, storage: &S, key: &K) -> Result<Option<u32>, StorageError> {
        decode_len(storage, &self.key_for(key))
    }

    pub fn append<S: Storage, I: Write + EncodeSize>(&self, storage: &mut S, key: &K, item: &I) {
        storage.append(&self.key_for(key), &item.encode());
    }
}

impl<K: Write + EncodeSize, V: Read + Encode, H: StorageHasher> StorageMap<K, V, H> {
    pub fn try_get<S: Storage>(&self, storage: &S, key: &K) -> Result<Option<V>, StorageError> {
        let key = self.key_for(key);
        let Some(raw) = storage.get(&key) else {
            return Ok(None);
        };
        V::decode_cfg(raw.as_slice(), &self.cfg)
            .map(Some)
            .map_err(|err| StorageError::decode(&key, err))
    }

    pub fn put<S: Storage>(&self, storage: &mut S, key: &K, value: &V) {
        storage.set(&self.key_for(key), &value.encode());
    }
}

impl<K: Write + EncodeSize, V: Read + Encode + Clone + Default, H: StorageHasher>
    StorageMap<K, V, H>
{
    pub fn get<S: Storage>(&self, storage: &S, key: &K) -> Result<V, StorageError> {
        Ok(self
            .try_get(storage, key)?
            .unwrap_or_else(|| self.default.clone().unwrap_or_default()))
    }

    pub fn take<S: Storage>(&self, storage: &mut S, key: &K) -> Result<V, StorageError> {
        let value = self.get(storage, key)?;
        self.remove(storage, key);
        Ok(value)
    }

    pub fn mutate<S: Storage, R>(
        &self,
        storage: &mut S,
        key: &K,
        f: impl FnOnce(&mut V) -> R,
    ) -> Result<R, StorageError> {
        let mut value = self.get(storage, key)?;
        let result = f(&mut value);
        self.put(storage, key, &value);
        Ok(result)
    }

    pub fn try_mutate<S: Storage, R, E: From<StorageError>>(
        &self,
        storage: &mut S,
        key: &K,
        f: impl FnOnce(&mut V) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut value = self.get(storage, key)?;
        let result = f(&mut value)?;
        self.put(storage, key, &value);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hashing::{twox_64, Identity, Twox64Concat},
        storage::Memory,
    };

    fn balances() -> StorageMap<u64, u64, Twox64Concat> {
        StorageMap::new("Test", "Balances")
    }

    #[test]
    fn test_key_layout() {
        let map = balances();
        let key = map.key_for(&5);
        assert_eq!(&key[..32], map.prefix());
        assert_eq!(&key[32..40], &twox_64(&5u64.encode()));
        assert_eq!(&key[40..], &5u64.encode()[..]);

        let identity: StorageMap<u64, u64, Identity> = StorageMap::new("Test", "Balances");
        assert_eq!(identity.key_for(&5).len(), 32 + 8);
    }

    #[test]
    fn test_entries_are_independent() {
        let mut storage = Memory::default();
        let map = balances();
        map.put(&mut storage, &1, &10);
        map.put(&mut storage, &2, &20);

        assert_eq!(map.get(&storage, &1).unwrap(), 10);
        assert_eq!(map.get(&storage, &2).unwrap(), 20);
        assert_eq!(map.get(&storage, &3).unwrap(), 0);

        assert_eq!(map.take(&mut storage, &1).unwrap(), 10);
        assert!(!map.exists(&storage, &1));
        assert!(map.exists(&storage, &2));
    }

    #[test]
    fn test_mutate_entry() {
        let mut storage = Memory::default();
        let map = balances().with_default(100);
        map.mutate(&mut storage, &9, |balance| *balance -= 1).unwrap();
        assert_eq!(map.get(&storage, &9).unwrap(), 99);

        let failed: Result<(), anyhow::Error> = map.try_mutate(&mut storage, &9, |balance| {
            *balance = 0;
            anyhow::bail!("insufficient")
        });
        assert!(failed.is_err());
        assert_eq!(map.get(&storage, &9).unwrap(), 99);
    }

    #[test]
    fn test_clear_with_limit() {
        let mut storage = Memory::default();
        let map = balances();
        let other: StorageMap<u64, u64, Twox64Concat> = StorageMap::new("Test", "Other");
        for key in 0..5u64 {
            map.put(&mut storage, &key, &key);
        }
        other.put(&mut storage, &0, &1);

        assert_eq!(map.clear(&mut storage, Some(3)), 3);
        assert_eq!(map.clear(&mut storage, None), 2);
        assert_eq!(map.clear(&mut storage, None), 0);
        assert!(other.exists(&storage, &0));
    }
}
