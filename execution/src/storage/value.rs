use super::{decode_len, Storage, StorageError};
use crate::hashing::storage_prefix;
use commonware_codec::{Decode, Encode, EncodeSize, Read, Write};

/// A single typed value stored under a fixed key.
pub struct StorageValue<T: Read> {
    key: Vec<u8>,
    cfg: T::Cfg,
    default: Option<T>,
}

impl<T: Read<Cfg = ()>> StorageValue<T> {
    /// Key derived as `twox_128(prefix) ++ twox_128(name)`.
    pub fn new(prefix: &str, name: &str) -> Self {
        Self::with_cfg(prefix, name, ())
    }

    /// Raw key, used for well-known keys shared with the host.
    pub fn unhashed(key: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            cfg: (),
            default: None,
        }
    }
}

impl<T: Read> StorageValue<T> {
    pub fn with_cfg(prefix: &str, name: &str, cfg: T::Cfg) -> Self {
        Self {
            key: storage_prefix(prefix, name).to_vec(),
            cfg,
            default: None,
        }
    }

    /// Value returned by [StorageValue::get] when nothing is stored.
    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn exists<S: Storage>(&self, storage: &S) -> bool {
        storage.exists(&self.key)
    }

    pub fn clear<S: Storage>(&self, storage: &mut S) {
        storage.clear(&self.key);
    }

    /// Number of items in a stored sequence, without decoding the items.
    pub fn decode_len<S: Storage>(&self, storage: &S) -> Result<Option<u32>, StorageError> {
        decode_len(storage, &self.key)
    }

    pub fn append<S: Storage, I: Write + EncodeSize>(&self, storage: &mut S, item: &I) {
        storage.append(&self.key, &item.encode());
    }
}

impl<T: Read + Encode> StorageValue<T> {
    pub fn try_get<S: Storage>(&self, storage: &S) -> Result<Option<T>, StorageError> {
        let Some(raw) = storage.get(&self.key) else {
            return Ok(None);
        };
        T::decode_cfg(raw.as_slice(), &self.cfg)
            .map(Some)
            .map_err(|err| StorageError::decode(&self.key, err))
    }

    pub fn put<S: Storage>(&self, storage: &mut S, value: &T) {
        storage.set(&self.key, &value.encode());
    }
}

impl<T: Read + Encode + Clone + Default> StorageValue<T> {
    /// Stored value, or the configured default, or `T::default()`.
    pub fn get<S: Storage>(&self, storage: &S) -> Result<T, StorageError> {
        Ok(self
            .try_get(storage)?
            .unwrap_or_else(|| self.default.clone().unwrap_or_default()))
    }

    /// Read then clear.
    pub fn take<S: Storage>(&self, storage: &mut S) -> Result<T, StorageError> {
        let value = self.get(storage)?;
        self.clear(storage);
        Ok(value)
    }

    pub fn mutate<S: Storage, R>(
        &self,
        storage: &mut S,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StorageError> {
        let mut value = self.get(storage)?;
        let result = f(&mut value);
        self.put(storage, &value);
        Ok(result)
    }

    /// Like [StorageValue::mutate], but nothing is written if `f` fails.
    pub fn try_mutate<S: Storage, R, E: From<StorageError>>(
        &self,
        storage: &mut S,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut value = self.get(storage)?;
        let result = f(&mut value)?;
        self.put(storage, &value);
        Ok(result)
    }
}
