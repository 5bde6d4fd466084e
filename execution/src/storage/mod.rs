//! Raw key-value storage and the typed cells built on top of it.
//!
//! The host supplies a [Storage] (plain reads and writes) that also implements
//! [TransactionalStorage] (nested change sets). Everything above this module
//! talks to storage through [StorageValue] and [StorageMap].

use commonware_codec::{varint::UInt, ReadExt, Write};
use commonware_utils::hex;
use thiserror::Error as ThisError;

mod map;
mod value;

pub use map::StorageMap;
pub use value::StorageValue;

#[cfg(any(test, feature = "mocks"))]
mod memory;
#[cfg(any(test, feature = "mocks"))]
pub use memory::Memory;

/// Longest varint encoding of a `u32` length prefix.
const MAX_LENGTH_PREFIX: usize = 5;

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("failed to decode value at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("no open transaction to {action}")]
    NoOpenTransaction { action: &'static str },
}

impl StorageError {
    pub(crate) fn decode(key: &[u8], source: commonware_codec::Error) -> Self {
        Self::Decode {
            key: hex(key),
            source,
        }
    }
}

/// Byte-level storage provided by the host.
pub trait Storage {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn clear(&mut self, key: &[u8]);

    /// Remove up to `limit` keys starting with `prefix` (all of them if `None`).
    /// Returns the number of keys removed.
    fn clear_prefix(&mut self, prefix: &[u8], limit: Option<u32>) -> u32;

    fn exists(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Copy the value at `key`, starting at `offset`, into `out`.
    ///
    /// Returns the number of bytes available from `offset` (which may exceed
    /// `out.len()`), or `None` if the key is absent.
    fn read(&self, key: &[u8], out: &mut [u8], offset: u32) -> Option<u32> {
        let value = self.get(key)?;
        let start = (offset as usize).min(value.len());
        let remaining = &value[start..];
        let copied = remaining.len().min(out.len());
        out[..copied].copy_from_slice(&remaining[..copied]);
        Some(remaining.len() as u32)
    }

    /// Append an encoded item to a length-prefixed sequence stored at `key`.
    ///
    /// A missing or undecodable value is replaced by a one-item sequence.
    fn append(&mut self, key: &[u8], item: &[u8]) {
        let existing = self.get(key);
        let mut value = Vec::new();
        match existing.as_deref().and_then(split_length_prefix) {
            Some((count, items)) => {
                UInt(count.saturating_add(1)).write(&mut value);
                value.extend_from_slice(items);
            }
            None => UInt(1u32).write(&mut value),
        }
        value.extend_from_slice(item);
        self.set(key, &value);
    }
}

/// Nested change sets over a [Storage].
///
/// Writes made after [TransactionalStorage::start_transaction] are only kept
/// if the matching [TransactionalStorage::commit_transaction] runs.
pub trait TransactionalStorage: Storage {
    fn start_transaction(&mut self);
    fn commit_transaction(&mut self) -> Result<(), StorageError>;
    fn rollback_transaction(&mut self) -> Result<(), StorageError>;
    /// Number of currently open change sets.
    fn transaction_depth(&self) -> usize;
}

/// Split a stored sequence into its item count and the encoded items.
fn split_length_prefix(value: &[u8]) -> Option<(u32, &[u8])> {
    let mut reader = value;
    let count: u32 = UInt::<u32>::read(&mut reader).ok()?.into();
    Some((count, reader))
}

/// Read only the length prefix of the sequence at `key`.
pub(crate) fn decode_len<S: Storage>(storage: &S, key: &[u8]) -> Result<Option<u32>, StorageError> {
    let mut prefix = [0u8; MAX_LENGTH_PREFIX];
    let Some(available) = storage.read(key, &mut prefix, 0) else {
        return Ok(None);
    };
    let mut reader = &prefix[..(available as usize).min(MAX_LENGTH_PREFIX)];
    let count: u32 = UInt::<u32>::read(&mut reader)
        .map_err(|err| StorageError::decode(key, err))?
        .into();
    Ok(Some(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_with_offset() {
        let mut storage = Memory::default();
        storage.set(b"key", &[1, 2, 3, 4]);

        let mut out = [0u8; 2];
        assert_eq!(storage.read(b"key", &mut out, 1), Some(3));
        assert_eq!(out, [2, 3]);
        assert_eq!(storage.read(b"key", &mut out, 9), Some(0));
        assert_eq!(storage.read(b"missing", &mut out, 0), None);
    }

    #[test]
    fn test_append_builds_sequence() {
        let mut storage = Memory::default();
        storage.append(b"list", &[7]);
        storage.append(b"list", &[8]);
        assert_eq!(storage.get(b"list"), Some(vec![2, 7, 8]));
        assert_eq!(decode_len(&storage, b"list").unwrap(), Some(2));
        assert_eq!(decode_len(&storage, b"missing").unwrap(), None);
    }

    #[test]
    fn test_append_replaces_garbage() {
        let mut storage = Memory::default();
        // Unterminated varint.
        storage.set(b"list", &[0x80]);
        storage.append(b"list", &[9]);
        assert_eq!(storage.get(b"list"), Some(vec![1, 9]));
    }

    #[test]
    fn test_decode_len_reads_large_prefix() {
        let mut storage = Memory::default();
        let mut value = Vec::new();
        UInt(300u32).write(&mut value);
        value.extend_from_slice(&[0u8; 16]);
        storage.set(b"list", &value);
        assert_eq!(decode_len(&storage, b"list").unwrap(), Some(300));
    }
}
