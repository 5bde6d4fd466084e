//! Nested, depth-bounded storage layers.
//!
//! Each layer is a change set on the host storage that is either committed
//! into its parent or discarded. The current depth lives in storage under
//! [TRANSACTION_LEVEL_KEY] so it survives across calls that share a store.

use crate::storage::{StorageError, StorageValue, TransactionalStorage};
use std::{
    ops::{Deref, DerefMut},
    panic::{self, AssertUnwindSafe},
};
use tessera_types::DispatchError;
use tracing::{error, warn};

/// Raw storage key holding the current nesting depth.
pub const TRANSACTION_LEVEL_KEY: &[u8] = b":transaction_level:";

/// Maximum number of nested layers.
pub const TRANSACTIONAL_LIMIT: u32 = 255;

/// Result of a closure run inside [with_transaction].
#[derive(Debug, PartialEq, Eq)]
pub enum TransactionOutcome<T, E> {
    Commit(T),
    Rollback(E),
}

fn level() -> StorageValue<u32> {
    StorageValue::unhashed(TRANSACTION_LEVEL_KEY)
}

/// Current nesting depth (0 when no layer is open).
///
/// An undecodable counter is reported as [TRANSACTIONAL_LIMIT] so no further
/// layer can be opened on top of corrupt state.
pub fn transaction_level<S: TransactionalStorage>(storage: &S) -> u32 {
    match level().get(storage) {
        Ok(level) => level,
        Err(err) => {
            error!(?err, "transaction level is corrupt");
            TRANSACTIONAL_LIMIT
        }
    }
}

/// Fails with [DispatchError::TransactionalLimitReached] at the limit.
pub fn inc_transaction_level<S: TransactionalStorage>(storage: &mut S) -> Result<(), DispatchError> {
    let current = transaction_level(storage);
    if current >= TRANSACTIONAL_LIMIT {
        return Err(DispatchError::TransactionalLimitReached);
    }
    level().put(storage, &(current + 1));
    Ok(())
}

pub fn dec_transaction_level<S: TransactionalStorage>(storage: &mut S) {
    match transaction_level(storage) {
        0 => warn!("unbalanced transactional layer; level already at zero"),
        1 => level().clear(storage),
        current => level().put(storage, &(current - 1)),
    }
}

/// Fails with [DispatchError::TransactionalNoLayer] when called outside any layer.
pub fn require_transaction<S: TransactionalStorage>(storage: &S) -> Result<(), DispatchError> {
    if transaction_level(storage) == 0 {
        return Err(DispatchError::TransactionalNoLayer);
    }
    Ok(())
}

/// An open storage layer.
///
/// Dereferences to the underlying storage. Dropping it without calling
/// [StorageLayer::commit] or [StorageLayer::rollback] rolls it back.
pub struct StorageLayer<'a, S: TransactionalStorage> {
    storage: &'a mut S,
    resolved: bool,
}

impl<'a, S: TransactionalStorage> StorageLayer<'a, S> {
    /// Increment the level, then open a change set.
    pub fn open(storage: &'a mut S) -> Result<Self, DispatchError> {
        inc_transaction_level(storage)?;
        storage.start_transaction();
        Ok(Self {
            storage,
            resolved: false,
        })
    }

    pub fn commit(mut self) -> Result<(), StorageError> {
        self.resolved = true;
        let result = self.storage.commit_transaction();
        dec_transaction_level(self.storage);
        result
    }

    pub fn rollback(mut self) -> Result<(), StorageError> {
        self.resolved = true;
        let result = self.storage.rollback_transaction();
        dec_transaction_level(self.storage);
        result
    }
}

impl<S: TransactionalStorage> Deref for StorageLayer<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.storage
    }
}

impl<S: TransactionalStorage> DerefMut for StorageLayer<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.storage
    }
}

impl<S: TransactionalStorage> Drop for StorageLayer<'_, S> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        error!("storage layer dropped without commit or rollback; rolling back");
        if let Err(err) = self.storage.rollback_transaction() {
            error!(?err, "failed to roll back abandoned storage layer");
        }
        dec_transaction_level(self.storage);
    }
}

/// Run `f` in a new layer, committing or rolling back according to its outcome.
///
/// A panic inside `f` rolls the layer back and is reported as
/// [DispatchError::Other].
pub fn with_transaction<S, T, E, F>(storage: &mut S, f: F) -> Result<T, E>
where
    S: TransactionalStorage,
    E: From<DispatchError>,
    F: FnOnce(&mut S) -> TransactionOutcome<T, E>,
{
    let mut layer = StorageLayer::open(storage)?;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut layer)));
    match outcome {
        Ok(TransactionOutcome::Commit(value)) => {
            layer.commit().map_err(storage_failure)?;
            Ok(value)
        }
        Ok(TransactionOutcome::Rollback(err)) => {
            layer.rollback().map_err(storage_failure)?;
            Err(err)
        }
        Err(_) => {
            error!("transactional closure panicked; rolling back");
            layer.rollback().map_err(storage_failure)?;
            Err(DispatchError::other("transactional closure panicked").into())
        }
    }
}

/// [with_transaction] for closures returning `Result`: `Ok` commits, `Err` rolls back.
pub fn with_storage_layer<S, T, E, F>(storage: &mut S, f: F) -> Result<T, E>
where
    S: TransactionalStorage,
    E: From<DispatchError>,
    F: FnOnce(&mut S) -> Result<T, E>,
{
    with_transaction(storage, |storage| match f(storage) {
        Ok(value) => TransactionOutcome::Commit(value),
        Err(err) => TransactionOutcome::Rollback(err),
    })
}

fn storage_failure<E: From<DispatchError>>(err: StorageError) -> E {
    error!(?err, "storage layer could not be closed");
    DispatchError::other(err.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Memory, Storage};

    fn counter() -> StorageValue<u64> {
        StorageValue::new("Test", "Counter")
    }

    #[test]
    fn test_level_counts_up_to_limit() {
        let mut storage = Memory::default();
        for _ in 0..TRANSACTIONAL_LIMIT {
            inc_transaction_level(&mut storage).unwrap();
        }
        assert_eq!(transaction_level(&storage), 255);
        assert_eq!(
            inc_transaction_level(&mut storage),
            Err(DispatchError::TransactionalLimitReached)
        );
        assert_eq!(transaction_level(&storage), 255);
    }

    #[test]
    fn test_dec_clears_key_at_one_and_ignores_zero() {
        let mut storage = Memory::default();
        dec_transaction_level(&mut storage);
        assert!(!storage.exists(TRANSACTION_LEVEL_KEY));

        inc_transaction_level(&mut storage).unwrap();
        inc_transaction_level(&mut storage).unwrap();
        dec_transaction_level(&mut storage);
        assert_eq!(transaction_level(&storage), 1);
        dec_transaction_level(&mut storage);
        assert!(!storage.exists(TRANSACTION_LEVEL_KEY));
        assert!(storage.entries().is_empty());
    }

    #[test]
    fn test_commit_keeps_writes() {
        let mut storage = Memory::default();
        let value: Result<u64, DispatchError> = with_transaction(&mut storage, |storage| {
            counter().put(storage, &7);
            TransactionOutcome::Commit(7)
        });
        assert_eq!(value, Ok(7));
        assert_eq!(counter().get(&storage).unwrap(), 7);
        assert_eq!(transaction_level(&storage), 0);
        assert_eq!(storage.transaction_depth(), 0);
    }

    #[test]
    fn test_rollback_restores_state() {
        let mut storage = Memory::default();
        counter().put(&mut storage, &1);
        let before = storage.entries();

        let result: Result<(), DispatchError> = with_transaction(&mut storage, |storage| {
            counter().put(storage, &2);
            storage.set(b"other", b"x");
            TransactionOutcome::Rollback(DispatchError::BadOrigin)
        });
        assert_eq!(result, Err(DispatchError::BadOrigin));
        assert_eq!(storage.entries(), before);
    }

    #[test]
    fn test_nested_rollback_keeps_outer_writes() {
        let mut storage = Memory::default();
        let result: Result<(), DispatchError> = with_storage_layer(&mut storage, |storage| {
            counter().put(storage, &1);
            let inner: Result<(), DispatchError> = with_storage_layer(storage, |storage| {
                assert_eq!(transaction_level(storage), 2);
                counter().put(storage, &2);
                Err(DispatchError::other("inner failed"))
            });
            assert!(inner.is_err());
            assert_eq!(counter().get(storage).unwrap(), 1);
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(counter().get(&storage).unwrap(), 1);
        assert_eq!(transaction_level(&storage), 0);
    }

    #[test]
    fn test_nesting_limit_is_enforced() {
        fn nest(storage: &mut Memory, depth: u32, max_depth: &mut u32) -> Result<(), DispatchError> {
            with_storage_layer(storage, |storage| {
                *max_depth = (*max_depth).max(depth);
                nest(storage, depth + 1, max_depth)
            })
        }

        let mut storage = Memory::default();
        let mut max_depth = 0;
        let result = nest(&mut storage, 1, &mut max_depth);
        assert_eq!(result, Err(DispatchError::TransactionalLimitReached));
        assert_eq!(max_depth, TRANSACTIONAL_LIMIT);
        assert_eq!(transaction_level(&storage), 0);
        assert_eq!(storage.transaction_depth(), 0);
    }

    #[test]
    fn test_panic_rolls_back_and_decrements() {
        let mut storage = Memory::default();
        let result: Result<(), DispatchError> = with_transaction(&mut storage, |storage| {
            counter().put(storage, &9);
            panic!("boom");
        });
        assert!(matches!(result, Err(DispatchError::Other(_))));
        assert!(storage.entries().is_empty());
        assert_eq!(storage.transaction_depth(), 0);
    }

    #[test]
    fn test_dropped_layer_rolls_back() {
        let mut storage = Memory::default();
        {
            let mut layer = StorageLayer::open(&mut storage).unwrap();
            counter().put(&mut *layer, &3);
        }
        assert!(storage.entries().is_empty());
    }

    #[test]
    fn test_require_transaction() {
        let mut storage = Memory::default();
        assert_eq!(
            require_transaction(&storage),
            Err(DispatchError::TransactionalNoLayer)
        );
        let result: Result<(), DispatchError> =
            with_storage_layer(&mut storage, |storage| require_transaction(storage));
        assert!(result.is_ok());
    }
}
