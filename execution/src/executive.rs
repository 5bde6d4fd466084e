//! Drives the extension chain around a dispatch.
//!
//! ## Applying an extrinsic
//! 1. Open a storage layer.
//! 2. Run `pre_dispatch` (or `pre_dispatch_unsigned`). A failure rolls the
//!    layer back, so no check leaves a partial write behind.
//! 3. Run the dispatch in a nested layer. A failed dispatch only discards its
//!    own writes; the nonce and weight charged in step 2 stay.
//! 4. Run `post_dispatch` with the actual cost and record the outcome.

use crate::{
    config::ValidatedConfig,
    extensions::{lookup_failed, Extra},
    storage::{Storage, StorageError, TransactionalStorage},
    system,
    transactional::with_storage_layer,
};
use tessera_types::{
    AccountId, BlockNumber, DispatchClass, DispatchError, DispatchInfo, DispatchResult,
    DispatchResultWithPostInfo, Hash, InvalidTransaction, TransactionValidity,
    TransactionValidityError,
};
use thiserror::Error as ThisError;
use tracing::{debug, warn};

/// Why an extrinsic could not be applied at all.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ApplyError {
    #[error(transparent)]
    Validity(#[from] TransactionValidityError),
    #[error("could not open storage layer: {0}")]
    Layer(#[from] DispatchError),
}

/// Outer `Err`: the extrinsic was rejected and left no trace.
/// Inner `Err`: it was included but its dispatch failed.
pub type ApplyExtrinsicResult = Result<DispatchResult, ApplyError>;

/// Seed an empty store with the configured genesis hash.
pub fn initialize_genesis<S: Storage>(storage: &mut S, config: &ValidatedConfig) {
    system::initialize_genesis(storage, &config.genesis_hash);
}

/// Start block `number` and charge the fixed per-block overhead as mandatory weight.
pub fn initialize_block<S: Storage>(
    storage: &mut S,
    config: &ValidatedConfig,
    number: BlockNumber,
    parent_hash: &Hash,
) -> Result<(), StorageError> {
    system::initialize(storage, number, parent_hash);
    let base_block = config.block_weights.base_block;
    if base_block.is_zero() {
        return Ok(());
    }
    system::register_extra_weight_unchecked(storage, base_block, DispatchClass::Mandatory)
}

pub fn finalize_block<S: Storage>(
    storage: &mut S,
    config: &ValidatedConfig,
) -> Result<(), StorageError> {
    system::finalize(storage, config.block_hash_count)
}

/// Read-only validity check for the transaction pool.
///
/// `who` is `None` for unsigned extrinsics.
pub fn validate_transaction<S: Storage>(
    storage: &S,
    extra: &Extra<S>,
    who: Option<&AccountId>,
    call: &[u8],
    info: &DispatchInfo,
    len: usize,
) -> TransactionValidity {
    if info.class == DispatchClass::Mandatory {
        return Err(InvalidTransaction::MandatoryDispatch.into());
    }
    match who {
        Some(who) => extra.validate(storage, who, call, info, len),
        None => extra.validate_unsigned(storage, call, info, len),
    }
}

/// Check, dispatch, and account for a single extrinsic.
#[allow(clippy::too_many_arguments)]
pub fn apply_extrinsic<S, F>(
    storage: &mut S,
    extra: &Extra<S>,
    who: Option<&AccountId>,
    call: &[u8],
    info: &DispatchInfo,
    len: usize,
    dispatch: F,
) -> ApplyExtrinsicResult
where
    S: TransactionalStorage,
    F: FnOnce(&mut S) -> DispatchResultWithPostInfo,
{
    with_storage_layer(storage, |storage| -> ApplyExtrinsicResult {
        let pre = match who {
            Some(who) => Some(extra.pre_dispatch(storage, who, call, info, len)?),
            None => {
                extra.pre_dispatch_unsigned(storage, call, info, len)?;
                None
            }
        };

        let result: DispatchResultWithPostInfo = with_storage_layer(storage, dispatch);
        let post_info = match &result {
            Ok(post_info) => *post_info,
            Err(err) => err.post_info,
        };
        let dispatch_result = result.as_ref().map(|_| ()).map_err(|err| err.error.clone());

        extra.post_dispatch(storage, pre, info, &post_info, len, &dispatch_result)?;

        if info.class == DispatchClass::Mandatory {
            if let Err(err) = &dispatch_result {
                warn!(%err, "mandatory dispatch failed");
                return Err(TransactionValidityError::from(InvalidTransaction::BadMandatory).into());
            }
        }

        system::note_applied_extrinsic(storage, &result, info).map_err(lookup_failed)?;
        debug!(signed = who.is_some(), ok = dispatch_result.is_ok(), "applied extrinsic");
        Ok(dispatch_result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks::{create_account, create_block_hash, create_config, create_storage},
        storage::{Memory, StorageValue},
        transactional::transaction_level,
    };
    use tessera_types::{
        ConsumedWeight, DispatchErrorWithPostInfo, Era, PostDispatchInfo, Weight,
    };

    fn marker() -> StorageValue<u64> {
        StorageValue::new("Test", "Marker")
    }

    fn write_marker(storage: &mut Memory) -> DispatchResultWithPostInfo {
        marker().put(storage, &1);
        Ok(PostDispatchInfo::with_actual_weight(Weight::from_parts(4, 4)))
    }

    fn fail_after_write(storage: &mut Memory) -> DispatchResultWithPostInfo {
        marker().put(storage, &1);
        Err(DispatchErrorWithPostInfo {
            post_info: PostDispatchInfo::with_actual_weight(Weight::from_parts(1, 1)),
            error: DispatchError::BadOrigin,
        })
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }

    fn normal_info() -> DispatchInfo {
        DispatchInfo::new(Weight::from_parts(10, 10), DispatchClass::Normal)
    }

    #[test]
    fn test_apply_signed_success() {
        init_tracing();
        let config = create_config();
        let mut storage = create_storage();
        let who = create_account(1);
        let extra = Extra::standard(&config, Era::Immortal, 0);

        let result =
            apply_extrinsic(&mut storage, &extra, Some(&who), &[], &normal_info(), 50, write_marker);
        assert_eq!(result, Ok(Ok(())));
        assert_eq!(marker().get(&storage).unwrap(), 1);
        assert_eq!(system::account_nonce(&storage, &who).unwrap(), 1);
        assert_eq!(system::all_extrinsics_len().get(&storage).unwrap(), 50);
        // Charged 10, refunded the unused 6.
        assert_eq!(
            system::block_weight().get(&storage).unwrap().normal,
            Weight::from_parts(4, 4)
        );
        assert_eq!(system::extrinsic_index().get(&storage).unwrap(), 1);
        assert_eq!(transaction_level(&storage), 0);
    }

    #[test]
    fn test_failed_dispatch_keeps_charges_only() {
        let config = create_config();
        let mut storage = create_storage();
        let who = create_account(1);
        let extra = Extra::standard(&config, Era::Immortal, 0);

        let result = apply_extrinsic(
            &mut storage,
            &extra,
            Some(&who),
            &[],
            &normal_info(),
            50,
            fail_after_write,
        );
        assert_eq!(result, Ok(Err(DispatchError::BadOrigin)));
        assert!(!marker().exists(&storage));
        assert_eq!(system::account_nonce(&storage, &who).unwrap(), 1);
        assert_eq!(
            system::block_weight().get(&storage).unwrap().normal,
            Weight::from_parts(1, 1)
        );
        assert_eq!(system::extrinsic_index().get(&storage).unwrap(), 1);
    }

    #[test]
    fn test_rejected_extrinsic_leaves_no_trace() {
        let config = create_config();
        let mut storage = create_storage();
        let who = create_account(1);
        let before = storage.entries();

        // The nonce check passes before the weight check fails.
        let extra = Extra::standard(&config, Era::Immortal, 0);
        let too_heavy = DispatchInfo::new(Weight::from_parts(10_000, 0), DispatchClass::Normal);
        let result =
            apply_extrinsic(&mut storage, &extra, Some(&who), &[], &too_heavy, 1, write_marker);
        assert_eq!(
            result,
            Err(ApplyError::Validity(InvalidTransaction::ExhaustsResources.into()))
        );
        assert_eq!(storage.entries(), before);

        let stale = Extra::standard(&config, Era::Immortal, 3);
        let result =
            apply_extrinsic(&mut storage, &stale, Some(&who), &[], &normal_info(), 1, write_marker);
        assert_eq!(
            result,
            Err(ApplyError::Validity(InvalidTransaction::Future.into()))
        );
        assert_eq!(storage.entries(), before);
    }

    #[test]
    fn test_failed_mandatory_dispatch_is_rejected() {
        init_tracing();
        let config = create_config();
        let mut storage = create_storage();
        let before = storage.entries();
        let extra = Extra::standard(&config, Era::Immortal, 0);
        let info = DispatchInfo::new(Weight::from_parts(1, 1), DispatchClass::Mandatory);

        let result = apply_extrinsic(&mut storage, &extra, None, &[], &info, 1, fail_after_write);
        assert_eq!(
            result,
            Err(ApplyError::Validity(InvalidTransaction::BadMandatory.into()))
        );
        assert_eq!(storage.entries(), before);
    }

    #[test]
    fn test_apply_unsigned_charges_weight() {
        let config = create_config();
        let mut storage = create_storage();
        let extra = Extra::standard(&config, Era::Immortal, 0);
        let info = DispatchInfo::new(Weight::from_parts(2, 2), DispatchClass::Mandatory);

        let result = apply_extrinsic(&mut storage, &extra, None, &[], &info, 8, |_| {
            Ok(PostDispatchInfo::default())
        });
        assert_eq!(result, Ok(Ok(())));
        let consumed: ConsumedWeight = system::block_weight().get(&storage).unwrap();
        assert_eq!(consumed.mandatory, Weight::from_parts(2, 2));
        assert_eq!(system::all_extrinsics_len().get(&storage).unwrap(), 8);
    }

    #[test]
    fn test_validate_transaction() {
        let config = create_config();
        let storage = create_storage();
        let who = create_account(1);
        let before = storage.entries();
        let extra = Extra::standard(&config, Era::Immortal, 2);

        let valid =
            validate_transaction(&storage, &extra, Some(&who), &[], &normal_info(), 10).unwrap();
        assert_eq!(valid.requires.len(), 1);
        assert_eq!(valid.provides.len(), 1);

        let mandatory = DispatchInfo::new(Weight::zero(), DispatchClass::Mandatory);
        assert_eq!(
            validate_transaction(&storage, &extra, Some(&who), &[], &mandatory, 10),
            Err(InvalidTransaction::MandatoryDispatch.into())
        );
        assert!(validate_transaction(&storage, &extra, None, &[], &normal_info(), 10).is_ok());
        assert_eq!(storage.entries(), before);
    }

    #[test]
    fn test_block_lifecycle_uses_config() {
        let mut config = create_config();
        config.block_hash_count = 2;
        config.block_weights.base_block = Weight::from_parts(5, 6);
        let mut storage = Memory::default();

        initialize_genesis(&mut storage, &config);
        assert_eq!(system::block_hash(&storage, 0).unwrap(), Some(config.genesis_hash));

        let mut parent = config.genesis_hash;
        for number in 1..=4 {
            initialize_block(&mut storage, &config, number, &parent).unwrap();
            let consumed = system::block_weight().get(&storage).unwrap();
            assert_eq!(consumed.mandatory, Weight::from_parts(5, 6));
            assert_eq!(consumed.normal, Weight::zero());
            finalize_block(&mut storage, &config).unwrap();
            parent = create_block_hash(number);
        }

        // Block 4 pruned block 1; genesis is kept.
        assert_eq!(system::block_hash(&storage, 0).unwrap(), Some(config.genesis_hash));
        assert_eq!(system::block_hash(&storage, 1).unwrap(), None);
        assert_eq!(system::block_hash(&storage, 2).unwrap(), Some(create_block_hash(2)));
        assert_eq!(system::block_hash(&storage, 3).unwrap(), Some(create_block_hash(3)));
    }

    #[test]
    fn test_sequential_nonces() {
        let config = create_config();
        let mut storage = create_storage();
        let who = create_account(3);
        for nonce in 0..5 {
            let extra = Extra::standard(&config, Era::mortal(64, 0), nonce);
            let result =
                apply_extrinsic(&mut storage, &extra, Some(&who), &[], &normal_info(), 10, |_| {
                    Ok(PostDispatchInfo::default())
                });
            assert_eq!(result, Ok(Ok(())));
        }
        assert_eq!(system::account_nonce(&storage, &who).unwrap(), 5);

        let replay = Extra::standard(&config, Era::mortal(64, 0), 4);
        assert_eq!(
            validate_transaction(&storage, &replay, Some(&who), &[], &normal_info(), 10),
            Err(InvalidTransaction::Stale.into())
        );
    }
}
