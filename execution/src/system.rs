//! Block-level bookkeeping: account nonces, recent block hashes, and the
//! per-block length and weight ledgers.

use crate::{
    hashing::Twox64Concat,
    storage::{Storage, StorageError, StorageMap, StorageValue},
};
use tessera_types::{
    AccountId, AccountInfo, BlockNumber, ConsumedWeight, DispatchClass, DispatchInfo,
    DispatchResultWithPostInfo, Hash, Weight,
};
use tracing::{debug, trace};

const PREFIX: &str = "System";

/// Raw key of the index of the extrinsic currently being applied.
pub const EXTRINSIC_INDEX_KEY: &[u8] = b":extrinsic_index";

pub fn account() -> StorageMap<AccountId, AccountInfo, Twox64Concat> {
    StorageMap::new(PREFIX, "Account")
}

pub fn block_hash_map() -> StorageMap<BlockNumber, Hash, Twox64Concat> {
    StorageMap::new(PREFIX, "BlockHash")
}

pub fn number() -> StorageValue<BlockNumber> {
    StorageValue::new(PREFIX, "Number")
}

/// Total encoded length of extrinsics applied so far in this block.
pub fn all_extrinsics_len() -> StorageValue<u32> {
    StorageValue::new(PREFIX, "AllExtrinsicsLen")
}

/// Weight consumed so far in this block, per class.
pub fn block_weight() -> StorageValue<ConsumedWeight> {
    StorageValue::new(PREFIX, "BlockWeight")
}

pub fn extrinsic_index() -> StorageValue<u32> {
    StorageValue::unhashed(EXTRINSIC_INDEX_KEY)
}

pub fn block_number<S: Storage>(storage: &S) -> Result<BlockNumber, StorageError> {
    number().get(storage)
}

/// Hash of block `number`, if it is still retained.
pub fn block_hash<S: Storage>(
    storage: &S,
    number: BlockNumber,
) -> Result<Option<Hash>, StorageError> {
    block_hash_map().try_get(storage, &number)
}

pub fn account_nonce<S: Storage>(storage: &S, who: &AccountId) -> Result<u64, StorageError> {
    Ok(account().get(storage, who)?.nonce)
}

pub fn inc_account_nonce<S: Storage>(storage: &mut S, who: &AccountId) -> Result<(), StorageError> {
    account().mutate(storage, who, |info| {
        info.nonce = info.nonce.saturating_add(1);
    })
}

/// Record the genesis hash as the hash of block 0.
pub fn initialize_genesis<S: Storage>(storage: &mut S, genesis_hash: &Hash) {
    number().put(storage, &0);
    block_hash_map().put(storage, &0, genesis_hash);
}

/// Start block `number`: record its parent's hash and reset the weight ledger.
pub fn initialize<S: Storage>(storage: &mut S, number: BlockNumber, parent_hash: &Hash) {
    self::number().put(storage, &number);
    block_hash_map().put(storage, &number.saturating_sub(1), parent_hash);
    extrinsic_index().put(storage, &0);
    block_weight().clear(storage);
    debug!(number, "initialized block");
}

/// Close the current block and prune the hash that fell out of the retained window.
pub fn finalize<S: Storage>(storage: &mut S, block_hash_count: BlockNumber) -> Result<(), StorageError> {
    let number = block_number(storage)?;
    all_extrinsics_len().clear(storage);
    let applied = extrinsic_index().take(storage)?;

    let to_remove = number.saturating_sub(block_hash_count).saturating_sub(1);
    if to_remove != 0 {
        block_hash_map().remove(storage, &to_remove);
    }
    debug!(number, applied, pruned = to_remove, "finalized block");
    Ok(())
}

/// Charge `weight` to `class` without checking any limit.
pub fn register_extra_weight_unchecked<S: Storage>(
    storage: &mut S,
    weight: Weight,
    class: DispatchClass,
) -> Result<(), StorageError> {
    block_weight().mutate(storage, |consumed| consumed.accrue(weight, class))
}

/// Record the outcome of an applied extrinsic and advance the extrinsic index.
pub fn note_applied_extrinsic<S: Storage>(
    storage: &mut S,
    result: &DispatchResultWithPostInfo,
    info: &DispatchInfo,
) -> Result<(), StorageError> {
    let index = extrinsic_index().get(storage)?;
    match result {
        Ok(post_info) => trace!(
            index,
            class = ?info.class,
            actual_weight = ?post_info.calc_actual_weight(info),
            "extrinsic succeeded"
        ),
        Err(err) => debug!(
            index,
            class = ?info.class,
            error = %err.error,
            "extrinsic failed"
        ),
    }
    extrinsic_index().put(storage, &index.saturating_add(1));
    Ok(())
}
