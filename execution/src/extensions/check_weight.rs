use super::{lookup_failed, Extension, Pre};
use crate::{storage::Storage, system};
use tessera_types::{
    AccountId, BlockLength, BlockWeights, ConsumedWeight, DispatchInfo, DispatchResult,
    InvalidTransaction, PostDispatchInfo, TransactionValidity, TransactionValidityError,
    ValidTransaction,
};
use tracing::debug;

/// Keeps every block within its length and weight limits.
#[derive(Clone, Copy, Debug)]
pub struct CheckWeight {
    length: BlockLength,
    weights: BlockWeights,
}

/// Block length after including an extrinsic of `len` bytes.
pub fn check_block_length<S: Storage>(
    storage: &S,
    limits: &BlockLength,
    info: &DispatchInfo,
    len: usize,
) -> Result<u32, TransactionValidityError> {
    let current = system::all_extrinsics_len()
        .get(storage)
        .map_err(lookup_failed)?;
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    let next = current.saturating_add(len);
    let max = *limits.max.get(info.class);
    if next > max {
        debug!(class = ?info.class, next, max, "block length exhausted");
        return Err(InvalidTransaction::ExhaustsResources.into());
    }
    Ok(next)
}

/// Reject an extrinsic whose declared weight alone exceeds its class cap.
pub fn check_extrinsic_weight(
    weights: &BlockWeights,
    info: &DispatchInfo,
) -> Result<(), TransactionValidityError> {
    if let Some(max) = weights.get(info.class).max_extrinsic {
        if info.weight.any_gt(max) {
            debug!(class = ?info.class, weight = ?info.weight, ?max, "extrinsic weight exceeds cap");
            return Err(InvalidTransaction::ExhaustsResources.into());
        }
    }
    Ok(())
}

/// Ledger after charging `info.weight` plus the class's base extrinsic weight.
///
/// A class with neither `max_total` nor `reserved` is unlimited and accrues
/// saturating; any other class fails on overflow. With `max_total`, the class
/// may not exceed `max_total - reserved` in any component. Once the whole block
/// is past `max_block`, a class with `reserved` may not exceed its reserve.
pub fn calculate_consumed_weight(
    weights: &BlockWeights,
    mut consumed: ConsumedWeight,
    info: &DispatchInfo,
) -> Result<ConsumedWeight, TransactionValidityError> {
    let limits = weights.get(info.class);
    let extrinsic_weight = info.weight.saturating_add(limits.base_extrinsic);

    if limits.max_total.is_none() && limits.reserved.is_none() {
        consumed.accrue(extrinsic_weight, info.class);
    } else if consumed.checked_accrue(extrinsic_weight, info.class).is_none() {
        debug!(class = ?info.class, "block weight overflow");
        return Err(InvalidTransaction::ExhaustsResources.into());
    }
    let class_total = *consumed.get(info.class);

    if let Some(max_total) = limits.max_total {
        let allowed = max_total.saturating_sub(limits.reserved.unwrap_or_default());
        if class_total.any_gt(allowed) {
            debug!(class = ?info.class, total = ?class_total, ?allowed, "block weight exhausted");
            return Err(InvalidTransaction::ExhaustsResources.into());
        }
    }

    if let Some(reserved) = limits.reserved {
        let block_total = consumed.total();
        if block_total.any_gt(weights.max_block) && class_total.any_gt(reserved) {
            debug!(
                class = ?info.class,
                ?block_total,
                max_block = ?weights.max_block,
                ?reserved,
                "block full and class reserve exhausted"
            );
            return Err(InvalidTransaction::ExhaustsResources.into());
        }
    }
    Ok(consumed)
}

impl CheckWeight {
    pub fn new(length: BlockLength, weights: BlockWeights) -> Self {
        Self { length, weights }
    }

    fn do_validate<S: Storage>(
        &self,
        storage: &S,
        info: &DispatchInfo,
        len: usize,
    ) -> TransactionValidity {
        check_block_length(storage, &self.length, info, len)?;
        check_extrinsic_weight(&self.weights, info)?;
        Ok(ValidTransaction::default())
    }

    /// All limits are checked before anything is written.
    fn do_pre_dispatch<S: Storage>(
        &self,
        storage: &mut S,
        info: &DispatchInfo,
        len: usize,
    ) -> Result<(), TransactionValidityError> {
        let next_len = check_block_length(storage, &self.length, info, len)?;
        check_extrinsic_weight(&self.weights, info)?;
        let consumed = system::block_weight().get(storage).map_err(lookup_failed)?;
        let next_weight = calculate_consumed_weight(&self.weights, consumed, info)?;

        system::all_extrinsics_len().put(storage, &next_len);
        system::block_weight().put(storage, &next_weight);
        Ok(())
    }
}

impl<S: Storage> Extension<S> for CheckWeight {
    fn identifier(&self) -> &'static str {
        "CheckWeight"
    }

    fn validate(
        &self,
        storage: &S,
        _who: &AccountId,
        _call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> TransactionValidity {
        self.do_validate(storage, info, len)
    }

    fn pre_dispatch(
        &self,
        storage: &mut S,
        _who: &AccountId,
        _call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> Result<Pre, TransactionValidityError> {
        self.do_pre_dispatch(storage, info, len)?;
        Ok(Pre::default())
    }

    fn validate_unsigned(
        &self,
        storage: &S,
        _call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> TransactionValidity {
        self.do_validate(storage, info, len)
    }

    fn pre_dispatch_unsigned(
        &self,
        storage: &mut S,
        _call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> Result<(), TransactionValidityError> {
        self.do_pre_dispatch(storage, info, len)
    }

    /// Refund the declared weight that was not used.
    fn post_dispatch(
        &self,
        storage: &mut S,
        _pre: Option<Pre>,
        info: &DispatchInfo,
        post_info: &PostDispatchInfo,
        _len: usize,
        _result: &DispatchResult,
    ) -> Result<(), TransactionValidityError> {
        let unspent = post_info.calc_unspent(info);
        if unspent.is_zero() {
            return Ok(());
        }
        system::block_weight()
            .mutate(storage, |consumed| consumed.reduce(unspent, info.class))
            .map_err(lookup_failed)
    }
}
