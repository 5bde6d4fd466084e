//! Transaction validity checks and the ordered chain that runs them.
//!
//! Every check sees the same four phases:
//! - `additional_signed`: data the signer committed to without sending it.
//! - `validate`: read-only admission check used by the transaction pool.
//! - `pre_dispatch`: the mutating check run right before dispatch.
//! - `post_dispatch`: bookkeeping once the actual cost is known.
//!
//! Unsigned extrinsics use `validate_unsigned` and `pre_dispatch_unsigned` instead.

use crate::{
    config::ValidatedConfig,
    storage::{Storage, StorageError},
};
use bytes::{BufMut, Bytes};
use commonware_codec::{EncodeSize, Write};
use tessera_types::{
    AccountId, DispatchInfo, DispatchResult, Era, Hash, PostDispatchInfo, TransactionValidity,
    TransactionValidityError, UnknownTransaction, ValidTransaction,
};
use tracing::error;

mod check_genesis;
mod check_mortality;
mod check_non_zero_sender;
mod check_nonce;
mod check_spec_version;
mod check_tx_version;
mod check_weight;

pub use check_genesis::CheckGenesis;
pub use check_mortality::CheckMortality;
pub use check_non_zero_sender::CheckNonZeroSender;
pub use check_nonce::CheckNonce;
pub use check_spec_version::CheckSpecVersion;
pub use check_tx_version::CheckTxVersion;
pub use check_weight::{
    calculate_consumed_weight, check_block_length, check_extrinsic_weight, CheckWeight,
};

/// Opaque receipt a check hands from `pre_dispatch` to `post_dispatch`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pre(Bytes);

impl Pre {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Pre {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Data a signer commits to that is not part of the transaction itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdditionalSigned {
    SpecVersion(u32),
    TransactionVersion(u32),
    GenesisHash(Hash),
    BirthBlockHash(Hash),
}

impl Write for AdditionalSigned {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::SpecVersion(version) | Self::TransactionVersion(version) => {
                version.write(writer)
            }
            Self::GenesisHash(hash) | Self::BirthBlockHash(hash) => hash.write(writer),
        }
    }
}

impl EncodeSize for AdditionalSigned {
    fn encode_size(&self) -> usize {
        match self {
            Self::SpecVersion(version) | Self::TransactionVersion(version) => {
                version.encode_size()
            }
            Self::GenesisHash(hash) | Self::BirthBlockHash(hash) => hash.encode_size(),
        }
    }
}

/// A single validity check.
///
/// Only `identifier` is required; every phase defaults to "valid, no effect".
/// The default `pre_dispatch` re-runs `validate`.
pub trait Extension<S: Storage> {
    fn identifier(&self) -> &'static str;

    fn additional_signed(
        &self,
        _storage: &S,
    ) -> Result<Option<AdditionalSigned>, TransactionValidityError> {
        Ok(None)
    }

    fn validate(
        &self,
        _storage: &S,
        _who: &AccountId,
        _call: &[u8],
        _info: &DispatchInfo,
        _len: usize,
    ) -> TransactionValidity {
        Ok(ValidTransaction::default())
    }

    fn pre_dispatch(
        &self,
        storage: &mut S,
        who: &AccountId,
        call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> Result<Pre, TransactionValidityError> {
        self.validate(storage, who, call, info, len)?;
        Ok(Pre::default())
    }

    fn validate_unsigned(
        &self,
        _storage: &S,
        _call: &[u8],
        _info: &DispatchInfo,
        _len: usize,
    ) -> TransactionValidity {
        Ok(ValidTransaction::default())
    }

    fn pre_dispatch_unsigned(
        &self,
        storage: &mut S,
        call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> Result<(), TransactionValidityError> {
        self.validate_unsigned(storage, call, info, len)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn post_dispatch(
        &self,
        _storage: &mut S,
        _pre: Option<Pre>,
        _info: &DispatchInfo,
        _post_info: &PostDispatchInfo,
        _len: usize,
        _result: &DispatchResult,
    ) -> Result<(), TransactionValidityError> {
        Ok(())
    }
}

/// Storage failures during a check mean validity cannot be decided.
pub(crate) fn lookup_failed(err: StorageError) -> TransactionValidityError {
    error!(?err, "storage lookup failed during transaction checks");
    UnknownTransaction::CannotLookup.into()
}

/// Ordered list of checks. Every phase runs them in list order.
pub struct Extra<S: Storage> {
    checks: Vec<Box<dyn Extension<S>>>,
}

impl<S: Storage> Extra<S> {
    pub fn new(checks: Vec<Box<dyn Extension<S>>>) -> Self {
        Self { checks }
    }

    /// The standard chain: non-zero sender, spec version, transaction version,
    /// genesis, mortality, nonce, weight.
    pub fn standard(config: &ValidatedConfig, era: Era, nonce: u64) -> Self {
        Self::new(vec![
            Box::new(CheckNonZeroSender),
            Box::new(CheckSpecVersion::new(config.version.spec_version)),
            Box::new(CheckTxVersion::new(config.version.transaction_version)),
            Box::new(CheckGenesis),
            Box::new(CheckMortality::new(era)),
            Box::new(CheckNonce::new(nonce)),
            Box::new(CheckWeight::new(config.block_length, config.block_weights)),
        ])
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn identifiers(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.identifier()).collect()
    }

    pub fn additional_signed(
        &self,
        storage: &S,
    ) -> Result<Vec<AdditionalSigned>, TransactionValidityError> {
        let mut signed = Vec::new();
        for check in &self.checks {
            if let Some(data) = check.additional_signed(storage)? {
                signed.push(data);
            }
        }
        Ok(signed)
    }

    /// Bytes appended to the signing payload.
    pub fn encode_additional_signed(&self, storage: &S) -> Result<Vec<u8>, TransactionValidityError> {
        let mut payload = Vec::new();
        for data in self.additional_signed(storage)? {
            data.write(&mut payload);
        }
        Ok(payload)
    }

    /// Run every check's `validate`, merging the results. First failure wins.
    pub fn validate(
        &self,
        storage: &S,
        who: &AccountId,
        call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> TransactionValidity {
        let mut valid = ValidTransaction::default();
        for check in &self.checks {
            valid = valid.combine_with(check.validate(storage, who, call, info, len)?);
        }
        Ok(valid)
    }

    /// Run every check's `pre_dispatch`, collecting one [Pre] per check.
    ///
    /// Writes made by checks before a failing one are not undone here; run
    /// this inside a storage layer to make the whole chain atomic.
    pub fn pre_dispatch(
        &self,
        storage: &mut S,
        who: &AccountId,
        call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> Result<Vec<Pre>, TransactionValidityError> {
        let mut pre = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            pre.push(check.pre_dispatch(storage, who, call, info, len)?);
        }
        Ok(pre)
    }

    pub fn validate_unsigned(
        &self,
        storage: &S,
        call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> TransactionValidity {
        let mut valid = ValidTransaction::default();
        for check in &self.checks {
            valid = valid.combine_with(check.validate_unsigned(storage, call, info, len)?);
        }
        Ok(valid)
    }

    pub fn pre_dispatch_unsigned(
        &self,
        storage: &mut S,
        call: &[u8],
        info: &DispatchInfo,
        len: usize,
    ) -> Result<(), TransactionValidityError> {
        for check in &self.checks {
            check.pre_dispatch_unsigned(storage, call, info, len)?;
        }
        Ok(())
    }

    /// Run every check's `post_dispatch`. `pre` is `None` for unsigned extrinsics.
    ///
    /// Signed receipts must come from [Extra::pre_dispatch] on this chain: one
    /// per check, in order. Anything else is rejected before any check runs.
    pub fn post_dispatch(
        &self,
        storage: &mut S,
        pre: Option<Vec<Pre>>,
        info: &DispatchInfo,
        post_info: &PostDispatchInfo,
        len: usize,
        result: &DispatchResult,
    ) -> Result<(), TransactionValidityError> {
        match pre {
            Some(pre) if pre.len() != self.checks.len() => {
                error!(
                    receipts = pre.len(),
                    checks = self.checks.len(),
                    "receipt count does not match extension chain"
                );
                Err(UnknownTransaction::CannotLookup.into())
            }
            Some(pre) => {
                for (check, pre) in self.checks.iter().zip(pre) {
                    check.post_dispatch(storage, Some(pre), info, post_info, len, result)?;
                }
                Ok(())
            }
            None => {
                for check in &self.checks {
                    check.post_dispatch(storage, None, info, post_info, len, result)?;
                }
                Ok(())
            }
        }
    }
}
