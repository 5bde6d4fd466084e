use super::{lookup_failed, Extension, Pre};
use crate::{storage::Storage, system};
use commonware_codec::{Encode, FixedSize, Write};
use tessera_types::{
    AccountId, AccountInfo, DispatchInfo, InvalidTransaction, TransactionTag,
    TransactionValidity, TransactionValidityError, ValidTransaction,
};
use tracing::debug;

/// Enforces per-account transaction ordering.
///
/// The pool may hold transactions with future nonces; they `require` the tag
/// of the previous nonce and are only dispatched once the stored nonce matches.
#[derive(Clone, Copy, Debug)]
pub struct CheckNonce {
    nonce: u64,
}

impl CheckNonce {
    pub fn new(nonce: u64) -> Self {
        Self { nonce }
    }
}

/// Tag identifying the transaction `(who, nonce)`.
pub(crate) fn nonce_tag(who: &AccountId, nonce: u64) -> TransactionTag {
    let mut tag = Vec::with_capacity(AccountId::SIZE + 8);
    who.write(&mut tag);
    nonce.write(&mut tag);
    tag
}

pub(crate) fn validate_and_increment_nonce(
    who: &AccountId,
    account: &mut AccountInfo,
    provided_nonce: u64,
) -> Result<(), TransactionValidityError> {
    if account.nonce != provided_nonce {
        debug!(
            ?who,
            expected = account.nonce,
            got = provided_nonce,
            "nonce mismatch; rejecting transaction"
        );
        return Err(if provided_nonce < account.nonce {
            InvalidTransaction::Stale
        } else {
            InvalidTransaction::Future
        }
        .into());
    }
    let Some(next) = account.nonce.checked_add(1) else {
        debug!(?who, nonce = account.nonce, "nonce space exhausted; rejecting transaction");
        return Err(InvalidTransaction::ExhaustsResources.into());
    };
    account.nonce = next;
    Ok(())
}

impl<S: Storage> Extension<S> for CheckNonce {
    fn identifier(&self) -> &'static str {
        "CheckNonce"
    }

    fn validate(
        &self,
        storage: &S,
        who: &AccountId,
        _call: &[u8],
        _info: &DispatchInfo,
        _len: usize,
    ) -> TransactionValidity {
        let current = system::account_nonce(storage, who).map_err(lookup_failed)?;
        if self.nonce < current {
            return Err(InvalidTransaction::Stale.into());
        }
        // No successor nonce exists, so this one can never be dispatched.
        if self.nonce == u64::MAX {
            return Err(InvalidTransaction::ExhaustsResources.into());
        }

        let requires = if self.nonce > current {
            vec![nonce_tag(who, self.nonce - 1)]
        } else {
            Vec::new()
        };
        Ok(ValidTransaction {
            priority: 0,
            requires,
            provides: vec![nonce_tag(who, self.nonce)],
            longevity: u64::MAX,
            propagate: true,
        })
    }

    fn pre_dispatch(
        &self,
        storage: &mut S,
        who: &AccountId,
        _call: &[u8],
        _info: &DispatchInfo,
        _len: usize,
    ) -> Result<Pre, TransactionValidityError> {
        let accounts = system::account();
        let mut account = accounts.get(storage, who).map_err(lookup_failed)?;
        validate_and_increment_nonce(who, &mut account, self.nonce)?;
        accounts.put(storage, who, &account);
        Ok(Pre::new(self.nonce.encode().to_vec()))
    }
}
