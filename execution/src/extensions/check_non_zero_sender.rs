use super::Extension;
use crate::storage::Storage;
use tessera_types::{
    AccountId, DispatchInfo, InvalidTransaction, TransactionValidity, ValidTransaction,
};

/// Rejects transactions signed by the all-zero account.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckNonZeroSender;

impl<S: Storage> Extension<S> for CheckNonZeroSender {
    fn identifier(&self) -> &'static str {
        "CheckNonZeroSender"
    }

    fn validate(
        &self,
        _storage: &S,
        who: &AccountId,
        _call: &[u8],
        _info: &DispatchInfo,
        _len: usize,
    ) -> TransactionValidity {
        if who.is_zero() {
            return Err(InvalidTransaction::BadSigner.into());
        }
        Ok(ValidTransaction::default())
    }
}
