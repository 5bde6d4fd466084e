use super::{AdditionalSigned, Extension};
use crate::storage::Storage;
use tessera_types::TransactionValidityError;

/// Binds the signature to the transaction format version.
#[derive(Clone, Copy, Debug)]
pub struct CheckTxVersion {
    transaction_version: u32,
}

impl CheckTxVersion {
    pub fn new(transaction_version: u32) -> Self {
        Self {
            transaction_version,
        }
    }
}

impl<S: Storage> Extension<S> for CheckTxVersion {
    fn identifier(&self) -> &'static str {
        "CheckTxVersion"
    }

    fn additional_signed(
        &self,
        _storage: &S,
    ) -> Result<Option<AdditionalSigned>, TransactionValidityError> {
        Ok(Some(AdditionalSigned::TransactionVersion(
            self.transaction_version,
        )))
    }
}
