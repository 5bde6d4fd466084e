use super::{lookup_failed, AdditionalSigned, Extension};
use crate::{storage::Storage, system};
use tessera_types::{
    AccountId, DispatchInfo, Era, InvalidTransaction, TransactionValidity,
    TransactionValidityError, ValidTransaction,
};
use tracing::debug;

/// Binds the signature to the hash of the era's birth block and limits how
/// long the transaction stays valid.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckMortality {
    era: Era,
}

impl CheckMortality {
    pub fn new(era: Era) -> Self {
        Self { era }
    }
}

impl<S: Storage> Extension<S> for CheckMortality {
    fn identifier(&self) -> &'static str {
        "CheckMortality"
    }

    fn additional_signed(
        &self,
        storage: &S,
    ) -> Result<Option<AdditionalSigned>, TransactionValidityError> {
        let current = system::block_number(storage).map_err(lookup_failed)?;
        let birth = self.era.birth(current);
        let Some(hash) = system::block_hash(storage, birth).map_err(lookup_failed)? else {
            debug!(current, birth, "birth block hash is no longer retained");
            return Err(InvalidTransaction::AncientBirthBlock.into());
        };
        Ok(Some(AdditionalSigned::BirthBlockHash(hash)))
    }

    fn validate(
        &self,
        storage: &S,
        _who: &AccountId,
        _call: &[u8],
        _info: &DispatchInfo,
        _len: usize,
    ) -> TransactionValidity {
        let current = system::block_number(storage).map_err(lookup_failed)?;
        Ok(ValidTransaction {
            longevity: self.era.death(current).saturating_sub(current),
            ..Default::default()
        })
    }
}
