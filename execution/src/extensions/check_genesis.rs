use super::{lookup_failed, AdditionalSigned, Extension};
use crate::{storage::Storage, system};
use tessera_types::{TransactionValidityError, UnknownTransaction};

/// Binds the signature to the chain's genesis hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckGenesis;

impl<S: Storage> Extension<S> for CheckGenesis {
    fn identifier(&self) -> &'static str {
        "CheckGenesis"
    }

    fn additional_signed(
        &self,
        storage: &S,
    ) -> Result<Option<AdditionalSigned>, TransactionValidityError> {
        let genesis = system::block_hash(storage, 0)
            .map_err(lookup_failed)?
            .ok_or(UnknownTransaction::CannotLookup)?;
        Ok(Some(AdditionalSigned::GenesisHash(genesis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks::{create_genesis_hash, create_storage},
        storage::Memory,
    };

    #[test]
    fn test_reads_block_zero() {
        let storage = create_storage();
        assert_eq!(
            CheckGenesis.additional_signed(&storage),
            Ok(Some(AdditionalSigned::GenesisHash(create_genesis_hash())))
        );
    }

    #[test]
    fn test_missing_genesis_cannot_lookup() {
        let storage = Memory::default();
        assert_eq!(
            CheckGenesis.additional_signed(&storage),
            Err(UnknownTransaction::CannotLookup.into())
        );
    }
}
