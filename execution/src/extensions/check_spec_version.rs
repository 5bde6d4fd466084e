use super::{AdditionalSigned, Extension};
use crate::storage::Storage;
use tessera_types::TransactionValidityError;

/// Binds the signature to the runtime's spec version.
#[derive(Clone, Copy, Debug)]
pub struct CheckSpecVersion {
    spec_version: u32,
}

impl CheckSpecVersion {
    pub fn new(spec_version: u32) -> Self {
        Self { spec_version }
    }
}

impl<S: Storage> Extension<S> for CheckSpecVersion {
    fn identifier(&self) -> &'static str {
        "CheckSpecVersion"
    }

    fn additional_signed(
        &self,
        _storage: &S,
    ) -> Result<Option<AdditionalSigned>, TransactionValidityError> {
        Ok(Some(AdditionalSigned::SpecVersion(self.spec_version)))
    }
}
