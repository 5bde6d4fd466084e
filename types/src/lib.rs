//! Primitive types shared by the tessera runtime core: weights, dispatch
//! metadata, transaction eras, validity results, and block limits.

pub mod account;
pub mod dispatch;
pub mod era;
pub mod limits;
pub mod validity;
pub mod version;
pub mod weight;

pub use account::{AccountId, AccountInfo};
pub use dispatch::{
    ConsumedWeight, DispatchClass, DispatchError, DispatchErrorWithPostInfo, DispatchInfo,
    DispatchResult, DispatchResultWithPostInfo, Pays, PerDispatchClass, PostDispatchInfo,
};
pub use era::{Era, EraError, MortalEra};
pub use limits::{BlockLength, BlockWeights, WeightsPerClass};
pub use validity::{
    InvalidTransaction, TransactionLongevity, TransactionPriority, TransactionTag,
    TransactionValidity, TransactionValidityError, UnknownTransaction, ValidTransaction,
};
pub use version::RuntimeVersion;
pub use weight::Weight;

/// Block hash type.
pub use commonware_cryptography::sha256::Digest as Hash;

/// Block number type.
pub type BlockNumber = u64;
