//! Tessera execution layer.
//!
//! This crate contains the transaction validity checks ([extensions]), the
//! per-block resource ledger they maintain ([system]), and the transactional
//! key-value storage they run against ([storage], [transactional]).
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution.
//! - Storage is ordered; iteration order never depends on hashing.
//!
//! ## Applying an extrinsic (example)
//! ```rust,ignore
//! use tessera_execution::{executive, extensions::Extra, mocks};
//! use tessera_types::{DispatchClass, DispatchInfo, Era, PostDispatchInfo, Weight};
//!
//! let config = mocks::create_config();
//! let mut storage = mocks::create_storage();
//! let who = mocks::create_account(1);
//!
//! let extra = Extra::standard(&config, Era::mortal(64, 0), 0);
//! let info = DispatchInfo::new(Weight::from_parts(10, 10), DispatchClass::Normal);
//! let outcome = executive::apply_extrinsic(&mut storage, &extra, Some(&who), &[], &info, 100, |_| {
//!     Ok(PostDispatchInfo::default())
//! });
//! assert_eq!(outcome, Ok(Ok(())));
//! executive::finalize_block(&mut storage, &config)?;
//! ```

pub mod config;
pub mod executive;
pub mod extensions;
pub mod hashing;
pub mod storage;
pub mod system;
pub mod transactional;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use config::{Config, ConfigError, ValidatedConfig};
pub use executive::{
    apply_extrinsic, finalize_block, initialize_block, initialize_genesis, validate_transaction,
    ApplyError, ApplyExtrinsicResult,
};
pub use extensions::{AdditionalSigned, Extension, Extra, Pre};
pub use storage::{Storage, StorageError, StorageMap, StorageValue, TransactionalStorage};
pub use transactional::{
    with_storage_layer, with_transaction, StorageLayer, TransactionOutcome, TRANSACTIONAL_LIMIT,
};

#[cfg(any(test, feature = "mocks"))]
pub use storage::Memory;
