//! Fixtures for tests and downstream crates (enable the `mocks` feature).

use crate::{config::ValidatedConfig, executive, storage::Memory, system};
use commonware_cryptography::{sha256::Sha256, Hasher};
use tessera_types::{
    AccountId, BlockLength, BlockNumber, BlockWeights, Hash, RuntimeVersion, Weight,
};

/// Retained block hashes in [create_config].
pub const BLOCK_HASH_COUNT: BlockNumber = 16;

/// Creates a deterministic account for testing
pub fn create_account(seed: u8) -> AccountId {
    AccountId::new([seed; 32])
}

/// Creates the hash recorded for block `number`
pub fn create_block_hash(number: BlockNumber) -> Hash {
    Sha256::hash(&number.to_be_bytes())
}

pub fn create_genesis_hash() -> Hash {
    create_block_hash(0)
}

/// Creates a small runtime configuration for testing.
///
/// Normal extrinsics get 75% of a 1 KiB block and 75% of a `(1000, 1000)` weight budget.
pub fn create_config() -> ValidatedConfig {
    ValidatedConfig {
        version: RuntimeVersion {
            spec_name: "tessera".to_string(),
            spec_version: 1,
            transaction_version: 1,
        },
        genesis_hash: create_genesis_hash(),
        block_hash_count: BLOCK_HASH_COUNT,
        block_length: BlockLength::max_with_normal_ratio(1024, 75),
        block_weights: BlockWeights::with_sensible_defaults(Weight::from_parts(1_000, 1_000), 75),
    }
}

/// Creates in-memory storage positioned at the start of block 1.
pub fn create_storage() -> Memory {
    let config = create_config();
    let mut storage = Memory::default();
    executive::initialize_genesis(&mut storage, &config);
    executive::initialize_block(&mut storage, &config, 1, &config.genesis_hash)
        .expect("block 1 is initialized");
    storage
}

/// Finalizes the current block and starts the next one, `count` times.
///
/// Block `n` is given the hash [create_block_hash]`(n)`.
pub fn advance_blocks(storage: &mut Memory, count: u64) {
    let config = create_config();
    for _ in 0..count {
        let number = system::block_number(storage).expect("block number is readable");
        executive::finalize_block(storage, &config).expect("block is finalized");
        executive::initialize_block(storage, &config, number + 1, &create_block_hash(number))
            .expect("next block is initialized");
    }
}
