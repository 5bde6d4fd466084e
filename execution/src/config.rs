use anyhow::{Context as _, Result};
use commonware_codec::DecodeExt;
use commonware_utils::{from_hex_formatted, hex};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use tessera_types::{BlockLength, BlockWeights, DispatchClass, Hash, RuntimeVersion};
use thiserror::Error;

/// Number of recent block hashes retained for mortal transactions.
pub const DEFAULT_BLOCK_HASH_COUNT: u64 = 2_400;

#[derive(Clone, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    pub fn from_hex_formatted(value: &str) -> Option<Self> {
        from_hex_formatted(value).map(Self)
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(self.as_ref()))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = from_hex_formatted(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a hex string"))?;
        Ok(Self(bytes))
    }
}

/// Runtime parameters the checks depend on.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: HexBytes,

    #[serde(default = "default_block_hash_count")]
    pub block_hash_count: u64,
    #[serde(default)]
    pub block_length: BlockLength,
    #[serde(default)]
    pub block_weights: BlockWeights,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is invalid: {value}")]
    InvalidDecode {
        field: &'static str,
        value: String,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("{field} must be > 0")]
    InvalidNonZero { field: &'static str },
    #[error("normal block length exceeds operational (normal={normal}, operational={operational})")]
    NormalLengthExceedsOperational { normal: u32, operational: u32 },
    #[error("reserved weight exceeds max_total for {class:?}")]
    ReservedExceedsMaxTotal { class: DispatchClass },
    #[error("max_extrinsic exceeds max_total for {class:?}")]
    ExtrinsicExceedsMaxTotal { class: DispatchClass },
}

#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub version: RuntimeVersion,
    pub genesis_hash: Hash,
    pub block_hash_count: u64,
    pub block_length: BlockLength,
    pub block_weights: BlockWeights,
}

fn default_block_hash_count() -> u64 {
    DEFAULT_BLOCK_HASH_COUNT
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Could not parse config file")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::from_yaml(&contents)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let genesis_hash =
            Hash::decode(self.genesis_hash.as_ref()).map_err(|source| ConfigError::InvalidDecode {
                field: "genesis_hash",
                value: hex(self.genesis_hash.as_ref()),
                source,
            })?;
        if self.block_hash_count == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "block_hash_count",
            });
        }

        let max = self.block_length.max;
        if max.normal > max.operational {
            return Err(ConfigError::NormalLengthExceedsOperational {
                normal: max.normal,
                operational: max.operational,
            });
        }

        for class in DispatchClass::all() {
            let limits = self.block_weights.get(*class);
            let Some(max_total) = limits.max_total else {
                continue;
            };
            if limits.reserved.is_some_and(|reserved| reserved.any_gt(max_total)) {
                return Err(ConfigError::ReservedExceedsMaxTotal { class: *class });
            }
            if limits.max_extrinsic.is_some_and(|max| max.any_gt(max_total)) {
                return Err(ConfigError::ExtrinsicExceedsMaxTotal { class: *class });
            }
        }

        Ok(ValidatedConfig {
            version: RuntimeVersion {
                spec_name: self.spec_name,
                spec_version: self.spec_version,
                transaction_version: self.transaction_version,
            },
            genesis_hash,
            block_hash_count: self.block_hash_count,
            block_length: self.block_length,
            block_weights: self.block_weights,
        })
    }
}
