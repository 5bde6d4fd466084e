use crate::{
    dispatch::{DispatchClass, PerDispatchClass},
    weight::Weight,
};
use serde::{Deserialize, Serialize};

fn ratio_of(value: u64, percent: u8) -> u64 {
    ((value as u128 * percent.min(100) as u128) / 100) as u64
}

/// Maximum total encoded length of extrinsics in a block, per class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLength {
    pub max: PerDispatchClass<u32>,
}

impl Default for BlockLength {
    fn default() -> Self {
        Self::max_with_normal_ratio(5 * 1024 * 1024, 75)
    }
}

impl BlockLength {
    /// Same limit for every class.
    pub fn max(max: u32) -> Self {
        Self {
            max: PerDispatchClass::new(|_| max),
        }
    }

    /// `normal_percent` of `max` for normal extrinsics, `max` for the rest.
    pub fn max_with_normal_ratio(max: u32, normal_percent: u8) -> Self {
        Self {
            max: PerDispatchClass {
                normal: ratio_of(max as u64, normal_percent) as u32,
                operational: max,
                mandatory: max,
            },
        }
    }
}

/// Limits that apply to a single dispatch class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightsPerClass {
    /// Fixed overhead charged for every extrinsic of this class.
    pub base_extrinsic: Weight,
    #[serde(default)]
    pub max_extrinsic: Option<Weight>,
    #[serde(default)]
    pub max_total: Option<Weight>,
    /// Portion of `max_total` held back from this class.
    #[serde(default)]
    pub reserved: Option<Weight>,
}

/// Block-wide weight limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWeights {
    /// Fixed cost of executing an empty block.
    pub base_block: Weight,
    pub max_block: Weight,
    pub per_class: PerDispatchClass<WeightsPerClass>,
}

impl Default for BlockWeights {
    fn default() -> Self {
        Self::with_sensible_defaults(Weight::from_parts(2_000_000_000_000, 5 * 1024 * 1024), 75)
    }
}

impl BlockWeights {
    pub fn get(&self, class: DispatchClass) -> &WeightsPerClass {
        self.per_class.get(class)
    }

    /// Every class may use the whole block; no per-extrinsic cap.
    pub fn simple_max(block_weight: Weight) -> Self {
        Self {
            base_block: Weight::zero(),
            max_block: block_weight,
            per_class: PerDispatchClass::new(|class| WeightsPerClass {
                base_extrinsic: Weight::zero(),
                max_extrinsic: None,
                max_total: match class {
                    DispatchClass::Mandatory => None,
                    _ => Some(block_weight),
                },
                reserved: None,
            }),
        }
    }

    /// Normal extrinsics get `normal_percent` of the block, operational ones
    /// get all of it, mandatory ones are unlimited.
    pub fn with_sensible_defaults(expected_block_weight: Weight, normal_percent: u8) -> Self {
        let normal = Weight::from_parts(
            ratio_of(expected_block_weight.ref_time, normal_percent),
            ratio_of(expected_block_weight.proof_size, normal_percent),
        );
        Self {
            base_block: Weight::zero(),
            max_block: expected_block_weight,
            per_class: PerDispatchClass {
                normal: WeightsPerClass {
                    base_extrinsic: Weight::zero(),
                    max_extrinsic: Some(normal),
                    max_total: Some(normal),
                    reserved: None,
                },
                operational: WeightsPerClass {
                    base_extrinsic: Weight::zero(),
                    max_extrinsic: Some(expected_block_weight),
                    max_total: Some(expected_block_weight),
                    reserved: None,
                },
                mandatory: WeightsPerClass::default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_ratio() {
        let length = BlockLength::max_with_normal_ratio(10, 50);
        assert_eq!(length.max.normal, 5);
        assert_eq!(length.max.operational, 10);
        assert_eq!(length.max.mandatory, 10);
    }

    #[test]
    fn test_sensible_defaults_leave_mandatory_unlimited() {
        let weights = BlockWeights::with_sensible_defaults(Weight::from_parts(100, 40), 75);
        assert_eq!(
            weights.get(DispatchClass::Normal).max_total,
            Some(Weight::from_parts(75, 30))
        );
        assert_eq!(
            weights.get(DispatchClass::Operational).max_total,
            Some(Weight::from_parts(100, 40))
        );
        assert_eq!(weights.get(DispatchClass::Mandatory).max_total, None);
        assert_eq!(weights.get(DispatchClass::Mandatory).max_extrinsic, None);
    }

    #[test]
    fn test_deserialize_optional_limits() {
        let json = r#"{
            "base_extrinsic": { "ref_time": 7, "proof_size": 8 },
            "max_total": { "ref_time": 100, "proof_size": 100 }
        }"#;
        let limits: WeightsPerClass = serde_json::from_str(json).unwrap();
        assert_eq!(limits.base_extrinsic, Weight::from_parts(7, 8));
        assert_eq!(limits.max_extrinsic, None);
        assert_eq!(limits.max_total, Some(Weight::from_parts(100, 100)));
        assert_eq!(limits.reserved, None);
    }
}
