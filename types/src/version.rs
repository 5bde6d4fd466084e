use serde::{Deserialize, Serialize};

/// Versions a signed transaction commits to.
///
/// Bumping `spec_version` or `transaction_version` invalidates every
/// transaction signed against the previous value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}
