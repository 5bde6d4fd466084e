use crate::weight::Weight;
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Category a dispatch belongs to. Each class has its own slice of the block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DispatchClass {
    #[default]
    Normal = 0,
    Operational = 1,
    /// Must be included regardless of its effect on block limits.
    Mandatory = 2,
}

impl DispatchClass {
    pub const fn all() -> &'static [DispatchClass] {
        &[
            DispatchClass::Normal,
            DispatchClass::Operational,
            DispatchClass::Mandatory,
        ]
    }

    pub const fn non_mandatory() -> &'static [DispatchClass] {
        &[DispatchClass::Normal, DispatchClass::Operational]
    }
}

impl Write for DispatchClass {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for DispatchClass {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Operational),
            2 => Ok(Self::Mandatory),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl FixedSize for DispatchClass {
    const SIZE: usize = 1;
}

/// One value per [DispatchClass].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerDispatchClass<T> {
    pub normal: T,
    pub operational: T,
    pub mandatory: T,
}

impl<T> PerDispatchClass<T> {
    pub fn new(mut f: impl FnMut(DispatchClass) -> T) -> Self {
        Self {
            normal: f(DispatchClass::Normal),
            operational: f(DispatchClass::Operational),
            mandatory: f(DispatchClass::Mandatory),
        }
    }

    pub fn get(&self, class: DispatchClass) -> &T {
        match class {
            DispatchClass::Normal => &self.normal,
            DispatchClass::Operational => &self.operational,
            DispatchClass::Mandatory => &self.mandatory,
        }
    }

    pub fn get_mut(&mut self, class: DispatchClass) -> &mut T {
        match class {
            DispatchClass::Normal => &mut self.normal,
            DispatchClass::Operational => &mut self.operational,
            DispatchClass::Mandatory => &mut self.mandatory,
        }
    }
}

impl<T: Write> Write for PerDispatchClass<T> {
    fn write(&self, writer: &mut impl BufMut) {
        self.normal.write(writer);
        self.operational.write(writer);
        self.mandatory.write(writer);
    }
}

impl<T: Read> Read for PerDispatchClass<T> {
    type Cfg = T::Cfg;

    fn read_cfg(reader: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            normal: T::read_cfg(reader, cfg)?,
            operational: T::read_cfg(reader, cfg)?,
            mandatory: T::read_cfg(reader, cfg)?,
        })
    }
}

impl<T: EncodeSize> EncodeSize for PerDispatchClass<T> {
    fn encode_size(&self) -> usize {
        self.normal.encode_size() + self.operational.encode_size() + self.mandatory.encode_size()
    }
}

/// Weight consumed so far in the current block, per class.
pub type ConsumedWeight = PerDispatchClass<Weight>;

impl PerDispatchClass<Weight> {
    /// Sum over all classes (saturating).
    pub fn total(&self) -> Weight {
        DispatchClass::all()
            .iter()
            .fold(Weight::zero(), |sum, class| sum.saturating_add(*self.get(*class)))
    }

    pub fn accrue(&mut self, weight: Weight, class: DispatchClass) {
        self.get_mut(class).saturating_accrue(weight);
    }

    /// Adds `weight` to `class`, leaving the ledger untouched on overflow.
    pub fn checked_accrue(&mut self, weight: Weight, class: DispatchClass) -> Option<()> {
        self.get_mut(class).checked_accrue(weight)
    }

    pub fn reduce(&mut self, weight: Weight, class: DispatchClass) {
        self.get_mut(class).saturating_reduce(weight);
    }
}

/// Whether a dispatch pays a fee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pays {
    #[default]
    Yes,
    No,
}

/// Declared (worst-case) cost of a call, known before dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchInfo {
    pub weight: Weight,
    pub class: DispatchClass,
    pub pays_fee: Pays,
}

impl DispatchInfo {
    pub fn new(weight: Weight, class: DispatchClass) -> Self {
        Self {
            weight,
            class,
            pays_fee: Pays::Yes,
        }
    }
}

/// Measured cost of a call, reported after dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostDispatchInfo {
    /// `None` means the declared weight was used in full.
    pub actual_weight: Option<Weight>,
    pub pays_fee: Pays,
}

impl PostDispatchInfo {
    pub fn with_actual_weight(actual_weight: Weight) -> Self {
        Self {
            actual_weight: Some(actual_weight),
            pays_fee: Pays::Yes,
        }
    }

    /// Declared weight that was not used (never exceeds the declaration).
    pub fn calc_unspent(&self, info: &DispatchInfo) -> Weight {
        info.weight.saturating_sub(self.calc_actual_weight(info))
    }

    /// Actual weight, capped by the declared weight.
    pub fn calc_actual_weight(&self, info: &DispatchInfo) -> Weight {
        match self.actual_weight {
            Some(actual) => actual.min(info.weight),
            None => info.weight,
        }
    }

    pub fn pays_fee(&self, info: &DispatchInfo) -> Pays {
        if info.pays_fee == Pays::No || self.pays_fee == Pays::No {
            Pays::No
        } else {
            Pays::Yes
        }
    }
}

/// Reason a dispatch failed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DispatchError {
    #[error("{0}")]
    Other(String),
    #[error("cannot lookup")]
    CannotLookup,
    #[error("bad origin")]
    BadOrigin,
    #[error("too many nested transactional layers")]
    TransactionalLimitReached,
    #[error("storage layer required but none is open")]
    TransactionalNoLayer,
}

impl DispatchError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A dispatch failure together with the weight it actually consumed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{error}")]
pub struct DispatchErrorWithPostInfo {
    pub post_info: PostDispatchInfo,
    #[source]
    pub error: DispatchError,
}

impl From<DispatchError> for DispatchErrorWithPostInfo {
    fn from(error: DispatchError) -> Self {
        Self {
            post_info: PostDispatchInfo::default(),
            error,
        }
    }
}

pub type DispatchResult = Result<(), DispatchError>;
pub type DispatchResultWithPostInfo = Result<PostDispatchInfo, DispatchErrorWithPostInfo>;

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn test_unspent_is_capped_per_component() {
        let info = DispatchInfo::new(Weight::from_parts(1, 2), DispatchClass::Normal);
        let post = PostDispatchInfo::with_actual_weight(Weight::from_parts(3, 1));
        assert_eq!(post.calc_actual_weight(&info), Weight::from_parts(1, 1));
        assert_eq!(post.calc_unspent(&info), Weight::from_parts(0, 1));
    }

    #[test]
    fn test_missing_actual_weight_means_full_use() {
        let info = DispatchInfo::new(Weight::from_parts(5, 5), DispatchClass::Operational);
        let post = PostDispatchInfo::default();
        assert_eq!(post.calc_actual_weight(&info), info.weight);
        assert!(post.calc_unspent(&info).is_zero());
    }

    #[test]
    fn test_pays_fee_either_side_waives() {
        let mut info = DispatchInfo::default();
        let mut post = PostDispatchInfo::default();
        assert_eq!(post.pays_fee(&info), Pays::Yes);
        post.pays_fee = Pays::No;
        assert_eq!(post.pays_fee(&info), Pays::No);
        post.pays_fee = Pays::Yes;
        info.pays_fee = Pays::No;
        assert_eq!(post.pays_fee(&info), Pays::No);
    }

    #[test]
    fn test_consumed_weight_accounting() {
        let mut consumed = ConsumedWeight::default();
        consumed.accrue(Weight::from_parts(2, 2), DispatchClass::Normal);
        consumed.accrue(Weight::from_parts(1, 1), DispatchClass::Mandatory);
        assert_eq!(consumed.total(), Weight::from_parts(3, 3));

        consumed.reduce(Weight::from_parts(5, 1), DispatchClass::Normal);
        assert_eq!(consumed.normal, Weight::from_parts(0, 1));

        consumed.normal = Weight::from_parts(u64::MAX, 0);
        assert!(consumed
            .checked_accrue(Weight::from_parts(1, 0), DispatchClass::Normal)
            .is_none());
        assert_eq!(consumed.normal, Weight::from_parts(u64::MAX, 0));

        let decoded = ConsumedWeight::decode(consumed.encode()).unwrap();
        assert_eq!(decoded, consumed);
    }

    #[test]
    fn test_dispatch_class_codec_rejects_unknown() {
        assert!(DispatchClass::decode(&[3u8][..]).is_err());
        assert_eq!(
            DispatchClass::decode(&[1u8][..]).unwrap(),
            DispatchClass::Operational
        );
    }
}
