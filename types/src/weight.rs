use bytes::{Buf, BufMut};
use commonware_codec::{varint::UInt, EncodeSize, Error, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

/// Two-dimensional resource measure: execution time and proof size.
///
/// All arithmetic is explicit: callers pick saturating or checked variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Weight {
    pub ref_time: u64,
    pub proof_size: u64,
}

impl Weight {
    pub const fn zero() -> Self {
        Self {
            ref_time: 0,
            proof_size: 0,
        }
    }

    pub const fn from_parts(ref_time: u64, proof_size: u64) -> Self {
        Self {
            ref_time,
            proof_size,
        }
    }

    pub const fn max_value() -> Self {
        Self::from_parts(u64::MAX, u64::MAX)
    }

    pub const fn is_zero(&self) -> bool {
        self.ref_time == 0 && self.proof_size == 0
    }

    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self {
            ref_time: self.ref_time.saturating_add(rhs.ref_time),
            proof_size: self.proof_size.saturating_add(rhs.proof_size),
        }
    }

    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self {
            ref_time: self.ref_time.saturating_sub(rhs.ref_time),
            proof_size: self.proof_size.saturating_sub(rhs.proof_size),
        }
    }

    pub fn saturating_accrue(&mut self, amount: Self) {
        *self = self.saturating_add(amount);
    }

    pub fn saturating_reduce(&mut self, amount: Self) {
        *self = self.saturating_sub(amount);
    }

    /// Returns `None` if either component overflows.
    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        Some(Self {
            ref_time: self.ref_time.checked_add(rhs.ref_time)?,
            proof_size: self.proof_size.checked_add(rhs.proof_size)?,
        })
    }

    /// Returns `None` if either component underflows.
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        Some(Self {
            ref_time: self.ref_time.checked_sub(rhs.ref_time)?,
            proof_size: self.proof_size.checked_sub(rhs.proof_size)?,
        })
    }

    pub fn checked_accrue(&mut self, amount: Self) -> Option<()> {
        *self = self.checked_add(&amount)?;
        Some(())
    }

    /// Component-wise minimum.
    pub fn min(&self, other: Self) -> Self {
        Self {
            ref_time: self.ref_time.min(other.ref_time),
            proof_size: self.proof_size.min(other.proof_size),
        }
    }

    /// Component-wise maximum.
    pub fn max(&self, other: Self) -> Self {
        Self {
            ref_time: self.ref_time.max(other.ref_time),
            proof_size: self.proof_size.max(other.proof_size),
        }
    }

    /// True if any component of `self` is strictly greater than in `other`.
    pub fn any_gt(&self, other: Self) -> bool {
        self.ref_time > other.ref_time || self.proof_size > other.proof_size
    }

    /// True if every component of `self` is strictly greater than in `other`.
    pub fn all_gt(&self, other: Self) -> bool {
        self.ref_time > other.ref_time && self.proof_size > other.proof_size
    }

    pub fn all_lte(&self, other: Self) -> bool {
        !self.any_gt(other)
    }
}

impl Write for Weight {
    fn write(&self, writer: &mut impl BufMut) {
        UInt(self.ref_time).write(writer);
        UInt(self.proof_size).write(writer);
    }
}

impl Read for Weight {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let ref_time = UInt::read(reader)?.into();
        let proof_size = UInt::read(reader)?.into();
        Ok(Self {
            ref_time,
            proof_size,
        })
    }
}

impl EncodeSize for Weight {
    fn encode_size(&self) -> usize {
        UInt(self.ref_time).encode_size() + UInt(self.proof_size).encode_size()
    }
}
