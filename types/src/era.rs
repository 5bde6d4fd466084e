use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use thiserror::Error as ThisError;

/// Largest mortal period (in blocks) that can be encoded.
pub const MAX_PERIOD: u64 = 1 << 16;

/// Smallest mortal period (in blocks) that can be encoded.
pub const MIN_PERIOD: u64 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum EraError {
    #[error("period {0} is not a power of two in 4..=65536")]
    InvalidPeriod(u64),
    #[error("phase {phase} is not a quantized value below period {period}")]
    InvalidPhase { period: u64, phase: u64 },
}

/// Validity window of a transaction.
///
/// A mortal transaction is bound to the hash of the block where its window
/// starts (its birth block) and stops being valid `period` blocks later.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Era {
    #[default]
    Immortal,
    Mortal(MortalEra),
}

/// Period and phase of a mortal era.
///
/// Only encodable pairs can be constructed: `period` is a power of two in
/// `MIN_PERIOD..=MAX_PERIOD` and `phase` is a quantized value below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MortalEra {
    period: u64,
    phase: u64,
}

impl MortalEra {
    pub fn new(period: u64, phase: u64) -> Result<Self, EraError> {
        if !period.is_power_of_two() || !(MIN_PERIOD..=MAX_PERIOD).contains(&period) {
            return Err(EraError::InvalidPeriod(period));
        }
        if phase >= period || phase % quantize_factor(period) != 0 {
            return Err(EraError::InvalidPhase { period, phase });
        }
        Ok(Self { period, phase })
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn phase(&self) -> u64 {
        self.phase
    }
}

impl Era {
    /// Create a mortal era starting near `current` and lasting about `period` blocks.
    ///
    /// The period is rounded up to a power of two in `4..=65536` and the phase is
    /// quantized so it survives the two-byte encoding.
    pub fn mortal(period: u64, current: u64) -> Self {
        let period = period
            .checked_next_power_of_two()
            .unwrap_or(MAX_PERIOD)
            .clamp(MIN_PERIOD, MAX_PERIOD);
        let phase = current % period;
        let quantize_factor = quantize_factor(period);
        Self::Mortal(MortalEra {
            period,
            phase: phase / quantize_factor * quantize_factor,
        })
    }

    pub fn immortal() -> Self {
        Self::Immortal
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Self::Immortal)
    }

    /// Block number at which the window containing `current` started.
    pub fn birth(&self, current: u64) -> u64 {
        match *self {
            Self::Immortal => 0,
            Self::Mortal(MortalEra { period, phase }) => {
                (current.max(phase) - phase) / period * period + phase
            }
        }
    }

    /// First block number at which the era is no longer valid.
    pub fn death(&self, current: u64) -> u64 {
        match *self {
            Self::Immortal => u64::MAX,
            Self::Mortal(era) => self.birth(current).saturating_add(era.period),
        }
    }
}

impl From<MortalEra> for Era {
    fn from(era: MortalEra) -> Self {
        Self::Mortal(era)
    }
}

fn quantize_factor(period: u64) -> u64 {
    (period >> 12).max(1)
}

impl Write for Era {
    fn write(&self, writer: &mut impl BufMut) {
        match *self {
            Self::Immortal => 0u8.write(writer),
            Self::Mortal(MortalEra { period, phase }) => {
                let quantize_factor = quantize_factor(period);
                let low = (period.trailing_zeros().saturating_sub(1)).clamp(1, 15) as u16;
                let high = ((phase / quantize_factor) << 4) as u16;
                writer.put_u16_le(low | high);
            }
        }
    }
}

impl Read for Era {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let first = u8::read(reader)?;
        if first == 0 {
            return Ok(Self::Immortal);
        }
        let second = u8::read(reader)?;
        let encoded = first as u64 + ((second as u64) << 8);
        let period = 2u64 << (encoded % (1 << 4));
        let phase = (encoded >> 4) * quantize_factor(period);
        MortalEra::new(period, phase)
            .map(Self::Mortal)
            .map_err(|_| Error::Invalid("Era", "invalid period and phase"))
    }
}

impl EncodeSize for Era {
    fn encode_size(&self) -> usize {
        match self {
            Self::Immortal => 1,
            Self::Mortal(_) => 2,
        }
    }
}
