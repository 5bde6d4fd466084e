use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

/// 32-byte account identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero account cannot sign anything.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Write for AccountId {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for AccountId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(<[u8; 32]>::read(reader)?))
    }
}

impl FixedSize for AccountId {
    const SIZE: usize = 32;
}

/// Per-account bookkeeping kept by the system module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    /// Number of transactions this account has sent.
    pub nonce: u64,
    pub consumers: u32,
    pub providers: u32,
    pub sufficients: u32,
}

impl Write for AccountInfo {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.consumers.write(writer);
        self.providers.write(writer);
        self.sufficients.write(writer);
    }
}

impl Read for AccountInfo {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
            consumers: u32::read(reader)?,
            providers: u32::read(reader)?,
            sufficients: u32::read(reader)?,
        })
    }
}

impl FixedSize for AccountInfo {
    const SIZE: usize = u64::SIZE + 3 * u32::SIZE;
}
