use crate::decode::{Decode, DecodeError};
use crate::encode::Encode;

/// A Firmata protocol or firmware version.
///
/// Reported by the board in response to a version query and in the header of
/// a firmware report. Both fields are plain 7-bit data bytes on the wire.
///
/// This type implements `PartialOrd`, meaning it can be compared to other
/// instances of itself.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    /// The major version
    pub major: u8,
    /// The minor version
    pub minor: u8,
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Encode for Version {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.major;
        data[1] = self.minor;
    }
}

impl Decode for Version {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let major = u8::decode(data)?;
        let minor = u8::decode(data)?;

        Ok(Self { major, minor })
    }
}
