use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    pub fn new<T>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Failed to decode {}: {}", self.type_name, self.kind)
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Payload was too short.")]
    UnexpectedEnd,

    #[error("Expected exactly {expected} wire bytes, found {found}.")]
    MalformedPayload { expected: usize, found: usize },
}

/// A type that can be reconstructed (decoded) from a raw sequence of bytes.
///
/// The input slice is advanced by the number of bytes consumed during
/// decoding.
pub trait Decode {
    /// Attempts to decode `Self` from the beginning of the provided byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or insufficient
    /// to decode a complete value of this type.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

impl Decode for () {
    fn decode(_data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(())
    }
}

impl Decode for u8 {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let (&first, rest) = data
            .split_first()
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
        *data = rest;
        Ok(first)
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes: [u8; N] = data
            .get(..N)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
        *data = &data[N..];
        Ok(bytes)
    }
}
