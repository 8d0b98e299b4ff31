//! 7-bit wire encoding.
//!
//! Firmata reserves the high bit of every byte for framing, so anything wider
//! than seven bits has to be spread over several *wire bytes* before it can be
//! sent. Decoders always mask their input with `0x7F`, so garbage in the high
//! bit can never produce an out-of-range value.
//!
//! | Value     | Wire bytes | Layout |
//! |-----------|------------|--------|
//! | `u8`      | 2          | low 7 bits, then bit 7 in bit 0 |
//! | `u14`     | 2          | low 7 bits, then high 7 bits |
//! | `f32`     | 8          | four encoded bytes, little endian |
//! | `i32`     | 8          | four encoded bytes, little endian |
//! | RGB       | 4          | 24 color bits redistributed, see [`encode_rgb_packed`] |

use crate::decode::{DecodeError, DecodeErrorKind};

/// Mask selecting the significant bits of a wire byte.
pub const WIRE_MASK: u8 = 0x7F;

/// Largest value representable by [`encode_u14`].
pub const U14_MAX: u16 = 0x3FFF;

fn check_len<T>(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() != expected {
        return Err(DecodeError::new::<T>(DecodeErrorKind::MalformedPayload {
            expected,
            found: bytes.len(),
        }));
    }

    Ok(())
}

/// Splits one byte into two wire bytes.
pub const fn encode_byte(value: u8) -> [u8; 2] {
    [value & WIRE_MASK, (value >> 7) & 0x01]
}

/// Reassembles a byte from the two wire bytes produced by [`encode_byte`].
///
/// # Errors
///
/// Fails with [`DecodeErrorKind::MalformedPayload`] unless `bytes` is exactly
/// two wire bytes long.
pub fn decode_byte(bytes: &[u8]) -> Result<u8, DecodeError> {
    check_len::<u8>(bytes, 2)?;
    Ok((bytes[0] & WIRE_MASK) | ((bytes[1] & 0x01) << 7))
}

/// Splits a 14-bit value into low and high 7-bit halves.
///
/// Values above [`U14_MAX`] wrap: only the low 14 bits are kept.
pub const fn encode_u14(value: u16) -> [u8; 2] {
    let value = value & U14_MAX;
    [(value & WIRE_MASK as u16) as u8, (value >> 7) as u8]
}

/// Reassembles a 14-bit value from the two wire bytes produced by [`encode_u14`].
///
/// # Errors
///
/// Fails with [`DecodeErrorKind::MalformedPayload`] unless `bytes` is exactly
/// two wire bytes long.
pub fn decode_u14(bytes: &[u8]) -> Result<u16, DecodeError> {
    check_len::<u16>(bytes, 2)?;
    Ok((bytes[0] & WIRE_MASK) as u16 | (((bytes[1] & WIRE_MASK) as u16) << 7))
}

fn encode_le_bytes(bytes: [u8; 4]) -> [u8; 8] {
    let mut out = [0; 8];
    for (chunk, byte) in out.chunks_exact_mut(2).zip(bytes) {
        chunk.copy_from_slice(&encode_byte(byte));
    }
    out
}

fn decode_le_bytes<T>(bytes: &[u8]) -> Result<[u8; 4], DecodeError> {
    check_len::<T>(bytes, 8)?;

    let mut out = [0; 4];
    for (byte, chunk) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        *byte = decode_byte(chunk)?;
    }
    Ok(out)
}

/// Encodes an IEEE-754 single as eight wire bytes.
pub fn encode_float32(value: f32) -> [u8; 8] {
    encode_le_bytes(value.to_le_bytes())
}

/// Decodes an IEEE-754 single from eight wire bytes.
///
/// # Errors
///
/// Fails with [`DecodeErrorKind::MalformedPayload`] unless `bytes` is exactly
/// eight wire bytes long.
pub fn decode_float32(bytes: &[u8]) -> Result<f32, DecodeError> {
    decode_le_bytes::<f32>(bytes).map(f32::from_le_bytes)
}

/// Encodes a signed 32-bit integer as eight wire bytes.
pub fn encode_i32(value: i32) -> [u8; 8] {
    encode_le_bytes(value.to_le_bytes())
}

/// Decodes a signed 32-bit integer from eight wire bytes.
///
/// # Errors
///
/// Fails with [`DecodeErrorKind::MalformedPayload`] unless `bytes` is exactly
/// eight wire bytes long.
pub fn decode_i32(bytes: &[u8]) -> Result<i32, DecodeError> {
    decode_le_bytes::<i32>(bytes).map(i32::from_le_bytes)
}

/// Packs a 24-bit color into four wire bytes.
///
/// The layout is fixed by the board firmware:
///
/// ```text
/// byte 0: 0 r7 r6 r5 r4 r3 r2 r1
/// byte 1: 0 r0 g7 g6 g5 g4 g3 g2
/// byte 2: 0 g1 g0 b7 b6 b5 b4 b3
/// byte 3: 0 b2 b1 b0  0  0  0  0
/// ```
pub const fn encode_rgb_packed(r: u8, g: u8, b: u8) -> [u8; 4] {
    [
        r >> 1,
        ((r & 0x01) << 6) | (g >> 2),
        ((g & 0x03) << 5) | (b >> 3),
        (b & 0x07) << 4,
    ]
}

/// Unpacks a color packed by [`encode_rgb_packed`].
///
/// # Errors
///
/// Fails with [`DecodeErrorKind::MalformedPayload`] unless `bytes` is exactly
/// four wire bytes long.
pub fn decode_rgb_packed(bytes: &[u8]) -> Result<(u8, u8, u8), DecodeError> {
    check_len::<(u8, u8, u8)>(bytes, 4)?;
    let [b0, b1, b2, b3] = [
        bytes[0] & WIRE_MASK,
        bytes[1] & WIRE_MASK,
        bytes[2] & WIRE_MASK,
        bytes[3] & WIRE_MASK,
    ];

    let r = (b0 << 1) | (b1 >> 6);
    let g = ((b1 & 0x3F) << 2) | (b2 >> 5);
    let b = ((b2 & 0x1F) << 3) | (b3 >> 4);

    Ok((r, g, b))
}
