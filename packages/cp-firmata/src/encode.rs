use alloc::vec::Vec;

/// A type that can be encoded into a sequence of bytes.
pub trait Encode {
    /// Returns the number of bytes this value will take when encoded.
    fn size(&self) -> usize;

    /// Encodes this instance into the provided byte slice.
    fn encode(&self, data: &mut [u8]);

    /// Encodes this instance into a newly allocated buffer.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut data = alloc::vec![0; self.size()];
        self.encode(&mut data);
        data
    }
}

impl Encode for u8 {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = *self;
    }
}

impl Encode for () {
    fn size(&self) -> usize {
        0
    }
    fn encode(&self, _data: &mut [u8]) {}
}

impl Encode for &[u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[..self.len()].copy_from_slice(self);
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn size(&self) -> usize {
        N
    }

    fn encode(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(self);
    }
}

impl Encode for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        self.as_slice().encode(data)
    }
}

/// Sequential writer over a pre-sized output buffer.
///
/// Each call to [`MessageEncoder::write`] encodes a value at the current
/// position and advances past it.
pub struct MessageEncoder<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> MessageEncoder<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self::new_with_position(data, 0)
    }

    pub fn new_with_position(data: &'a mut [u8], position: usize) -> Self {
        Self { data, position }
    }

    pub fn write(&mut self, value: &impl Encode) {
        let size = value.size();
        value.encode(&mut self.data[self.position..self.position + size]);
        self.position += size;
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::{Encode, MessageEncoder};

    #[test]
    fn encoder_writes_sequentially() {
        let mut buf = [0; 5];
        let mut enc = MessageEncoder::new_with_position(&mut buf, 1);

        enc.write(&0x7Fu8);
        enc.write(&[0x01u8, 0x02]);
        enc.write(&());
        assert_eq!(enc.position(), 4);
        assert_eq!(buf, [0, 0x7F, 0x01, 0x02, 0]);
    }

    #[test]
    fn encode_to_vec_matches_size() {
        let encoded = [0x10u8, 0x20, 0x30].encode_to_vec();
        assert_eq!(encoded, [0x10, 0x20, 0x30]);
    }
}
