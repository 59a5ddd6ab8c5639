use arrayvec::ArrayVec;
use core::ops::Deref;

/// Largest frame the decoder can store: ID, 8 data bytes and checksum.
pub const MAX_FRAME_LEN: usize = 1 + 8 + 1;

/// The fixed value of the byte following a break.
pub const SYNC_BYTE: u8 = 0x55;

/// One decoded LIN frame: the raw ID byte followed by the response bytes,
/// in the order they were sampled. The sync byte is validated by the decoder
/// but never stored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: ArrayVec<u8, MAX_FRAME_LEN>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Append a byte.
    ///
    /// Panics if the frame already holds [`MAX_FRAME_LEN`] bytes; the decoder
    /// checks the configured limit before every append.
    pub fn push_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl From<&[u8]> for Frame {
    /// Bytes past [`MAX_FRAME_LEN`] are dropped.
    fn from(bytes: &[u8]) -> Self {
        let mut frame = Self::new();
        for byte in bytes.iter().take(MAX_FRAME_LEN) {
            frame.push_byte(*byte);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_reset() {
        let mut frame = Frame::new();
        assert!(frame.is_empty());
        frame.push_byte(0x3c);
        frame.push_byte(0x01);
        assert_eq!(frame.as_bytes(), &[0x3c, 0x01]);
        assert_eq!(frame.len(), 2);
        frame.reset();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_from_slice_truncates() {
        let frame = Frame::from(&[7u8; 12][..]);
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }

    #[test]
    #[should_panic]
    fn test_push_past_capacity_panics() {
        let mut frame = Frame::from(&[0u8; MAX_FRAME_LEN][..]);
        frame.push_byte(1);
    }
}
