//! Byte-addressable, bit-accurate storage for scan vectors.  The engine reads
//! TDI from here one bit per TCK and writes the sampled TDO back over the same
//! bit, so a completed scan leaves the captured vector in place of the input.

/// Size of the vector store, matching the register bridge's buffer window.
pub const CAPACITY: usize = 1024;

pub struct ScanBuffer {
    bytes: [u8; CAPACITY],
}

impl ScanBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; CAPACITY],
        }
    }

    /// Byte and bit indexes wrap at the capacity, like the address decoder in
    /// front of a real memory; no access can fault.
    pub fn write_byte(&mut self, index: usize, value: u8) {
        self.bytes[index % CAPACITY] = value;
    }

    pub fn read_byte(&self, index: usize) -> u8 {
        self.bytes[index % CAPACITY]
    }

    /// Set one bit, preserving the other seven bits of the containing byte.
    /// Bits are numbered LSB-first within each byte.
    pub fn write_bit(&mut self, bit: usize, value: bool) {
        let byte = (bit / 8) % CAPACITY;
        let mask = 1 << (bit % 8);
        if value {
            self.bytes[byte] |= mask;
        } else {
            self.bytes[byte] &= !mask;
        }
    }

    pub fn read_bit(&self, bit: usize) -> bool {
        self.bytes[(bit / 8) % CAPACITY] >> (bit % 8) & 1 != 0
    }
}

impl Default for ScanBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of bytes an `bits`-bit vector occupies: the full bytes plus one more
/// for a trailing partial byte.
pub fn bytes_for_bits(bits: usize) -> usize {
    bits / 8 + usize::from(bits % 8 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_writes_preserve_neighbors() {
        let mut buf = ScanBuffer::new();
        buf.write_byte(0, 0xa5);
        buf.write_bit(1, true);
        assert_eq!(buf.read_byte(0), 0xa7);
        buf.write_bit(0, false);
        assert_eq!(buf.read_byte(0), 0xa6);
    }

    #[test]
    fn bits_are_lsb_first_within_bytes() {
        let mut buf = ScanBuffer::new();
        buf.write_byte(2, 0x01);
        assert!(buf.read_bit(16));
        assert!(!buf.read_bit(17));
        buf.write_bit(23, true);
        assert_eq!(buf.read_byte(2), 0x81);
    }

    #[test]
    fn indexes_wrap_at_capacity() {
        let mut buf = ScanBuffer::new();
        buf.write_byte(CAPACITY, 0x42);
        assert_eq!(buf.read_byte(0), 0x42);
        assert!(buf.read_bit(CAPACITY * 8 + 1));
    }

    #[test]
    fn packing_rule() {
        assert_eq!(bytes_for_bits(0), 0);
        assert_eq!(bytes_for_bits(1), 1);
        assert_eq!(bytes_for_bits(8), 1);
        assert_eq!(bytes_for_bits(9), 2);
        assert_eq!(bytes_for_bits(64), 8);
    }
}
