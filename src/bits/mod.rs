//! Fixed-length bit container with LSB-first byte semantics.
//!
//! Bit `i` of a [`Bitstring`] populated from bytes is bit `i % 8` of byte
//! `i / 8`, counting from the least significant bit. Tree navigation and
//! prefix keys are defined in terms of this indexing, so it is part of the
//! cross-peer wire contract.

use core::fmt;

use bitvec::prelude::{BitSlice, BitVec, Lsb0};

/// Fixed-length sequence of bits. The length is chosen at construction and
/// never changes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bitstring {
    bits: BitVec<u8, Lsb0>,
}

impl Bitstring {
    /// Creates an all-zero bitstring of `len` bits.
    pub fn new(len: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, len),
        }
    }

    /// Number of bits in the container.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` for a zero-length bitstring.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Reads bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// Forces bit `index` to one.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set(&mut self, index: usize) {
        self.bits.set(index, true);
    }

    /// Forces bit `index` to zero.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn unset(&mut self, index: usize) {
        self.bits.set(index, false);
    }

    /// Copies the byte pattern into the container, LSB-first within each
    /// byte. Source bits beyond the fixed length are discarded; when the
    /// source is shorter than the container the remaining bits are cleared.
    pub fn set_bytes(&mut self, bytes: &[u8]) {
        let src = BitSlice::<u8, Lsb0>::from_slice(bytes);
        let copied = self.bits.len().min(src.len());
        self.bits[..copied].copy_from_bitslice(&src[..copied]);
        self.bits[copied..].fill(false);
    }

    /// Builds a bitstring of `len` bits directly from a byte pattern.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Self {
        let mut bs = Self::new(len);
        bs.set_bytes(bytes);
        bs
    }
}

impl fmt::Display for Bitstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter() {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bitstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitstring({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::Bitstring;

    #[test]
    fn set_unset_get_ok() {
        let mut bs = Bitstring::new(12);
        assert_eq!(bs.len(), 12);
        assert!(!bs.get(5));

        bs.set(5);
        assert!(bs.get(5));
        bs.unset(5);
        assert!(!bs.get(5));
    }

    #[test]
    fn set_bytes_is_lsb_first_ok() {
        let mut bs = Bitstring::new(16);
        bs.set_bytes(&[0b0000_0001, 0b1000_0000]);
        assert!(bs.get(0));
        for i in 1..15 {
            assert!(!bs.get(i), "bit {} should be clear", i);
        }
        assert!(bs.get(15));
    }

    #[test]
    fn set_bytes_truncates_and_pads_ok() {
        let mut bs = Bitstring::new(4);
        bs.set_bytes(&[0xff, 0xff]);
        assert_eq!(bs.to_string(), "1111");

        let mut bs = Bitstring::new(12);
        bs.set_bytes(&[0xff, 0xff]);
        bs.set_bytes(&[0x01]);
        // The second call clears everything the first one set past byte 0.
        assert_eq!(bs.to_string(), "100000000000");
    }

    #[test]
    fn display_renders_bit_order_ok() {
        let bs = Bitstring::from_bytes(&[0b0000_0110], 5);
        assert_eq!(bs.to_string(), "01100");
        assert_eq!(format!("{:?}", bs), "Bitstring(01100)");
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        let bs = Bitstring::new(3);
        let _ = bs.get(3);
    }
}
