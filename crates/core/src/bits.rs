//! Bit expansion: bytes → 0/1 values, most-significant bit first.
//!
//! [`expand_bits`] materialises the whole sequence; [`BitView`] addresses the
//! same sequence by arithmetic over the backing bytes without allocating.

/// The 8 bits of `byte`, MSB first.
#[inline]
pub fn byte_bits(byte: u8) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (i, bit) in out.iter_mut().enumerate() {
        *bit = (byte >> (7 - i)) & 1;
    }
    out
}

/// Expand `bytes` into `8 * bytes.len()` bits, each byte MSB first.
pub fn expand_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        bits.extend_from_slice(&byte_bits(b));
    }
    bits
}

/// Append the bits of `bytes` to `out` (used to fill feature rows in place).
pub fn expand_bits_into(bytes: &[u8], out: &mut [u8]) {
    debug_assert_eq!(out.len(), bytes.len() * 8);
    for (chunk, &b) in out.chunks_exact_mut(8).zip(bytes) {
        chunk.copy_from_slice(&byte_bits(b));
    }
}

/// Inverse of [`expand_bits`]: pack 0/1 values back into bytes, MSB first.
/// A trailing partial group is padded with zero bits on the right.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit & 1) << (7 - i)))
        })
        .collect()
}

/// Index-addressable bit view over a byte slice.
#[derive(Debug, Clone, Copy)]
pub struct BitView<'a> {
    bytes: &'a [u8],
}

impl<'a> BitView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Total number of bits.
    pub fn len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bit at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        let byte = *self.bytes.get(index / 8)?;
        Some((byte >> (7 - index % 8)) & 1)
    }

    /// Bytes backing a byte-aligned bit range `[start_bit, start_bit + width_bits)`.
    pub fn byte_range(&self, start_bit: usize, width_bits: usize) -> Option<&'a [u8]> {
        if start_bit % 8 != 0 || width_bits % 8 != 0 {
            return None;
        }
        let start = start_bit / 8;
        self.bytes.get(start..start + width_bits / 8)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + 'a {
        self.bytes.iter().flat_map(|&b| byte_bits(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first() {
        assert_eq!(byte_bits(0x41), [0, 1, 0, 0, 0, 0, 0, 1]);
        assert_eq!(byte_bits(0x80), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(byte_bits(0x00), [0; 8]);
        assert_eq!(byte_bits(0xFF), [1; 8]);
    }

    #[test]
    fn expand_length_and_values() {
        let bits = expand_bits(&[0x41, 0x42]);
        assert_eq!(bits.len(), 16);
        assert_eq!(&bits[8..], &[0, 1, 0, 0, 0, 0, 1, 0]);
        assert!(expand_bits(&[]).is_empty());
    }

    #[test]
    fn total_over_all_byte_values() {
        let all: Vec<u8> = (0..=255).collect();
        let bits = expand_bits(&all);
        assert_eq!(bits.len(), 256 * 8);
        assert!(bits.iter().all(|&b| b <= 1));
        assert_eq!(pack_bits(&bits), all);
    }

    #[test]
    fn expand_into_matches_expand() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF];
        let mut out = vec![9u8; 32];
        expand_bits_into(&bytes, &mut out);
        assert_eq!(out, expand_bits(&bytes));
    }

    #[test]
    fn pack_partial_group() {
        assert_eq!(pack_bits(&[1, 0, 1]), vec![0b1010_0000]);
    }

    #[test]
    fn view_agrees_with_expansion() {
        let bytes = [0x00, 0x41, 0x7F];
        let view = BitView::new(&bytes);
        let expanded = expand_bits(&bytes);
        assert_eq!(view.len(), expanded.len());
        for (i, &bit) in expanded.iter().enumerate() {
            assert_eq!(view.get(i), Some(bit), "bit {i}");
        }
        assert_eq!(view.get(24), None);
        assert_eq!(view.iter().collect::<Vec<_>>(), expanded);
    }

    #[test]
    fn view_byte_range_requires_alignment() {
        let bytes = [1, 2, 3, 4];
        let view = BitView::new(&bytes);
        assert_eq!(view.byte_range(8, 16), Some(&bytes[1..3]));
        assert_eq!(view.byte_range(4, 16), None);
        assert_eq!(view.byte_range(24, 16), None);
    }
}
