//! Label derivation: pack the 1–3 bytes following a window into one integer.
//!
//! Labels always index the *original* stream, never the padded one, so
//! context padding can never leak into a label.

pub use bitwin_common::Granularity;

/// Label for the window whose next original byte is at index `next`.
///
/// Returns `None` when `next` is past the end of `original`: only the first
/// label byte is required, missing trailing bytes of bigram/trigram labels
/// count as zero.
#[inline]
pub fn derive_label(original: &[u8], next: usize, granularity: Granularity) -> Option<u32> {
    let first = *original.get(next)? as u32;
    let at = |i: usize| original.get(next + i).copied().unwrap_or(0) as u32;
    let label = match granularity {
        Granularity::Unigram => first & 0x7F,
        Granularity::Bigram => (first << 8) | at(1),
        Granularity::Trigram => (first << 16) | (at(1) << 8) | at(2),
    };
    Some(label)
}

/// Parse a granularity selector and derive in one step, for string-typed callers.
pub fn derive_label_str(
    original: &[u8],
    next: usize,
    mode: &str,
) -> bitwin_common::Result<Option<u32>> {
    let granularity: Granularity = mode.parse()?;
    Ok(derive_label(original, next, granularity))
}

/// Unpack a label into its bytes, big-endian (`label_bytes()` bytes long).
/// Unigram labels come back with the top bit already cleared.
pub fn decode_label(label: u32, granularity: Granularity) -> Vec<u8> {
    let be = label.to_be_bytes();
    be[4 - granularity.label_bytes()..].to_vec()
}
