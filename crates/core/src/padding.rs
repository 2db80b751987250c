//! Context padding: zero bytes prepended so the first real bytes get a full
//! (all-zero) warm-up window.

use bitwin_common::{EncodeError, Result, MAX_CONTEXT_SIZE};

/// `context_bytes` zeros followed by `bytes`. `0` returns a plain copy.
pub fn pad_context(bytes: &[u8], context_bytes: usize) -> Vec<u8> {
    let mut padded = Vec::with_capacity(context_bytes + bytes.len());
    padded.resize(context_bytes, 0);
    padded.extend_from_slice(bytes);
    padded
}

/// [`pad_context`] for an unvalidated signed count, as it arrives from user input.
pub fn pad_context_checked(bytes: &[u8], context_bytes: i64) -> Result<Vec<u8>> {
    let n = usize::try_from(context_bytes).map_err(|_| {
        EncodeError::InvalidConfiguration(format!(
            "context padding must not be negative (got {context_bytes})"
        ))
    })?;
    if n > MAX_CONTEXT_SIZE {
        return Err(EncodeError::InvalidConfiguration(format!(
            "context padding {n} exceeds the maximum of {MAX_CONTEXT_SIZE}"
        )));
    }
    Ok(pad_context(bytes, n))
}
