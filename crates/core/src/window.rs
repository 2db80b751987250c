//! Window slicing over the padded byte arena.
//!
//! A window is `C * 8` bits starting at a byte-aligned offset; consecutive
//! windows are 8 bits apart. Windows are addressed arithmetically over the
//! padded bytes, never cut out of a materialised bit array.
//!
//! A window is only emitted while at least one original byte follows it, so
//! a stream of `L` bytes yields exactly `L` windows.

use bitwin_common::{ContextSize, EncodeError, Result};

use crate::bits::{expand_bits, expand_bits_into, BitView};

/// Distance in bits between consecutive window starts.
pub const STRIDE_BITS: usize = 8;

/// One feature window: a borrowed view of `C` padded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    /// Ordinal of this window (0-based, left to right).
    pub index: usize,
    /// Start offset in the padded bit sequence; always a multiple of 8.
    pub start_bit: usize,
    bytes: &'a [u8],
}

impl<'a> Window<'a> {
    /// The `C` padded bytes backing this window.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Window width in bits.
    pub fn width_bits(&self) -> usize {
        self.bytes.len() * 8
    }

    /// First bit past the window in the padded bit sequence.
    pub fn end_bit(&self) -> usize {
        self.start_bit + self.width_bits()
    }

    /// Index into the *original* stream of the byte right after this window.
    pub fn next_byte(&self, context: ContextSize) -> usize {
        self.end_bit() / 8 - context.bytes()
    }

    /// Materialise the window's bits (MSB first per byte).
    pub fn bits(&self) -> Vec<u8> {
        expand_bits(self.bytes)
    }

    /// Write the window's bits into a preallocated row of `width_bits()` entries.
    pub fn write_bits(&self, row: &mut [u8]) {
        expand_bits_into(self.bytes, row);
    }

    pub fn view(&self) -> BitView<'a> {
        BitView::new(self.bytes)
    }
}

/// Enumerates the windows of a padded stream.
#[derive(Debug, Clone, Copy)]
pub struct WindowSlicer<'a> {
    padded: &'a [u8],
    context: ContextSize,
}

impl<'a> WindowSlicer<'a> {
    /// `padded` must start with the `context` padding bytes.
    pub fn new(padded: &'a [u8], context: ContextSize) -> Result<Self> {
        if padded.len() < context.bytes() {
            return Err(EncodeError::InvalidConfiguration(format!(
                "padded stream ({} bytes) shorter than context size {}",
                padded.len(),
                context.bytes()
            )));
        }
        Ok(Self { padded, context })
    }

    /// For arenas built by [`pad_context`](crate::padding::pad_context) with the same context.
    pub(crate) fn from_padded(padded: &'a [u8], context: ContextSize) -> Self {
        debug_assert!(padded.len() >= context.bytes());
        Self { padded, context }
    }

    pub fn context(&self) -> ContextSize {
        self.context
    }

    /// Length of the original (unpadded) stream.
    pub fn original_len(&self) -> usize {
        self.padded.len() - self.context.bytes()
    }

    /// The original stream, i.e. the padded arena without its padding.
    pub fn original(&self) -> &'a [u8] {
        &self.padded[self.context.bytes()..]
    }

    /// Total length of the padded bit sequence.
    pub fn total_bits(&self) -> usize {
        self.padded.len() * 8
    }

    /// Number of windows that will be emitted.
    pub fn len(&self) -> usize {
        self.original_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Random access to window `index`.
    #[inline]
    pub fn window(&self, index: usize) -> Option<Window<'a>> {
        if index >= self.len() {
            return None;
        }
        let start_bit = index * STRIDE_BITS;
        let start = start_bit / 8;
        Some(Window {
            index,
            start_bit,
            bytes: &self.padded[start..start + self.context.bytes()],
        })
    }

    /// Fresh left-to-right pass over all windows. Can be called any number of times.
    pub fn windows(&self) -> Windows<'a> {
        Windows {
            slicer: *self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &WindowSlicer<'a> {
    type Item = Window<'a>;
    type IntoIter = Windows<'a>;

    fn into_iter(self) -> Windows<'a> {
        self.windows()
    }
}

/// Iterator returned by [`WindowSlicer::windows`].
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    slicer: WindowSlicer<'a>,
    next: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Window<'a>> {
        let w = self.slicer.window(self.next)?;
        self.next += 1;
        Some(w)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.slicer.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows<'_> {}

impl std::iter::FusedIterator for Windows<'_> {}
