//! # bitwin-core — The Encoding Engine
//!
//! Every step between a raw byte stream and a labeled example lives here:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`bits`] | `expand_bits`, `pack_bits`, `BitView` (MSB-first bit addressing) |
//! | [`padding`] | `pad_context` (zero warm-up context) |
//! | [`window`] | `WindowSlicer`, `Window` (byte-strided windows over the padded arena) |
//! | [`label`] | `derive_label`, `decode_label` (unigram / bigram / trigram packing) |
//! | [`encoder`] | `Encoder`, `ProgressObserver` (one interleaved window+label pass) |
//!
//! ## Design principles
//!
//! 1. **Pure.** No I/O and no display code; progress goes through an observer.
//! 2. **Arithmetic windows.** Windows index into the padded bytes; the full bit
//!    sequence is never materialised unless asked for.
//! 3. **Deterministic.** Same bytes + same config = same examples, in the same
//!    order, sequential or parallel.

pub mod bits;
pub mod encoder;
pub mod label;
pub mod padding;
pub mod window;

// ── Public re-exports ───────────────────────────────────────────────────────

pub use bits::{byte_bits, expand_bits, pack_bits, BitView};
pub use encoder::{EncodedExamples, Encoder, Example, Labeled, NoopObserver, ProgressObserver};
pub use label::{decode_label, derive_label, Granularity};
pub use padding::{pad_context, pad_context_checked};
pub use window::{Window, WindowSlicer, Windows, STRIDE_BITS};
