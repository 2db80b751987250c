//! Encoder: pads the stream, walks its windows and labels each one.
//!
//! Windowing and labeling are interleaved, one step per offset. With
//! `parallel` set, offsets are fanned out over rayon and collected back in
//! offset order, so the result is identical to the sequential pass.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use bitwin_common::{ContextSize, EncoderConfig, Granularity, Result};

use crate::label::derive_label;
use crate::padding::pad_context;
use crate::window::{Window, WindowSlicer};

// ── Observer ────────────────────────────────────────────────────────────────

/// Receives progress notifications while examples are produced.
///
/// Purely observational: nothing an observer does can change the output.
/// With a parallel encoder, checkpoints may arrive from worker threads.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _total: usize) {}
    fn on_checkpoint(&self, _done: usize, _total: usize) {}
    fn on_finish(&self, _done: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

// ── Output ──────────────────────────────────────────────────────────────────

/// A labeled window, by ordinal into the slicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labeled {
    pub window: usize,
    pub label: u32,
}

/// One example: a borrowed feature window and its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Example<'a> {
    pub window: Window<'a>,
    pub label: u32,
}

/// Everything produced by one encoder pass. Owns the padded arena; windows
/// borrow from it.
#[derive(Debug, Clone)]
pub struct EncodedExamples {
    context: ContextSize,
    granularity: Granularity,
    padded: Vec<u8>,
    rows: Vec<Labeled>,
}

impl EncodedExamples {
    pub fn context(&self) -> ContextSize {
        self.context
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Feature width in bits (`C * 8`).
    pub fn feature_width(&self) -> usize {
        self.context.bits()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn slicer(&self) -> WindowSlicer<'_> {
        WindowSlicer::from_padded(&self.padded, self.context)
    }

    pub fn labels(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.rows.iter().map(|r| r.label)
    }

    pub fn get(&self, i: usize) -> Option<Example<'_>> {
        let row = self.rows.get(i)?;
        let window = self.slicer().window(row.window)?;
        Some(Example {
            window,
            label: row.label,
        })
    }

    /// Examples in window order.
    pub fn iter(&self) -> impl Iterator<Item = Example<'_>> + '_ {
        let slicer = self.slicer();
        self.rows.iter().filter_map(move |row| {
            Some(Example {
                window: slicer.window(row.window)?,
                label: row.label,
            })
        })
    }
}

// ── Encoder ─────────────────────────────────────────────────────────────────

/// Pure computational core of a conversion.
#[derive(Debug, Clone)]
pub struct Encoder {
    context: ContextSize,
    granularity: Granularity,
    progress_every: usize,
    parallel: bool,
}

impl Encoder {
    /// Validates `config` up front so no invalid encoder can exist.
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            context: config.context()?,
            granularity: config.granularity,
            progress_every: config.progress_every,
            parallel: config.parallel,
        })
    }

    pub fn context(&self) -> ContextSize {
        self.context
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Encode `bytes` into labeled windows.
    pub fn encode(&self, bytes: &[u8], observer: &dyn ProgressObserver) -> EncodedExamples {
        tracing::debug!(context = self.context.bytes(), "padding");
        let padded = pad_context(bytes, self.context.bytes());

        let slicer = WindowSlicer::from_padded(&padded, self.context);
        tracing::debug!(
            bits = slicer.total_bits(),
            windows = slicer.len(),
            "expanded bit view"
        );

        let total = slicer.len();
        observer.on_start(total);
        let rows = if self.parallel {
            self.label_parallel(&slicer, observer)
        } else {
            self.label_sequential(&slicer, observer)
        };
        observer.on_finish(rows.len());

        tracing::debug!(examples = rows.len(), "windowing and labeling done");
        EncodedExamples {
            context: self.context,
            granularity: self.granularity,
            padded,
            rows,
        }
    }

    #[inline]
    fn label_window(&self, original: &[u8], window: &Window<'_>) -> Option<Labeled> {
        let label = derive_label(original, window.next_byte(self.context), self.granularity)?;
        Some(Labeled {
            window: window.index,
            label,
        })
    }

    fn label_sequential(
        &self,
        slicer: &WindowSlicer<'_>,
        observer: &dyn ProgressObserver,
    ) -> Vec<Labeled> {
        let original = slicer.original();
        let total = slicer.len();
        let mut rows = Vec::with_capacity(total);
        for window in slicer.windows() {
            if let Some(row) = self.label_window(original, &window) {
                rows.push(row);
                if rows.len() % self.progress_every == 0 {
                    observer.on_checkpoint(rows.len(), total);
                }
            }
        }
        rows
    }

    fn label_parallel(
        &self,
        slicer: &WindowSlicer<'_>,
        observer: &dyn ProgressObserver,
    ) -> Vec<Labeled> {
        let original = slicer.original();
        let total = slicer.len();
        let done = AtomicUsize::new(0);
        // Indexed collect keeps offset order regardless of scheduling.
        (0..total)
            .into_par_iter()
            .filter_map(|i| {
                let window = slicer.window(i)?;
                let row = self.label_window(original, &window)?;
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n % self.progress_every == 0 {
                    observer.on_checkpoint(n, total);
                }
                Some(row)
            })
            .collect()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn encoder(context: usize, granularity: Granularity) -> Encoder {
        Encoder::new(&EncoderConfig::new(context, granularity)).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(&'static str, usize)>>,
    }

    impl ProgressObserver for Recorder {
        fn on_start(&self, total: usize) {
            self.events.lock().unwrap().push(("start", total));
        }
        fn on_checkpoint(&self, done: usize, _total: usize) {
            self.events.lock().unwrap().push(("checkpoint", done));
        }
        fn on_finish(&self, done: usize) {
            self.events.lock().unwrap().push(("finish", done));
        }
    }

    #[test]
    fn abc_unigram_scenario() {
        let out = encoder(1, Granularity::Unigram).encode(b"ABC", &NoopObserver);
        assert_eq!(out.len(), 3);
        let examples: Vec<_> = out.iter().collect();
        assert_eq!(examples[0].window.bits(), vec![0; 8]);
        assert_eq!(examples[0].label, 65);
        assert_eq!(examples[1].window.bytes(), &[0x41]);
        assert_eq!(examples[1].label, 66);
        assert_eq!(examples[2].window.bytes(), &[0x42]);
        assert_eq!(examples[2].label, 67);
    }

    #[test]
    fn single_byte_with_wide_context() {
        let out = encoder(2, Granularity::Unigram).encode(&[0xC8], &NoopObserver);
        assert_eq!(out.len(), 1);
        let ex = out.get(0).unwrap();
        assert_eq!(ex.window.bits(), vec![0; 16]);
        assert_eq!(ex.label, 0xC8 & 0x7F);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        for g in Granularity::ALL {
            let out = encoder(3, g).encode(&[], &NoopObserver);
            assert!(out.is_empty());
            assert_eq!(out.iter().count(), 0);
        }
    }

    #[test]
    fn bigram_pads_missing_second_byte() {
        let out = encoder(1, Granularity::Bigram).encode(&[0x41, 0x42], &NoopObserver);
        let labels: Vec<_> = out.labels().collect();
        assert_eq!(labels, vec![0x4142, 0x4200]);
    }

    #[test]
    fn count_formula_holds_for_all_granularities() {
        let text = b"The quick brown fox jumps over the lazy dog";
        for g in Granularity::ALL {
            for c in [1, 3, 8] {
                let out = encoder(c, g).encode(text, &NoopObserver);
                assert_eq!(out.len(), text.len(), "{g} C={c}");
                assert!(out.labels().all(|l| l <= g.max_label()));
            }
        }
    }

    #[test]
    fn first_label_never_comes_from_padding() {
        let out = encoder(4, Granularity::Trigram).encode(b"xy", &NoopObserver);
        let first = out.get(0).unwrap();
        assert_eq!(first.label, (u32::from(b'x') << 16) | (u32::from(b'y') << 8));
        assert_ne!(first.label, 0);
    }

    #[test]
    fn parallel_matches_sequential() {
        let text: Vec<u8> = (0..5_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let mut config = EncoderConfig::new(5, Granularity::Trigram);
        config.progress_every = 97;
        let seq = Encoder::new(&config).unwrap().encode(&text, &NoopObserver);
        config.parallel = true;
        let par = Encoder::new(&config).unwrap().encode(&text, &NoopObserver);
        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.iter().zip(par.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn observer_sees_checkpoints() {
        let mut config = EncoderConfig::new(1, Granularity::Unigram);
        config.progress_every = 2;
        let recorder = Recorder::default();
        Encoder::new(&config).unwrap().encode(b"abcde", &recorder);
        let events = recorder.events.into_inner().unwrap();
        assert_eq!(
            events,
            vec![("start", 5), ("checkpoint", 2), ("checkpoint", 4), ("finish", 5)]
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(Encoder::new(&EncoderConfig::new(0, Granularity::Unigram)).is_err());
    }
}
