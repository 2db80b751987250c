//! Read-only inspection helpers for dataset consumers.
//!
//! Everything a viewer needs short of drawing pixels: a dataset summary with
//! plausibility checks, a 2-D shape for displaying feature rows, a text grid
//! rendering, a printable-text view and a hex dump of the window bytes.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use bitwin_common::Granularity;
use bitwin_core::decode_label;

use crate::container::DatasetContainer;

// ── Summary ─────────────────────────────────────────────────────────────────

/// Aggregate facts about a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub file_size: Option<u64>,
    pub examples: usize,
    pub feature_width: usize,
    pub context_size: usize,
    pub granularity: Granularity,
    pub min_feature: Option<u8>,
    pub max_feature: Option<u8>,
    pub distinct_labels: usize,
    /// Most frequent labels, descending by count (ties by label value).
    pub top_labels: Vec<(u32, usize)>,
    /// `len(features) == len(labels)` and every feature is 0 or 1.
    pub plausible: bool,
}

impl DatasetSummary {
    pub fn from_container(container: &DatasetContainer, file_size: Option<u64>, top: usize) -> Self {
        let features = container.features();
        let min_feature = features.iter().copied().min();
        let max_feature = features.iter().copied().max();

        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for &label in container.labels() {
            *counts.entry(label).or_default() += 1;
        }
        let mut top_labels: Vec<(u32, usize)> = counts.iter().map(|(&l, &c)| (l, c)).collect();
        top_labels.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        top_labels.truncate(top);

        let plausible = features.nrows() == container.labels().len()
            && max_feature.map_or(true, |m| m <= 1);

        Self {
            file_size,
            examples: container.len(),
            feature_width: container.feature_width(),
            context_size: container.context_size(),
            granularity: container.granularity(),
            min_feature,
            max_feature,
            distinct_labels: counts.len(),
            top_labels,
            plausible,
        }
    }
}

// ── Shapes & rendering ──────────────────────────────────────────────────────

/// A `(rows, cols)` display shape for a feature row of `width` values:
/// square when possible, otherwise the factor pair closest to square,
/// otherwise a single row.
pub fn auto_shape(width: usize) -> (usize, usize) {
    if width == 0 {
        return (0, 0);
    }
    let side = (width as f64).sqrt() as usize;
    (1..=side.max(1))
        .rev()
        .find(|r| width % r == 0)
        .map(|r| (r, width / r))
        .unwrap_or((1, width))
}

/// Parse a `RxC` shape string; the product must equal `width`.
pub fn parse_shape(s: &str, width: usize) -> Option<(usize, usize)> {
    let (r, c) = s.split_once(['x', 'X'])?;
    let shape: (usize, usize) = (r.trim().parse().ok()?, c.trim().parse().ok()?);
    (shape.0.checked_mul(shape.1)? == width).then_some(shape)
}

/// Render 0/1 values as a text grid, `#` for 1 and `.` for 0.
pub fn render_grid(bits: &[u8], (rows, cols): (usize, usize)) -> String {
    let mut out = String::with_capacity(rows * (cols + 1));
    for row in bits.chunks(cols.max(1)).take(rows) {
        out.extend(row.iter().map(|&b| if b != 0 { '#' } else { '.' }));
        out.push('\n');
    }
    out
}

#[inline]
fn is_printable(b: u8) -> bool {
    (32..127).contains(&b)
}

/// Bytes as text, non-printable bytes shown as `·`.
pub fn printable_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if is_printable(b) { b as char } else { '·' })
        .collect()
}

/// Classic hex dump: offset, 16 bytes in groups of 4, ASCII column.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(16).enumerate() {
        let groups: Vec<String> = (0..4)
            .map(|g| {
                let part = chunk.get(g * 4..((g + 1) * 4).min(chunk.len())).unwrap_or(&[]);
                let hex: Vec<String> = part.iter().map(|b| format!("{b:02X}")).collect();
                format!("{:<11}", hex.join(" "))
            })
            .collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if is_printable(b) { b as char } else { '.' })
            .collect();
        let _ = writeln!(out, "{:08X}  {}  {:<16}", line * 16, groups.join(" | "), ascii);
    }
    out
}

const CONTROL_NAMES: [&str; 32] = [
    "NUL (null)",
    "SOH (start of heading)",
    "STX (start of text)",
    "ETX (end of text)",
    "EOT (end of transmission)",
    "ENQ (enquiry)",
    "ACK (acknowledge)",
    "BEL (bell)",
    "BS (backspace)",
    "TAB (horizontal tab)",
    "LF (line feed)",
    "VT (vertical tab)",
    "FF (form feed)",
    "CR (carriage return)",
    "SO (shift out)",
    "SI (shift in)",
    "DLE (data link escape)",
    "DC1 (device control 1)",
    "DC2 (device control 2)",
    "DC3 (device control 3)",
    "DC4 (device control 4)",
    "NAK (negative acknowledge)",
    "SYN (synchronous idle)",
    "ETB (end of trans. block)",
    "CAN (cancel)",
    "EM (end of medium)",
    "SUB (substitute)",
    "ESC (escape)",
    "FS (file separator)",
    "GS (group separator)",
    "RS (record separator)",
    "US (unit separator)",
];

/// ASCII name of a control byte (`0x00..=0x1F` and DEL).
pub fn control_name(b: u8) -> Option<&'static str> {
    match b {
        0x7F => Some("DEL (delete)"),
        _ => CONTROL_NAMES.get(usize::from(b)).copied(),
    }
}

/// Human-readable label: numeric value, its bytes as hex and text, and the
/// names of any control bytes among them.
pub fn describe_label(label: u32, granularity: Granularity) -> String {
    let bytes = decode_label(label, granularity);
    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
    let mut out = format!("{label} [{}] '{}'", hex.join(" "), printable_text(&bytes));
    let names: Vec<&str> = bytes.iter().filter_map(|&b| control_name(b)).collect();
    if !names.is_empty() {
        let _ = write!(out, " {}", names.join(", "));
    }
    out
}
