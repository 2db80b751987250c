//! Persisted container format (`.bwds`).
//!
//! # Format
//!
//! ```text
//! [MAGIC: 4 bytes "BWDS"]
//! [VERSION: u32 LE]
//! [META_JSON_LEN: u32 LE]
//! [META_JSON: utf-8, DatasetMeta]
//! [N: u64 LE]            number of examples
//! [W: u64 LE]            feature width in bits (multiple of 8)
//! [FEATURES: N rows × W/8 bytes, bits packed MSB first]
//! [LABELS: N × u32 LE]
//! ```
//!
//! Feature rows are stored packed (a row is exactly the window's bytes) and
//! unpacked to 0/1 on load, so readers always see the `[N, W]` / `[N]` pair.
//!
//! * **[`write_container`]** — atomic write: temp file in the target directory,
//!   renamed into place only on success.
//! * **[`read_container`]** — load the whole file into a [`DatasetContainer`].
//! * **[`MmapDataset`]** — zero-copy random access for viewers via `memmap2`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ndarray::{Array1, Array2};
use tempfile::NamedTempFile;

use bitwin_common::{ContextSize, EncodeError, Result};
use bitwin_core::bits::{expand_bits, expand_bits_into, pack_bits};

use crate::container::{DatasetContainer, DatasetMeta};

/// Magic bytes for the container format.
pub const MAGIC: &[u8; 4] = b"BWDS";
/// Current format version.
pub const VERSION: u32 = 1;

// ── Writing ─────────────────────────────────────────────────────────────────

/// Serialise `container` to `path`, replacing any existing file.
///
/// Returns the number of bytes written. On any failure the destination is
/// left untouched and the temporary file is removed.
pub fn write_container(path: &Path, container: &DatasetContainer) -> Result<u64> {
    let unwritable = |source| EncodeError::OutputUnwritable {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let tmp = NamedTempFile::new_in(&dir).map_err(unwritable)?;
    let mut w = BufWriter::new(tmp);
    let written = encode_into(&mut w, container).map_err(|e| match e {
        EncodeError::Io(source) => unwritable(source),
        other => other,
    })?;
    let tmp = w.into_inner().map_err(|e| unwritable(e.into_error()))?;
    tmp.as_file().sync_all().map_err(unwritable)?;
    tmp.persist(path).map_err(|e| unwritable(e.error))?;

    tracing::debug!(path = %path.display(), bytes = written, "container written");
    Ok(written)
}

/// Serialise to any writer. Returns the byte count.
pub fn encode_into<W: Write>(w: &mut W, container: &DatasetContainer) -> Result<u64> {
    let meta_json = serde_json::to_vec(container.meta())?;
    let n = container.len();
    let width = container.feature_width();

    w.write_all(MAGIC)?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&(meta_json.len() as u32).to_le_bytes())?;
    w.write_all(&meta_json)?;
    w.write_all(&(n as u64).to_le_bytes())?;
    w.write_all(&(width as u64).to_le_bytes())?;

    let mut written = (4 + 4 + 4 + meta_json.len() + 8 + 8) as u64;
    for row in container.features().rows() {
        let packed = pack_bits(&row.to_vec());
        w.write_all(&packed)?;
        written += packed.len() as u64;
    }
    for &label in container.labels() {
        w.write_all(&label.to_le_bytes())?;
    }
    written += n as u64 * 4;
    w.flush()?;
    Ok(written)
}

// ── Reading ─────────────────────────────────────────────────────────────────

/// Parsed header plus the offsets of the two payload sections.
#[derive(Debug, Clone)]
struct Layout {
    meta: DatasetMeta,
    num_examples: usize,
    width: usize,
    features_at: usize,
    labels_at: usize,
}

impl Layout {
    fn row_bytes(&self) -> usize {
        self.width / 8
    }
}

fn corrupt(msg: impl Into<String>) -> EncodeError {
    EncodeError::CorruptContainer(msg.into())
}

fn read_u32(buf: &[u8], at: usize) -> Result<u32> {
    let bytes = buf
        .get(at..at + 4)
        .ok_or_else(|| corrupt("container truncated in header"))?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(buf: &[u8], at: usize) -> Result<u64> {
    let bytes = buf
        .get(at..at + 8)
        .ok_or_else(|| corrupt("container truncated in header"))?;
    let mut le = [0u8; 8];
    le.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(le))
}

fn parse_layout(buf: &[u8]) -> Result<Layout> {
    if buf.get(0..4) != Some(MAGIC.as_slice()) {
        return Err(corrupt("bad magic"));
    }
    let version = read_u32(buf, 4)?;
    if version != VERSION {
        return Err(corrupt(format!("unsupported version {version}")));
    }
    let meta_len = read_u32(buf, 8)? as usize;
    let meta_bytes = buf
        .get(12..12 + meta_len)
        .ok_or_else(|| corrupt("container truncated in metadata"))?;
    let meta: DatasetMeta = serde_json::from_slice(meta_bytes)
        .map_err(|e| corrupt(format!("metadata: {e}")))?;
    let context = ContextSize::new(meta.context_size)
        .map_err(|e| corrupt(format!("metadata: {e}")))?;

    let at = 12 + meta_len;
    let num_examples = usize::try_from(read_u64(buf, at)?)
        .map_err(|_| corrupt("example count overflows usize"))?;
    let width = usize::try_from(read_u64(buf, at + 8)?)
        .map_err(|_| corrupt("feature width overflows usize"))?;
    if width != context.bits() {
        return Err(corrupt(format!(
            "feature width {width} inconsistent with context size {}",
            meta.context_size
        )));
    }

    let features_at = at + 16;
    let labels_at = num_examples
        .checked_mul(width / 8)
        .and_then(|f| f.checked_add(features_at))
        .ok_or_else(|| corrupt("feature section size overflows"))?;
    let expected = num_examples
        .checked_mul(4)
        .and_then(|l| l.checked_add(labels_at))
        .ok_or_else(|| corrupt("label section size overflows"))?;
    if buf.len() < expected {
        return Err(corrupt(format!(
            "container truncated: expected {expected} bytes, got {}",
            buf.len()
        )));
    }

    Ok(Layout {
        meta,
        num_examples,
        width,
        features_at,
        labels_at,
    })
}

fn label_at(buf: &[u8], layout: &Layout, index: usize) -> u32 {
    let i = layout.labels_at + index * 4;
    u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]])
}

/// Decode a container from an in-memory buffer.
pub fn decode(buf: &[u8]) -> Result<DatasetContainer> {
    let layout = parse_layout(buf)?;
    let n = layout.num_examples;
    let row_bytes = layout.row_bytes();

    let packed = &buf[layout.features_at..layout.labels_at];
    let mut bits = vec![0u8; n * layout.width];
    if row_bytes > 0 {
        for (row, src) in bits
            .chunks_exact_mut(layout.width)
            .zip(packed.chunks_exact(row_bytes))
        {
            expand_bits_into(src, row);
        }
    }
    let labels: Vec<u32> = (0..n).map(|i| label_at(buf, &layout, i)).collect();

    let features = Array2::from_shape_vec((n, layout.width), bits)
        .map_err(|e| corrupt(format!("feature shape: {e}")))?;
    DatasetContainer::from_parts(layout.meta, features, Array1::from(labels))
}

/// Load a container file fully into memory.
pub fn read_container(path: &Path) -> Result<DatasetContainer> {
    let buf = std::fs::read(path).map_err(|source| EncodeError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&buf)
}

// ── MmapDataset (zero-copy) ─────────────────────────────────────────────────

/// One example read from a memory-mapped container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample<'a> {
    pub index: usize,
    /// Packed window bytes (`W / 8`).
    pub packed: &'a [u8],
    pub label: u32,
}

impl Sample<'_> {
    /// Feature row as 0/1 values.
    pub fn bits(&self) -> Vec<u8> {
        expand_bits(self.packed)
    }
}

/// Zero-copy view over a container file.
///
/// The file is memory-mapped; only pages touched by [`get`](Self::get) are read.
pub struct MmapDataset {
    mmap: Mmap,
    layout: Layout,
    file_len: u64,
}

impl MmapDataset {
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |source| EncodeError::InputUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unavailable)?;
        let file_len = file.metadata().map_err(unavailable)?.len();
        // SAFETY: the map is read-only and the file is not modified while open.
        let mmap = unsafe { Mmap::map(&file).map_err(unavailable)? };
        let layout = parse_layout(&mmap)?;
        Ok(Self {
            mmap,
            layout,
            file_len,
        })
    }

    pub fn meta(&self) -> &DatasetMeta {
        &self.layout.meta
    }

    /// Number of examples `N`.
    pub fn len(&self) -> usize {
        self.layout.num_examples
    }

    pub fn is_empty(&self) -> bool {
        self.layout.num_examples == 0
    }

    /// Feature width `W` in bits.
    pub fn feature_width(&self) -> usize {
        self.layout.width
    }

    /// Size of the backing file in bytes.
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn get(&self, index: usize) -> Option<Sample<'_>> {
        if index >= self.layout.num_examples {
            return None;
        }
        let row_bytes = self.layout.row_bytes();
        let start = self.layout.features_at + index * row_bytes;
        Some(Sample {
            index,
            packed: &self.mmap[start..start + row_bytes],
            label: label_at(&self.mmap, &self.layout, index),
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Decode every sample into an owned container.
    pub fn to_container(&self) -> Result<DatasetContainer> {
        decode(&self.mmap)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bitwin_common::{EncoderConfig, Granularity};
    use bitwin_core::{Encoder, NoopObserver};

    use crate::assembler::assemble;

    fn container(bytes: &[u8], context: usize, g: Granularity) -> DatasetContainer {
        let encoded = Encoder::new(&EncoderConfig::new(context, g))
            .unwrap()
            .encode(bytes, &NoopObserver);
        assemble(&encoded).unwrap()
    }

    fn encode_to_vec(c: &DatasetContainer) -> Vec<u8> {
        let mut buf = Vec::new();
        let n = encode_into(&mut buf, c).unwrap();
        assert_eq!(n as usize, buf.len());
        buf
    }

    #[test]
    fn decode_reproduces_container() {
        let c = container(b"Hello, bit windows!", 3, Granularity::Trigram);
        let back = decode(&encode_to_vec(&c)).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn header_layout() {
        let c = container(b"AB", 1, Granularity::Unigram);
        let buf = encode_to_vec(&c);
        assert_eq!(&buf[0..4], MAGIC);
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), VERSION);
        // Two rows of one packed byte each, then two u32 labels at the end.
        let tail = &buf[buf.len() - 10..];
        assert_eq!(&tail[0..2], &[0x00u8, 0x41]);
        assert_eq!(u32::from_le_bytes(tail[2..6].try_into().unwrap()), 65);
        assert_eq!(u32::from_le_bytes(tail[6..10].try_into().unwrap()), 66);
    }

    #[test]
    fn rejects_bad_magic_and_truncation() {
        let c = container(b"ABCDEF", 2, Granularity::Bigram);
        let mut buf = encode_to_vec(&c);

        let truncated = &buf[..buf.len() - 1];
        assert!(matches!(decode(truncated), Err(EncodeError::CorruptContainer(_))));

        buf[0] = b'X';
        assert!(matches!(decode(&buf), Err(EncodeError::CorruptContainer(_))));
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let c = container(b"A", 1, Granularity::Unigram);
        let mut buf = encode_to_vec(&c);
        buf[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(decode(&buf), Err(EncodeError::CorruptContainer(_))));
    }

    fn raw_header(meta_json: &str, n: u64, w: u64) -> Vec<u8> {
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&(meta_json.len() as u32).to_le_bytes());
        buf.extend_from_slice(meta_json.as_bytes());
        buf.extend_from_slice(&n.to_le_bytes());
        buf.extend_from_slice(&w.to_le_bytes());
        buf
    }

    #[test]
    fn rejects_out_of_range_context_size() {
        for context in ["2305843009213693952", "18446744073709551615", "0", "1048577"] {
            let json = format!(r#"{{"context_size":{context},"granularity":"unigram"}}"#);
            let buf = raw_header(&json, 0, 0);
            assert!(
                matches!(decode(&buf), Err(EncodeError::CorruptContainer(_))),
                "context_size {context}"
            );
        }
    }

    #[test]
    fn rejects_width_mismatch() {
        let buf = raw_header(r#"{"context_size":2,"granularity":"bigram"}"#, 0, 8);
        assert!(matches!(decode(&buf), Err(EncodeError::CorruptContainer(_))));
        let buf = raw_header(r#"{"context_size":2,"granularity":"bigram"}"#, 0, 16);
        assert!(decode(&buf).unwrap().is_empty());
    }

    #[test]
    fn crafted_header_fails_mmap_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crafted.bwds");
        let json = r#"{"context_size":2305843009213693952,"granularity":"trigram"}"#;
        std::fs::write(&path, raw_header(json, 0, 0)).unwrap();
        assert!(matches!(
            MmapDataset::open(&path),
            Err(EncodeError::CorruptContainer(_))
        ));
    }

    #[test]
    fn write_then_read_and_mmap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.bwds");
        let c = container(b"ABC", 1, Granularity::Unigram);
        let bytes = write_container(&path, &c).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), bytes);

        assert_eq!(read_container(&path).unwrap(), c);

        let mm = MmapDataset::open(&path).unwrap();
        assert_eq!(mm.len(), 3);
        assert_eq!(mm.feature_width(), 8);
        assert_eq!(mm.file_len(), bytes);
        for (i, (row, label)) in c.iter().enumerate() {
            let s = mm.get(i).unwrap();
            assert_eq!(s.bits(), row.to_vec());
            assert_eq!(s.label, label);
        }
        assert!(mm.get(3).is_none());
        assert_eq!(mm.to_container().unwrap(), c);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bwds");
        std::fs::write(&path, b"stale").unwrap();
        let c = container(b"xyz", 2, Granularity::Unigram);
        write_container(&path, &c).unwrap();
        assert_eq!(read_container(&path).unwrap(), c);
    }

    #[test]
    fn unwritable_destination_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.bwds");
        let c = container(b"xyz", 2, Granularity::Unigram);
        let err = write_container(&path, &c).unwrap_err();
        assert!(matches!(err, EncodeError::OutputUnwritable { .. }));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_container_round_trips() {
        let c = container(&[], 4, Granularity::Trigram);
        let back = decode(&encode_to_vec(&c)).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.feature_width(), 32);
    }
}
