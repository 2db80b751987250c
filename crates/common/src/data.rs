//! Input loading: the whole source is read once into an immutable byte stream.

use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::error::{EncodeError, Result};

/// Immutable ordered bytes read once from an input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteStream {
    source: Option<PathBuf>,
    bytes: Box<[u8]>,
}

impl ByteStream {
    /// Wrap in-memory bytes (no backing file).
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: None,
            bytes: bytes.into().into_boxed_slice(),
        }
    }

    /// Path the stream was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Deref for ByteStream {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for ByteStream {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Read the whole file at `path`. Missing, unreadable or non-file paths map to
/// [`EncodeError::InputUnavailable`].
pub fn read_byte_stream(path: &Path) -> Result<ByteStream> {
    let unavailable = |source| EncodeError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(unavailable)?;
    let meta = file.metadata().map_err(unavailable)?;
    if !meta.is_file() {
        return Err(unavailable(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    let mut bytes = Vec::with_capacity(meta.len() as usize);
    file.read_to_end(&mut bytes).map_err(unavailable)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read byte stream");
    Ok(ByteStream {
        source: Some(path.to_path_buf()),
        bytes: bytes.into_boxed_slice(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"ABC").unwrap();
        let stream = read_byte_stream(&path).unwrap();
        assert_eq!(stream.as_bytes(), b"ABC");
        assert_eq!(stream.source(), Some(path.as_path()));
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn missing_file_is_input_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_byte_stream(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, EncodeError::InputUnavailable { .. }));
    }

    #[test]
    fn directory_is_input_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_byte_stream(dir.path()).unwrap_err();
        assert!(matches!(err, EncodeError::InputUnavailable { .. }));
    }
}
