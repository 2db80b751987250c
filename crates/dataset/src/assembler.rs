//! Dataset assembly: labeled windows → numeric arrays.

use ndarray::{Array1, Array2};

use bitwin_common::{EncodeError, Result};
use bitwin_core::EncodedExamples;

use crate::container::{DatasetContainer, DatasetMeta};

/// Materialise every example as a 0/1 feature row and a label, in order.
pub fn assemble(encoded: &EncodedExamples) -> Result<DatasetContainer> {
    let n = encoded.len();
    let width = encoded.feature_width();

    let mut bits = vec![0u8; n * width];
    let mut labels = Vec::with_capacity(n);
    for (row, example) in bits.chunks_exact_mut(width).zip(encoded.iter()) {
        example.window.write_bits(row);
        labels.push(example.label);
    }

    let features = Array2::from_shape_vec((n, width), bits)
        .map_err(|e| EncodeError::CorruptContainer(format!("feature shape: {e}")))?;
    let meta = DatasetMeta::new(encoded.context().bytes(), encoded.granularity());
    DatasetContainer::from_parts(meta, features, Array1::from(labels))
}
