//! In-memory dataset container: two parallel arrays plus shape metadata.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use bitwin_common::{EncodeError, Granularity, Result};

/// Metadata stored alongside the arrays (and as JSON in the file header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Context size `C` the features were built with.
    pub context_size: usize,
    pub granularity: Granularity,
    /// Crate version that produced the file.
    #[serde(default)]
    pub created_by: String,
}

impl DatasetMeta {
    pub fn new(context_size: usize, granularity: Granularity) -> Self {
        Self {
            context_size,
            granularity,
            created_by: concat!("bitwin ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Feature width in bits implied by the context size, `None` if it
    /// does not fit in `usize`.
    pub fn feature_width(&self) -> Option<usize> {
        self.context_size.checked_mul(8)
    }
}

/// The assembled dataset. `features` is `[N, W]` of 0/1, `labels` is `[N]`;
/// row `i` of `features` pairs with `labels[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetContainer {
    meta: DatasetMeta,
    features: Array2<u8>,
    labels: Array1<u32>,
}

impl DatasetContainer {
    /// Build from parts, checking the shape invariant.
    pub fn from_parts(meta: DatasetMeta, features: Array2<u8>, labels: Array1<u32>) -> Result<Self> {
        let container = Self {
            meta,
            features,
            labels,
        };
        container.check_shape()?;
        Ok(container)
    }

    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    pub fn granularity(&self) -> Granularity {
        self.meta.granularity
    }

    pub fn context_size(&self) -> usize {
        self.meta.context_size
    }

    /// Number of examples `N`.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature width `W` (row length).
    pub fn feature_width(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, u8> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, u32> {
        self.labels.view()
    }

    /// Feature row and label of example `index`.
    pub fn get(&self, index: usize) -> Option<(ArrayView1<'_, u8>, u32)> {
        let label = *self.labels.get(index)?;
        Some((self.features.row(index), label))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArrayView1<'_, u8>, u32)> + '_ {
        self.features.rows().into_iter().zip(self.labels.iter().copied())
    }

    fn check_shape(&self) -> Result<()> {
        if self.features.nrows() != self.labels.len() {
            return Err(EncodeError::CorruptContainer(format!(
                "{} feature rows but {} labels",
                self.features.nrows(),
                self.labels.len()
            )));
        }
        if Some(self.features.ncols()) != self.meta.feature_width() {
            return Err(EncodeError::CorruptContainer(format!(
                "feature width {} does not match context size {}",
                self.features.ncols(),
                self.meta.context_size
            )));
        }
        Ok(())
    }

    /// Full plausibility check: shape, 0/1 features, labels in range.
    pub fn validate(&self) -> Result<()> {
        self.check_shape()?;
        if let Some(v) = self.features.iter().find(|&&v| v > 1) {
            return Err(EncodeError::CorruptContainer(format!(
                "feature value {v} is not 0 or 1"
            )));
        }
        let max = self.meta.granularity.max_label();
        if let Some(l) = self.labels.iter().find(|&&l| l > max) {
            return Err(EncodeError::CorruptContainer(format!(
                "label {l} exceeds {} range (max {max})",
                self.meta.granularity
            )));
        }
        Ok(())
    }
}
