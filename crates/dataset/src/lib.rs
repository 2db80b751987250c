//! # bitwin-dataset — Assembly, Storage and Inspection
//!
//! * **[`assemble`]** — labeled windows → [`DatasetContainer`] (`[N, W]` features, `[N]` labels).
//! * **[`format`]** — the `.bwds` binary container: atomic [`write_container`],
//!   [`read_container`], and the zero-copy [`MmapDataset`].
//! * **[`convert`]** — the whole file-to-file pipeline, returning a [`ConversionReport`].
//! * **[`inspect`]** — summaries and text renderings for dataset viewers.

pub mod assembler;
pub mod container;
pub mod format;
pub mod inspect;
pub mod pipeline;

pub use assembler::assemble;
pub use container::{DatasetContainer, DatasetMeta};
pub use format::{read_container, write_container, MmapDataset, Sample};
pub use inspect::{auto_shape, control_name, describe_label, hex_dump, parse_shape, printable_text, render_grid, DatasetSummary};
pub use pipeline::{convert, convert_bytes, ConversionReport, ConversionStatus};
