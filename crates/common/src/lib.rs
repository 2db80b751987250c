//! # bitwin-common — Shared Primitives
//!
//! Types and utilities shared across every crate in the workspace:
//!
//! * **[`EncoderConfig`]** — encoder knobs (serialised as JSON).
//! * **[`Granularity`]** / **[`ContextSize`]** — validated configuration values.
//! * **[`EncodeError`]** — the error taxonomy every stage reports through.
//! * **[`read_byte_stream`]** — load the input once, as an immutable byte stream.

pub mod config;
pub mod data;
pub mod error;

pub use config::{ContextSize, EncoderConfig, Granularity, DEFAULT_CONTEXT_SIZE, MAX_CONTEXT_SIZE};
pub use data::{read_byte_stream, ByteStream};
pub use error::{EncodeError, Result};
