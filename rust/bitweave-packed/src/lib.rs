//! Packed integer arrays and streams.
//!
//! - [`bulk`]: encoders/decoders between value arrays and packed blocks for every width.
//! - [`Format`] and [`FormatAndBits`]: physical layouts and the layout selection heuristic.
//! - Fixed-width arrays behind the [`Reader`] / [`Mutable`] traits, plus [`GrowableWriter`].
//! - [`paged`]: arrays of up to 2^63 values split into independently packed pages.
//! - [`appending`]: append-only buffers with delta or monotonic compression.
//! - [`block`]: block-packed streams (delta and monotonic).
//! - [`serialize`]: self-describing stream header, writer, readers.

pub mod appending;
pub mod block;
pub mod bulk;
pub mod config;
pub mod direct;
pub mod factory;
pub mod format;
pub mod growable;
pub mod packed64;
pub mod paged;
pub mod reader;
pub mod serialize;
pub mod single_block;
pub mod three_blocks;
pub mod util;

pub use config::AppendingConfig;
pub use factory::{get_mutable, get_mutable_with_format};
pub use format::{COMPACT, DEFAULT, FAST, FASTEST, Format, FormatAndBits};
pub use growable::GrowableWriter;
pub use reader::{Mutable, NullReader, Reader, copy_values};

/// Default scratch memory, in bytes, for bulk copies and streaming encoders.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Largest number of values a single fixed-width array may hold.
pub const MAX_VALUE_COUNT: usize = i32::MAX as usize;
