//! Elias-Fano encoding of non-decreasing sequences of non-negative `i64` values.
//!
//! [`EliasFanoEncoder`] builds the encoding one value at a time. [`EliasFanoDecoder`]
//! is a cheap cursor over it that moves forward or backward by one value, jumps to an
//! index, or searches for the first value at or above (last value at or below) a
//! target, using the sparse index of the upper bit vector to skip ahead.

pub mod decoder;
pub mod encoder;

pub use decoder::{EliasFanoDecoder, NO_MORE_VALUES};
pub use encoder::{DEFAULT_INDEX_INTERVAL, EliasFanoEncoder};
