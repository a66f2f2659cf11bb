//! Test utilities shared by the bitweave crates.
//!
//! - Seeded generators for the value distributions the codecs care about
//! - Scratch files for exercising the stream-backed inputs and outputs
//!
//! This crate is intended for use in tests only.

pub mod data_gen;
pub mod files;
