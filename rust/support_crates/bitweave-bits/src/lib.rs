//! Word-level bit manipulation primitives shared by the packed and Elias-Fano codecs.

pub mod word;
pub mod zigzag;
