//! # Bitweave: packed integer codecs
//!
//! Bitweave stores sequences of bounded-range integers in close to the minimum number
//! of bits, while keeping them cheap to read back.
//!
//! ## Module Organization
//!
//! * [`packed`] - Fixed-width arrays, growable and paged arrays, appending buffers,
//!   block-packed streams and the self-describing packed stream format
//! * [`eliasfano`] - Elias-Fano encoding of non-decreasing sequences with a navigable
//!   decoder cursor
//! * [`io`] - Byte stream traits (`DataInput`, `DataOutput`, `IndexInput`) and adapters
//!   for byte slices, vectors and `std::io`
//! * [`common`] - Error type and result alias shared by all crates
//!
//! ### Support Modules
//!
//! * [`support::bits`] - Word-level bit manipulation and zigzag encoding
//!
//! ## Choosing a structure
//!
//! * Known size, random access: [`packed::get_mutable`], or
//!   [`packed::GrowableWriter`] when the value range is not known upfront
//! * More than `i32::MAX` values: [`packed::paged`]
//! * Unknown size, append then read: [`packed::appending`]
//! * Sequential streams written once: [`packed::block`]
//! * Sorted sets with skipping: [`eliasfano`]
//!
//! All binary formats are big-endian and bit-exact across platforms.

pub use bitweave_common as common;
pub use bitweave_eliasfano as eliasfano;
pub use bitweave_io as io;
pub use bitweave_packed as packed;

pub mod support {
    pub use bitweave_bits as bits;
}
