//! Stream abstractions consumed by the packed codecs:
//! - `DataOutput`: sequential writer of bytes, big-endian fixed-width integers and
//!   variable-length integers.
//! - `DataInput`: the mirrored sequential reader, with the ability to skip bytes.
//! - `IndexInput`: a `DataInput` that can seek to an absolute position.
//!
//! Provides a couple of simple implementations: memory-based (`ByteSliceInput`,
//! `Vec<u8>`) and `std::io`-based (`StreamInput`, `StreamOutput`).

use byteorder::{BigEndian, ByteOrder};

use bitweave_common::{Error, Result, verify_arg};

pub mod codec;
pub mod memory;
pub mod stream;

pub use memory::ByteSliceInput;
pub use stream::{StreamInput, StreamOutput};

/// Size of the scratch buffer used when skipping over non-seekable input.
pub const SKIP_BUFFER_SIZE: usize = 1024;

/// A sequential source of bytes.
///
/// Fixed-width integers are big-endian. Variable-length integers use 7 bits per byte
/// with the high bit as a continuation flag, least significant group first.
pub trait DataInput {
    /// Reads a single byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Fills `buf` completely, failing with an end-of-stream error on a short read.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    fn read_short(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_bytes(&mut buf)?;
        Ok(BigEndian::read_i16(&buf))
    }

    fn read_int(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(BigEndian::read_i32(&buf))
    }

    fn read_long(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(BigEndian::read_i64(&buf))
    }

    /// Reads a variable-length encoded `i32` (at most 5 bytes).
    fn read_vint(&mut self) -> Result<i32> {
        let mut b = self.read_byte()?;
        let mut value = (b & 0x7F) as u32;
        let mut shift = 7;
        while b & 0x80 != 0 {
            if shift > 28 {
                return Err(Error::invalid_format("vint", "more than 5 bytes"));
            }
            b = self.read_byte()?;
            value |= ((b & 0x7F) as u32) << shift;
            shift += 7;
        }
        Ok(value as i32)
    }

    /// Reads a variable-length encoded non-negative `i64` (at most 9 bytes).
    fn read_vlong(&mut self) -> Result<i64> {
        let mut b = self.read_byte()?;
        let mut value = (b & 0x7F) as u64;
        let mut shift = 7;
        while b & 0x80 != 0 {
            if shift > 56 {
                return Err(Error::invalid_format("vlong", "more than 9 bytes"));
            }
            b = self.read_byte()?;
            value |= ((b & 0x7F) as u64) << shift;
            shift += 7;
        }
        Ok(value as i64)
    }

    /// Reads a string written by [`DataOutput::write_string`].
    fn read_string(&mut self) -> Result<String> {
        let len = self.read_vint()?;
        if len < 0 {
            return Err(Error::invalid_format("string", format!("negative length {len}")));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_bytes(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::invalid_format("string", e.to_string()))
    }

    /// Skips over `count` bytes.
    ///
    /// The default implementation reads and discards; seekable inputs override it.
    fn skip_bytes(&mut self, count: u64) -> Result<()> {
        let mut scratch = [0u8; SKIP_BUFFER_SIZE];
        let mut remaining = count;
        while remaining > 0 {
            let step = remaining.min(SKIP_BUFFER_SIZE as u64) as usize;
            self.read_bytes(&mut scratch[..step])?;
            remaining -= step as u64;
        }
        Ok(())
    }
}

/// A `DataInput` positioned over a random-access source.
pub trait IndexInput: DataInput {
    /// Current absolute read position.
    fn file_pointer(&self) -> u64;

    /// Moves the read position. Seeking past the end fails with an end-of-stream error.
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Total length of the source in bytes.
    fn length(&self) -> u64;
}

/// A sequential sink of bytes, the counterpart of [`DataInput`].
pub trait DataOutput {
    fn write_byte(&mut self, b: u8) -> Result<()>;

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;

    fn write_short(&mut self, v: i16) -> Result<()> {
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, v);
        self.write_bytes(&buf)
    }

    fn write_int(&mut self, v: i32) -> Result<()> {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, v);
        self.write_bytes(&buf)
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        let mut buf = [0u8; 8];
        BigEndian::write_i64(&mut buf, v);
        self.write_bytes(&buf)
    }

    /// Writes `v` as a variable-length integer. Negative values take 5 bytes.
    fn write_vint(&mut self, v: i32) -> Result<()> {
        let mut v = v as u32;
        while v & !0x7F != 0 {
            self.write_byte(((v & 0x7F) | 0x80) as u8)?;
            v >>= 7;
        }
        self.write_byte(v as u8)
    }

    /// Writes a non-negative `v` as a variable-length integer.
    fn write_vlong(&mut self, v: i64) -> Result<()> {
        verify_arg!(v, v >= 0);
        let mut v = v as u64;
        while v & !0x7F != 0 {
            self.write_byte(((v & 0x7F) | 0x80) as u8)?;
            v >>= 7;
        }
        self.write_byte(v as u8)
    }

    /// Writes the UTF-8 bytes of `s` prefixed by their length as a vint.
    fn write_string(&mut self, s: &str) -> Result<()> {
        verify_arg!(s, s.len() <= i32::MAX as usize);
        self.write_vint(s.len() as i32)?;
        self.write_bytes(s.as_bytes())
    }
}

impl<T: DataInput + ?Sized> DataInput for &mut T {
    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_bytes(buf)
    }

    fn skip_bytes(&mut self, count: u64) -> Result<()> {
        (**self).skip_bytes(count)
    }
}

impl<T: IndexInput + ?Sized> IndexInput for &mut T {
    fn file_pointer(&self) -> u64 {
        (**self).file_pointer()
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        (**self).seek(pos)
    }

    fn length(&self) -> u64 {
        (**self).length()
    }
}

impl<T: DataOutput + ?Sized> DataOutput for &mut T {
    fn write_byte(&mut self, b: u8) -> Result<()> {
        (**self).write_byte(b)
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_bytes(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_round_trip() {
        let mut out: Vec<u8> = Vec::new();
        out.write_byte(0xAB).unwrap();
        out.write_short(-2).unwrap();
        out.write_int(0x0102_0304).unwrap();
        out.write_long(i64::MIN + 5).unwrap();
        assert_eq!(&out[3..7], &[1, 2, 3, 4]);

        let mut input = ByteSliceInput::new(&out);
        assert_eq!(input.read_byte().unwrap(), 0xAB);
        assert_eq!(input.read_short().unwrap(), -2);
        assert_eq!(input.read_int().unwrap(), 0x0102_0304);
        assert_eq!(input.read_long().unwrap(), i64::MIN + 5);
        assert!(input.read_byte().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_variable_length() {
        let mut out: Vec<u8> = Vec::new();
        out.write_vint(0).unwrap();
        out.write_vint(127).unwrap();
        out.write_vint(128).unwrap();
        out.write_vint(-1).unwrap();
        out.write_vlong(i64::MAX).unwrap();
        out.write_string("packed").unwrap();
        assert_eq!(&out[..4], &[0, 127, 0x80, 1]);

        let mut input = ByteSliceInput::new(&out);
        assert_eq!(input.read_vint().unwrap(), 0);
        assert_eq!(input.read_vint().unwrap(), 127);
        assert_eq!(input.read_vint().unwrap(), 128);
        assert_eq!(input.read_vint().unwrap(), -1);
        assert_eq!(input.read_vlong().unwrap(), i64::MAX);
        assert_eq!(input.read_string().unwrap(), "packed");

        assert!(Vec::<u8>::new().write_vlong(-1).is_err());
    }

    #[test]
    fn test_vint_too_long() {
        let data = [0xFFu8; 6];
        let mut input = ByteSliceInput::new(&data);
        assert!(input.read_vint().is_err());
    }
}
