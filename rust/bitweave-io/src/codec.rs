//! Versioned header identifying the codec that produced a stream.
//!
//! Layout: magic (int), codec name (vint length + ASCII bytes), version (int).

use bitweave_common::{Error, Result, verify_arg};

use crate::{DataInput, DataOutput};

pub const CODEC_MAGIC: i32 = 0x3fd7_6c17;

/// Writes the header for `codec` at `version`.
pub fn write_header<O>(out: &mut O, codec: &str, version: i32) -> Result<()>
where
    O: DataOutput + ?Sized,
{
    verify_arg!(codec, codec.is_ascii() && codec.len() < 128);
    out.write_int(CODEC_MAGIC)?;
    out.write_string(codec)?;
    out.write_int(version)
}

/// Length in bytes of the header written for `codec`.
pub fn header_length(codec: &str) -> usize {
    9 + codec.len()
}

/// Reads and validates a header, returning its version.
pub fn check_header<I>(input: &mut I, codec: &str, min_version: i32, max_version: i32) -> Result<i32>
where
    I: DataInput + ?Sized,
{
    let magic = input.read_int()?;
    if magic != CODEC_MAGIC {
        return Err(Error::invalid_format(
            "codec_magic",
            format!("expected {CODEC_MAGIC:#x}, found {magic:#x}"),
        ));
    }
    let actual = input.read_string()?;
    if actual != codec {
        return Err(Error::invalid_format(
            "codec_name",
            format!("expected '{codec}', found '{actual}'"),
        ));
    }
    let version = input.read_int()?;
    if version < min_version || version > max_version {
        return Err(Error::invalid_format(
            "codec_version",
            format!("{version} is outside [{min_version}, {max_version}]"),
        ));
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use bitweave_common::ErrorKind;

    use super::*;
    use crate::ByteSliceInput;

    #[test]
    fn test_header_round_trip() {
        let mut out: Vec<u8> = Vec::new();
        write_header(&mut out, "PackedInts", 2).unwrap();
        assert_eq!(out.len(), header_length("PackedInts"));

        let mut input = ByteSliceInput::new(&out);
        assert_eq!(check_header(&mut input, "PackedInts", 0, 2).unwrap(), 2);
    }

    #[test]
    fn test_header_mismatch() {
        let mut out: Vec<u8> = Vec::new();
        write_header(&mut out, "BlockPacked", 5).unwrap();

        let err = check_header(&mut ByteSliceInput::new(&out), "PackedInts", 0, 5).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { element, .. } if element == "codec_name"));

        let err = check_header(&mut ByteSliceInput::new(&out), "BlockPacked", 0, 4).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { element, .. } if element == "codec_version"));

        out[0] ^= 1;
        let err = check_header(&mut ByteSliceInput::new(&out), "BlockPacked", 0, 5).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { element, .. } if element == "codec_magic"));
    }
}
