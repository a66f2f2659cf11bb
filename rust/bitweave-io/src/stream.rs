use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use bitweave_common::Result;

use crate::{DataInput, DataOutput};

/// `DataInput` over any `std::io::Read`.
///
/// Skipping reads and discards, since the source cannot seek.
pub struct StreamInput<R> {
    inner: R,
}

impl<R: Read> StreamInput<R> {
    pub fn new(inner: R) -> StreamInput<R> {
        StreamInput { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> DataInput for StreamInput<R> {
    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8()?)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        Ok(self.inner.read_exact(buf)?)
    }

    fn read_short(&mut self) -> Result<i16> {
        Ok(self.inner.read_i16::<BigEndian>()?)
    }

    fn read_int(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32::<BigEndian>()?)
    }

    fn read_long(&mut self) -> Result<i64> {
        Ok(self.inner.read_i64::<BigEndian>()?)
    }
}

/// `DataOutput` over any `std::io::Write`, counting the bytes written.
pub struct StreamOutput<W> {
    inner: W,
    written: u64,
}

impl<W: Write> StreamOutput<W> {
    pub fn new(inner: W) -> StreamOutput<W> {
        StreamOutput { inner, written: 0 }
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> DataOutput for StreamOutput<W> {
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.inner.write_u8(b)?;
        self.written += 1;
        Ok(())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        self.inner.write_i64::<BigEndian>(v)?;
        self.written += 8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, BufWriter, Seek, SeekFrom};

    use super::*;

    #[test]
    fn test_file_round_trip() {
        let mut file = tempfile::tempfile().unwrap();
        let mut out = StreamOutput::new(BufWriter::new(&mut file));
        for i in 0..1000i64 {
            out.write_vlong(i * 1013).unwrap();
            out.write_long(-i).unwrap();
        }
        out.write_int(7).unwrap();
        let written = out.bytes_written();
        out.flush().unwrap();
        drop(out);

        assert_eq!(file.seek(SeekFrom::End(0)).unwrap(), written);
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut input = StreamInput::new(BufReader::new(&mut file));
        for i in 0..1000i64 {
            assert_eq!(input.read_vlong().unwrap(), i * 1013);
            assert_eq!(input.read_long().unwrap(), -i);
        }
        assert_eq!(input.read_int().unwrap(), 7);
        assert!(input.read_byte().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_skip_by_reading() {
        let data: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let mut input = StreamInput::new(&data[..]);
        input.skip_bytes(4097).unwrap();
        assert_eq!(input.read_byte().unwrap(), (4097 % 256) as u8);
        assert!(input.skip_bytes(1000).unwrap_err().is_end_of_stream());
    }
}
