use bitweave_common::{Error, Result};

use crate::{DataInput, DataOutput, IndexInput};

/// Seekable `DataInput` over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteSliceInput<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteSliceInput<'a> {
    pub fn new(data: &'a [u8]) -> ByteSliceInput<'a> {
        ByteSliceInput { data, pos: 0 }
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos == self.data.len()
    }
}

impl DataInput for ByteSliceInput<'_> {
    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::end_of_stream(format!("read past {}", self.data.len())))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.pos + buf.len();
        if end > self.data.len() {
            return Err(Error::end_of_stream(format!(
                "read of {} bytes at {} exceeds {}",
                buf.len(),
                self.pos,
                self.data.len()
            )));
        }
        buf.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    fn skip_bytes(&mut self, count: u64) -> Result<()> {
        let target = (self.pos as u64).checked_add(count).ok_or_else(|| {
            Error::end_of_stream(format!("skip of {count} bytes at {} overflows", self.pos))
        })?;
        self.seek(target)
    }
}

impl IndexInput for ByteSliceInput<'_> {
    fn file_pointer(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(Error::end_of_stream(format!(
                "seek to {pos} beyond {}",
                self.data.len()
            )));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn length(&self) -> u64 {
        self.data.len() as u64
    }
}

impl DataOutput for Vec<u8> {
    #[inline]
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.push(b);
        Ok(())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}
