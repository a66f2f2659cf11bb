//! 24-bit and 48-bit arrays stored as three bytes or three shorts per value.

use bitweave_common::{Result, verify_arg};
use bitweave_io::DataInput;

use crate::reader::{Mutable, Reader};

/// Stores each 24-bit value as three big-endian bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed8ThreeBlocks {
    blocks: Vec<u8>,
}

impl Packed8ThreeBlocks {
    pub const MAX_SIZE: usize = i32::MAX as usize / 3;

    pub fn new(value_count: usize) -> Result<Packed8ThreeBlocks> {
        verify_arg!(value_count, value_count <= Self::MAX_SIZE);
        Ok(Packed8ThreeBlocks::alloc(value_count))
    }

    pub(crate) fn alloc(value_count: usize) -> Packed8ThreeBlocks {
        Packed8ThreeBlocks {
            blocks: vec![0; 3 * value_count],
        }
    }

    pub(crate) fn read_from<I: DataInput + ?Sized>(
        input: &mut I,
        value_count: usize,
    ) -> Result<Packed8ThreeBlocks> {
        let mut array = Packed8ThreeBlocks::new(value_count)?;
        input.read_bytes(&mut array.blocks)?;
        Ok(array)
    }
}

impl Reader for Packed8ThreeBlocks {
    #[inline]
    fn get(&self, index: usize) -> i64 {
        let o = 3 * index;
        ((self.blocks[o] as i64) << 16)
            | ((self.blocks[o + 1] as i64) << 8)
            | self.blocks[o + 2] as i64
    }

    fn size(&self) -> usize {
        self.blocks.len() / 3
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + self.blocks.len()
    }
}

impl Mutable for Packed8ThreeBlocks {
    fn bits_per_value(&self) -> u32 {
        24
    }

    #[inline]
    fn set(&mut self, index: usize, value: i64) {
        debug_assert!((0..1 << 24).contains(&value));
        let o = 3 * index;
        self.blocks[o] = (value >> 16) as u8;
        self.blocks[o + 1] = (value >> 8) as u8;
        self.blocks[o + 2] = value as u8;
    }

    fn fill(&mut self, from: usize, to: usize, value: i64) {
        debug_assert!(from <= to && to <= self.size());
        let pattern = [(value >> 16) as u8, (value >> 8) as u8, value as u8];
        for chunk in self.blocks[3 * from..3 * to].chunks_exact_mut(3) {
            chunk.copy_from_slice(&pattern);
        }
    }
}

/// Stores each 48-bit value as three 16-bit words, most significant first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed16ThreeBlocks {
    blocks: Vec<u16>,
}

impl Packed16ThreeBlocks {
    pub const MAX_SIZE: usize = i32::MAX as usize / 3;

    pub fn new(value_count: usize) -> Result<Packed16ThreeBlocks> {
        verify_arg!(value_count, value_count <= Self::MAX_SIZE);
        Ok(Packed16ThreeBlocks::alloc(value_count))
    }

    pub(crate) fn alloc(value_count: usize) -> Packed16ThreeBlocks {
        Packed16ThreeBlocks {
            blocks: vec![0; 3 * value_count],
        }
    }

    pub(crate) fn read_from<I: DataInput + ?Sized>(
        input: &mut I,
        value_count: usize,
    ) -> Result<Packed16ThreeBlocks> {
        let mut array = Packed16ThreeBlocks::new(value_count)?;
        for block in array.blocks.iter_mut() {
            *block = input.read_short()? as u16;
        }
        Ok(array)
    }
}

impl Reader for Packed16ThreeBlocks {
    #[inline]
    fn get(&self, index: usize) -> i64 {
        let o = 3 * index;
        ((self.blocks[o] as i64) << 32)
            | ((self.blocks[o + 1] as i64) << 16)
            | self.blocks[o + 2] as i64
    }

    fn size(&self) -> usize {
        self.blocks.len() / 3
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + 2 * self.blocks.len()
    }
}

impl Mutable for Packed16ThreeBlocks {
    fn bits_per_value(&self) -> u32 {
        48
    }

    #[inline]
    fn set(&mut self, index: usize, value: i64) {
        debug_assert!((0..1 << 48).contains(&value));
        let o = 3 * index;
        self.blocks[o] = (value >> 32) as u16;
        self.blocks[o + 1] = (value >> 16) as u16;
        self.blocks[o + 2] = value as u16;
    }

    fn fill(&mut self, from: usize, to: usize, value: i64) {
        debug_assert!(from <= to && to <= self.size());
        let pattern = [(value >> 32) as u16, (value >> 16) as u16, value as u16];
        for chunk in self.blocks[3 * from..3 * to].chunks_exact_mut(3) {
            chunk.copy_from_slice(&pattern);
        }
    }
}
