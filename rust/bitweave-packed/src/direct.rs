//! Arrays storing one value per native integer slot (8, 16, 32 or 64 bits).

use bitweave_common::{Result, verify_arg};
use bitweave_io::DataInput;

use crate::{
    MAX_VALUE_COUNT,
    reader::{Mutable, Reader},
};

macro_rules! direct_array {
    ($name:ident, $ty:ty, $bits:expr, $read:ident) => {
        #[doc = concat!("Stores each value in its own `", stringify!($ty), "`.")]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            values: Vec<$ty>,
        }

        impl $name {
            pub const BITS_PER_VALUE: u32 = $bits;

            pub fn new(value_count: usize) -> Result<$name> {
                verify_arg!(value_count, value_count <= MAX_VALUE_COUNT);
                Ok($name::alloc(value_count))
            }

            pub(crate) fn alloc(value_count: usize) -> $name {
                $name {
                    values: vec![0; value_count],
                }
            }

            /// Reads `value_count` big-endian values laid out by the `Packed` format.
            pub(crate) fn read_from<I: DataInput + ?Sized>(
                input: &mut I,
                value_count: usize,
            ) -> Result<$name> {
                let mut values = Vec::with_capacity(value_count);
                for _ in 0..value_count {
                    values.push(input.$read()? as $ty);
                }
                Ok($name { values })
            }

            pub fn values(&self) -> &[$ty] {
                &self.values
            }
        }

        impl Reader for $name {
            #[inline]
            fn get(&self, index: usize) -> i64 {
                self.values[index] as i64
            }

            fn get_bulk(&self, index: usize, buf: &mut [i64]) -> usize {
                debug_assert!(index < self.values.len());
                let count = buf.len().min(self.values.len() - index);
                for (slot, &value) in buf.iter_mut().zip(&self.values[index..index + count]) {
                    *slot = value as i64;
                }
                count
            }

            fn size(&self) -> usize {
                self.values.len()
            }

            fn ram_bytes_used(&self) -> usize {
                std::mem::size_of::<Self>() + std::mem::size_of_val(self.values.as_slice())
            }
        }

        impl Mutable for $name {
            fn bits_per_value(&self) -> u32 {
                $bits
            }

            #[inline]
            fn set(&mut self, index: usize, value: i64) {
                self.values[index] = value as $ty;
            }

            fn set_bulk(&mut self, index: usize, values: &[i64]) -> usize {
                debug_assert!(index < self.values.len());
                let count = values.len().min(self.values.len() - index);
                for (slot, &value) in self.values[index..index + count].iter_mut().zip(values) {
                    *slot = value as $ty;
                }
                count
            }

            fn fill(&mut self, from: usize, to: usize, value: i64) {
                debug_assert!(from <= to);
                self.values[from..to].fill(value as $ty);
            }
        }
    };
}

direct_array!(Direct8, u8, 8, read_byte);
direct_array!(Direct16, u16, 16, read_short);
direct_array!(Direct32, u32, 32, read_int);
direct_array!(Direct64, u64, 64, read_long);
