use bitweave_common::{Result, verify_arg};

use crate::format::DEFAULT;

/// Sizing of an appending buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendingConfig {
    /// Number of page slots reserved up front.
    pub initial_page_count: usize,

    /// Values per page; a power of two no larger than [`AppendingConfig::MAX_PAGE_SIZE`].
    pub page_size: usize,

    /// Extra bits per value, relative to the minimum width, a sealed page may spend to
    /// get a faster layout.
    pub acceptable_overhead_ratio: f32,
}

impl AppendingConfig {
    pub const MAX_PAGE_SIZE: usize = 1 << 20;

    pub fn with_initial_page_count(&self, count: usize) -> Self {
        let mut config = self.clone();
        config.initial_page_count = count;
        config
    }

    pub fn with_page_size(&self, page_size: usize) -> Self {
        let mut config = self.clone();
        config.page_size = page_size;
        config
    }

    pub fn with_acceptable_overhead_ratio(&self, ratio: f32) -> Self {
        let mut config = self.clone();
        config.acceptable_overhead_ratio = ratio;
        config
    }

    /// Checks the page size and returns its base-2 logarithm.
    pub fn validate(&self) -> Result<u32> {
        verify_arg!(page_size, self.page_size.is_power_of_two());
        verify_arg!(page_size, self.page_size <= Self::MAX_PAGE_SIZE);
        Ok(self.page_size.trailing_zeros())
    }
}

impl Default for AppendingConfig {
    fn default() -> Self {
        Self {
            initial_page_count: 16,
            page_size: 1024,
            acceptable_overhead_ratio: DEFAULT,
        }
    }
}
