//! Enron register-range configuration: the vendor extension that widens
//! certain holding/input register ranges from 16 to 32 bits.

use serde::{Deserialize, Serialize};

/// A two-element, strictly increasing `[start, end]` address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRange {
    start: u16,
    end: u16,
}

impl RegisterRange {
    /// Builds a range, rejecting anything that isn't strictly increasing.
    pub fn new(start: u16, end: u16) -> Result<Self, EnronConfigError> {
        if start >= end {
            return Err(EnronConfigError::NotIncreasing { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, addr: u16) -> bool {
        (self.start..=self.end).contains(&addr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnronConfigError {
    #[error("register range [{start}, {end}] is not strictly increasing")]
    NotIncreasing { start: u16, end: u16 },
}

/// Per-engine Enron configuration. Addresses inside `short_range` use the
/// standard 16-bit register width; every other address covered by one of
/// the four ranges uses 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnronConfig {
    pub boolean_range: RegisterRange,
    pub short_range: RegisterRange,
    pub long_range: RegisterRange,
    pub float_range: RegisterRange,
}

impl EnronConfig {
    pub fn new(
        boolean_range: RegisterRange,
        short_range: RegisterRange,
        long_range: RegisterRange,
        float_range: RegisterRange,
    ) -> Self {
        Self {
            boolean_range,
            short_range,
            long_range,
            float_range,
        }
    }

    /// The register width, in bytes, to use for `addr`: 2 inside
    /// `short_range`, 4 everywhere else Enron applies.
    pub fn register_width(&self, addr: u16) -> u8 {
        if self.short_range.contains(addr) {
            2
        } else {
            4
        }
    }
}

impl Default for EnronConfig {
    /// The vendor's documented default ranges: boolean [1001,1999],
    /// short [3001,3999], long [5001,5999], float [7001,7999].
    fn default() -> Self {
        Self {
            boolean_range: RegisterRange::new(1001, 1999).expect("default range is valid"),
            short_range: RegisterRange::new(3001, 3999).expect("default range is valid"),
            long_range: RegisterRange::new(5001, 5999).expect("default range is valid"),
            float_range: RegisterRange::new(7001, 7999).expect("default range is valid"),
        }
    }
}
