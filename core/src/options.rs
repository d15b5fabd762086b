use dex_intel_dex::DEFAULT_MAX_STRING_CODE_UNITS;
use serde::{Deserialize, Serialize};

/// Default cap for the size of an input file, 128 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 128 * 1024 * 1024;

/// Resource limits applied while loading and parsing a dex file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DexOptions {
    /// Files bigger than this are rejected before being read
    pub max_file_size: u64,

    /// Strings declaring more UTF-16 code units are omitted from the pool
    pub max_string_code_units: u32,
}

impl Default for DexOptions {
    fn default() -> Self {
        DexOptions {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_string_code_units: DEFAULT_MAX_STRING_CODE_UNITS,
        }
    }
}

impl DexOptions {
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_max_string_code_units(mut self, max_string_code_units: u32) -> Self {
        self.max_string_code_units = max_string_code_units;
        self
    }
}
