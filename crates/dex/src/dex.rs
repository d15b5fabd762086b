use log::{info, warn};

use crate::errors::DexError;
use crate::header::{DexHeader, Inconsistency};
use crate::reader::Reader;
use crate::strings::{DEFAULT_MAX_STRING_CODE_UNITS, StringPool};

/// Parsed dex file: validated header and decoded string pool
#[derive(Debug, Clone)]
pub struct DexFile {
    /// Information about dex header
    pub header: DexHeader,

    /// Header values that don't match the file
    pub inconsistencies: Vec<Inconsistency>,

    /// Dex strings
    pub strings: StringPool,
}

impl DexFile {
    /// Parse given dex file
    ///
    /// ```ignore
    /// let dex = DexFile::new(&data).expect("can't parse dex file");
    /// ```
    #[inline]
    pub fn new(data: &[u8]) -> Result<DexFile, DexError> {
        Self::with_limit(data, DEFAULT_MAX_STRING_CODE_UNITS)
    }

    /// Parse given dex file, dropping strings longer than `max_string_code_units`
    pub fn with_limit(data: &[u8], max_string_code_units: u32) -> Result<DexFile, DexError> {
        let header = DexHeader::parse(data)?;

        let inconsistencies = header.inconsistencies(data);
        for inconsistency in &inconsistencies {
            warn!("{inconsistency}");
        }

        let strings = StringPool::parse(&Reader::new(data), &header, max_string_code_units);

        info!(
            "parsed dex v{:03}: {} strings, {} omitted",
            u32::from(header.version),
            strings.len(),
            strings.omitted().len()
        );

        Ok(DexFile {
            header,
            inconsistencies,
            strings,
        })
    }

    /// Get decoded string by its position in the pool
    #[inline]
    pub fn get_string(&self, idx: usize) -> Option<&str> {
        self.strings.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DexBuilder;
    use crate::errors::ErrorKind;

    #[test]
    fn parse_valid_file() {
        let data = DexBuilder::new()
            .strings(["Landroid/os/Bundle;", "onBind"])
            .build();
        let dex = DexFile::new(&data).unwrap();

        assert_eq!(dex.header.string_ids_size, 2);
        assert_eq!(dex.strings.len(), 2);
        assert_eq!(dex.get_string(1), Some("onBind"));
        assert!(dex.inconsistencies.is_empty());
    }

    #[test]
    fn empty_string_pool() {
        let data = DexBuilder::new().build();
        let dex = DexFile::new(&data).unwrap();

        assert!(dex.strings.is_empty());
        assert!(dex.strings.omitted().is_empty());
    }

    #[test]
    fn garbage_input() {
        assert_eq!(DexFile::new(&[]).unwrap_err().kind(), ErrorKind::InvalidMagic);
        assert_eq!(
            DexFile::new(b"PK\x03\x04 not a dex file at all").unwrap_err().kind(),
            ErrorKind::InvalidMagic
        );
    }
}
