use log::warn;

use crate::errors::DexError;
use crate::header::DexHeader;
use crate::mutf8;
use crate::reader::Reader;

/// Default upper bound for a declared `utf16_size`
pub const DEFAULT_MAX_STRING_CODE_UNITS: u32 = 1 << 20;

/// String id entry that couldn't be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmittedString {
    /// Index into the string identifiers list
    pub index: u32,

    /// Reason why the entry was dropped
    pub error: DexError,
}

/// Decoded `string_ids` table
///
/// Entries keep the string id order. Broken entries are skipped, so an index
/// into [StringPool::strings] equals the string id only when nothing was omitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StringPool {
    strings: Vec<String>,
    omitted: Vec<OmittedString>,
}

impl StringPool {
    /// Decode every string referenced by the header
    ///
    /// Header must be already validated against the same buffer.
    pub fn parse(reader: &Reader<'_>, header: &DexHeader, max_code_units: u32) -> StringPool {
        let count = header.string_ids_size;
        let mut strings = Vec::with_capacity(count as usize);
        let mut omitted = Vec::new();

        for index in 0..count {
            match Self::parse_string(reader, header, index, max_code_units) {
                Ok(s) => strings.push(s),
                Err(error) => {
                    warn!("skipped string #{index}: {error}");
                    omitted.push(OmittedString { index, error });
                }
            }
        }

        StringPool { strings, omitted }
    }

    fn parse_string(
        reader: &Reader<'_>,
        header: &DexHeader,
        index: u32,
        max_code_units: u32,
    ) -> Result<String, DexError> {
        let id_offset = header.string_ids_off as usize + 4 * index as usize;
        let data_offset = reader.u32_at(id_offset)? as usize;

        let (utf16_size, consumed) = reader.uleb128_at(data_offset)?;
        if utf16_size > max_code_units {
            return Err(DexError::StringTooLong {
                declared: utf16_size,
                limit: max_code_units,
            });
        }

        let start = data_offset + consumed;
        let bytes = reader.tail(start)?;

        // every code unit takes at least one byte
        if utf16_size as usize > bytes.len() {
            return Err(DexError::OffsetOutOfRange {
                offset: start as u64,
                width: utf16_size as u64,
                len: reader.len() as u64,
            });
        }

        mutf8::decode(bytes, utf16_size as usize)
    }

    /// Decoded strings in string id order
    #[inline]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Entries that were dropped while decoding
    #[inline]
    pub fn omitted(&self) -> &[OmittedString] {
        &self.omitted
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.strings.get(idx).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<OmittedString>) {
        (self.strings, self.omitted)
    }
}
