//! Synthesizes small dex images for tests and fuzz seeds
//!
//! Layout: header, `string_ids`, then every `string_data_item` back to back.
//! Checksum and signature are filled in, so the image parses without
//! inconsistencies unless asked otherwise.

use crate::header::{self, DexVersion, ENDIAN_CONSTANT, HEADER_SIZE, HEADER_SIZE_V41};
use crate::mutf8;

#[derive(Debug, Clone)]
enum StringEntry {
    Text(String),
    Raw { utf16_size: u32, bytes: Vec<u8> },
    RawItem(Vec<u8>),
    Offset(u32),
}

#[derive(Debug, Clone, Default)]
pub struct DexBuilder {
    version: DexVersion,
    entries: Vec<StringEntry>,
    file_size: Option<u32>,
    container: bool,
}

impl DexBuilder {
    pub fn new() -> DexBuilder {
        DexBuilder::default()
    }

    pub fn version(mut self, version: DexVersion) -> Self {
        self.version = version;
        self
    }

    /// Append a well-formed string
    pub fn string(mut self, s: impl Into<String>) -> Self {
        self.entries.push(StringEntry::Text(s.into()));
        self
    }

    pub fn strings<I, S>(self, strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        strings.into_iter().fold(self, |builder, s| builder.string(s))
    }

    /// Append a string with an arbitrary declared length and payload
    pub fn raw_string(mut self, utf16_size: u32, bytes: &[u8]) -> Self {
        self.entries.push(StringEntry::Raw {
            utf16_size,
            bytes: bytes.to_vec(),
        });
        self
    }

    /// Append a `string_data_item` given byte for byte, length field included
    pub fn raw_string_bytes(mut self, bytes: &[u8]) -> Self {
        self.entries.push(StringEntry::RawItem(bytes.to_vec()));
        self
    }

    /// Append a string id pointing at `offset`
    pub fn string_at(mut self, offset: u32) -> Self {
        self.entries.push(StringEntry::Offset(offset));
        self
    }

    /// Emit the `0x78` bytes header of [DexVersion::DEX41] with container fields
    pub fn container_header(mut self) -> Self {
        self.version = DexVersion::DEX41;
        self.container = true;
        self
    }

    /// Override `file_size` in the header
    pub fn declared_file_size(mut self, size: u32) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self.entries.len();
        let header_size = if self.container {
            HEADER_SIZE_V41
        } else {
            HEADER_SIZE
        };
        let data_off = header_size + 4 * count;

        let mut out = vec![0u8; data_off];
        let mut offsets = Vec::with_capacity(count);

        for entry in &self.entries {
            match entry {
                StringEntry::Text(s) => {
                    offsets.push(out.len() as u32);
                    push_uleb128(&mut out, mutf8::utf16_len(s) as u32);
                    out.extend_from_slice(&mutf8::encode(s));
                    out.push(0);
                }
                StringEntry::Raw { utf16_size, bytes } => {
                    offsets.push(out.len() as u32);
                    push_uleb128(&mut out, *utf16_size);
                    out.extend_from_slice(bytes);
                }
                StringEntry::RawItem(bytes) => {
                    offsets.push(out.len() as u32);
                    out.extend_from_slice(bytes);
                }
                StringEntry::Offset(offset) => offsets.push(*offset),
            }
        }

        while out.len() % 4 != 0 {
            out.push(0);
        }

        for (i, offset) in offsets.iter().enumerate() {
            put_u32(&mut out, header_size + 4 * i, *offset);
        }

        let version = u32::from(self.version);
        out[..8].copy_from_slice(format!("dex\n{version:03}\0").as_bytes());

        let file_size = self.file_size.unwrap_or(out.len() as u32);
        let data_size = (out.len() - data_off) as u32;
        let string_ids_off = if count == 0 { 0 } else { header_size as u32 };
        let data_off = if data_size == 0 { 0 } else { data_off as u32 };

        put_u32(&mut out, 32, file_size);
        put_u32(&mut out, 36, header_size as u32);
        put_u32(&mut out, 40, ENDIAN_CONSTANT);
        put_u32(&mut out, 56, count as u32);
        put_u32(&mut out, 60, string_ids_off);
        put_u32(&mut out, 104, data_size);
        put_u32(&mut out, 108, data_off);

        if self.container {
            let container_size = out.len() as u32;
            put_u32(&mut out, 112, container_size);
            put_u32(&mut out, 116, 0);
        }

        let signature = header::signature(&out);
        out[12..32].copy_from_slice(&signature);

        let checksum = header::checksum(&out);
        put_u32(&mut out, 8, checksum);

        out
    }
}

/// Overwrite a little-endian `u32` in place
pub fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn push_uleb128(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;

        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}
