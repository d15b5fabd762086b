use dex_intel_dex::{DexHeader, Inconsistency};
use serde::Serialize;

use crate::classifier::Classification;
use crate::hashes::Digests;

/// Header values worth showing in a report
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HeaderSummary {
    pub version: u32,
    pub checksum: String,
    pub signature: String,
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: String,
    pub string_ids_size: u32,
    pub type_ids_size: u32,
    pub proto_ids_size: u32,
    pub field_ids_size: u32,
    pub method_ids_size: u32,
    pub class_defs_size: u32,
    pub data_size: u32,
}

impl From<&DexHeader> for HeaderSummary {
    fn from(header: &DexHeader) -> Self {
        HeaderSummary {
            version: header.version.into(),
            checksum: format!("0x{:08x}", header.checksum),
            signature: const_hex::encode(header.signature),
            file_size: header.file_size,
            header_size: header.header_size,
            endian_tag: format!("0x{:08x}", header.endian_tag),
            string_ids_size: header.string_ids_size,
            type_ids_size: header.type_ids_size,
            proto_ids_size: header.proto_ids_size,
            field_ids_size: header.field_ids_size,
            method_ids_size: header.method_ids_size,
            class_defs_size: header.class_defs_size,
            data_size: header.data_size,
        }
    }
}

/// Everything extracted from one dex file
///
/// Built once by [crate::Dex] and never changed afterwards.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DexSnapshot {
    pub name: String,

    pub size: u64,

    #[serde(flatten)]
    pub digests: Digests,

    pub strings: Vec<String>,

    #[serde(flatten)]
    pub classification: Classification,

    pub header: HeaderSummary,

    pub inconsistencies: Vec<Inconsistency>,

    /// Count of string ids that couldn't be decoded
    pub omitted_strings: usize,
}
