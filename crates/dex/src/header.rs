use std::fmt;

use log::debug;
use serde::Serialize;
use sha1::{Digest, Sha1};
use simd_adler32::Adler32;
use winnow::binary::{be_u16, be_u32, le_u32, u8};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::errors::DexError;

/// The constant is used to indicate the endiannes of the file in whic it is found.
///
/// This constant means - little-endian.
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#endian-constant>
pub const ENDIAN_CONSTANT: u32 = 0x12345678;

/// The constant is used to indicate the endiannes of the file in whic it is found.
///
/// This constant means - big-endian.
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#endian-constant>
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;

/// Size of `header_item` up to and including `data_off`
pub const HEADER_SIZE: usize = 0x70;

/// Size of `header_item` with the container fields of [DexVersion::DEX41]
pub const HEADER_SIZE_V41: usize = 0x78;

/// `dex\n`
const DEX_MAGIC: u32 = 0x6465780A;

/// Known dex versions
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#dex-file-magic>
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DexVersion {
    #[default]
    DEX35,
    DEX36,
    DEX37,
    DEX38,
    DEX39,
    DEX40,
    DEX41,
}

impl TryFrom<u16> for DexVersion {
    type Error = DexError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x3335 => Ok(DexVersion::DEX35),
            0x3336 => Ok(DexVersion::DEX36),
            0x3337 => Ok(DexVersion::DEX37),
            0x3338 => Ok(DexVersion::DEX38),
            0x3339 => Ok(DexVersion::DEX39),
            0x3430 => Ok(DexVersion::DEX40),
            0x3431 => Ok(DexVersion::DEX41),
            _ => Err(DexError::InvalidMagic(value.to_be_bytes().to_vec())),
        }
    }
}

impl From<DexVersion> for u32 {
    fn from(value: DexVersion) -> Self {
        match value {
            DexVersion::DEX35 => 35,
            DexVersion::DEX36 => 36,
            DexVersion::DEX37 => 37,
            DexVersion::DEX38 => 38,
            DexVersion::DEX39 => 39,
            DexVersion::DEX40 => 40,
            DexVersion::DEX41 => 41,
        }
    }
}

/// Abstraction over dex header
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#header-item>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DexHeader {
    /// Raw magic value, `dex\n` + version + `\0`
    pub magic: [u8; 8],

    /// Known dex version
    pub version: DexVersion,

    /// Adler32 checksum of the file
    ///
    /// Used to detect file corruption
    pub checksum: u32,

    /// SHA-1 signature of the file
    ///
    /// Used to uniquely identify files
    pub signature: [u8; 20],

    /// Size of the entire file (including the header) in bytes
    pub file_size: u32,

    /// Size of the header (this entire section) in bytes
    pub header_size: u32,

    /// Endiannes tag - [ENDIAN_CONSTANT] or [REVERSE_ENDIAN_CONSTANT]
    pub endian_tag: u32,

    /// Size of the link section
    ///
    /// 0 - if this file isn't statically linked
    pub link_size: u32,

    /// Offset from the start of the file to the link section
    ///
    /// 0 - if `link_size == 0`
    pub link_off: u32,

    /// Offset from the start of the file to the map item
    pub map_off: u32,

    /// Count of strings in the string identifiers list
    pub string_ids_size: u32,

    /// Offset from the start of the file to the string identifiers list
    ///
    /// 0 - if `string_ids_size == 0`
    pub string_ids_off: u32,

    /// Count of elements in the type identifiers list, at most 65535
    pub type_ids_size: u32,

    /// Offset from the start of the file to the type identifiers list
    pub type_ids_off: u32,

    /// Count of elements in the prototype identifiers list, at most 65535
    pub proto_ids_size: u32,

    /// Offset from the start of the file to the prototype identifiers list
    pub proto_ids_off: u32,

    /// Count of elements in the field identifiers list
    pub field_ids_size: u32,

    /// Offset from the start of the file to the field identifiers list
    pub field_ids_off: u32,

    /// Count of elements in the method identifiers list
    pub method_ids_size: u32,

    /// Offset from the start of the file to the method identifiers list
    pub method_ids_off: u32,

    /// Count of elements in the class definitions list
    pub class_defs_size: u32,

    /// Offset from the start of the file to the class definitions list
    pub class_defs_off: u32,

    /// Size of `data` section in bytes.
    ///
    /// Unused in [DexVersion::DEX41] or later
    pub data_size: u32,

    /// Offset from the start of the file to the start of the `data` section
    ///
    /// Unused in [DexVersion::DEX41] or later
    pub data_off: u32,

    /// Size of the entire file (including other dex headers and their data)
    ///
    /// Unused in [DexVersion::DEX40] or earlier
    pub container_size: u32,

    /// Offset from the start of the file to the start of this header
    ///
    /// Unused in [DexVersion::DEX40] or earlier
    pub header_offset: u32,
}

/// One of the index tables declared by the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub name: &'static str,
    pub count: u32,
    pub offset: u32,
    pub item_size: u32,
}

impl Section {
    /// Size of the whole table in bytes
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.count as u64 * self.item_size as u64
    }
}

/// Header values that disagree with the actual file, but don't prevent parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    FileSizeMismatch { declared: u32, actual: u64 },
    ChecksumMismatch { declared: u32, computed: u32 },
    SignatureMismatch,
    ReverseEndian,
    UnknownEndian { tag: u32 },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::FileSizeMismatch { declared, actual } => {
                write!(f, "declared file size {declared} but got {actual} bytes")
            }
            Inconsistency::ChecksumMismatch { declared, computed } => {
                write!(f, "adler32 checksum 0x{declared:08x} != computed 0x{computed:08x}")
            }
            Inconsistency::SignatureMismatch => write!(f, "sha1 signature doesn't match file"),
            Inconsistency::ReverseEndian => write!(f, "file declares big-endian byte order"),
            Inconsistency::UnknownEndian { tag } => write!(f, "unknown endian tag 0x{tag:08x}"),
        }
    }
}

impl DexHeader {
    /// Parse and validate header of the given dex file
    ///
    /// Every table declared by the header must fit into `data`.
    pub fn parse(data: &[u8]) -> Result<DexHeader, DexError> {
        let magic: [u8; 8] = data
            .get(..8)
            .and_then(|m| m.try_into().ok())
            .ok_or_else(|| DexError::InvalidMagic(data.to_vec()))?;

        let version = Self::parse_magic(&mut &magic[..])
            .map_err(|_| DexError::InvalidMagic(magic.to_vec()))?;

        if data.len() < HEADER_SIZE {
            return Err(DexError::HeaderTruncated {
                got: data.len() as u64,
                expected: HEADER_SIZE as u64,
            });
        }

        let input = &mut &data[8..];
        let mut header = Self::parse_fields(input).map_err(|_| DexError::HeaderTruncated {
            got: data.len() as u64,
            expected: HEADER_SIZE as u64,
        })?;
        header.magic = magic;
        header.version = version;

        if (header.header_size as usize) < HEADER_SIZE {
            return Err(DexError::HeaderTruncated {
                got: header.header_size as u64,
                expected: HEADER_SIZE as u64,
            });
        }

        if version >= DexVersion::DEX41
            && header.header_size as usize >= HEADER_SIZE_V41
            && data.len() >= HEADER_SIZE_V41
        {
            (header.container_size, header.header_offset) = (le_u32, le_u32)
                .parse_next(input)
                .map_err(|_: ErrMode<ContextError>| DexError::HeaderTruncated {
                    got: data.len() as u64,
                    expected: HEADER_SIZE_V41 as u64,
                })?;
        }

        header.validate_sections(data.len())?;

        Ok(header)
    }

    fn parse_magic(input: &mut &[u8]) -> ModalResult<DexVersion> {
        let (_, _, version, _) = (
            be_u32.verify(|magic| *magic == DEX_MAGIC),
            u8.verify(|v| *v == 0x30),
            be_u16.try_map(DexVersion::try_from),
            u8.verify(|v| *v == 0x00),
        )
            .parse_next(input)?;

        Ok(version)
    }

    fn parse_fields(input: &mut &[u8]) -> ModalResult<DexHeader> {
        let (checksum, signature, file_size, header_size, endian_tag, link_size, link_off, map_off) =
            (
                le_u32,
                take(20usize).map(|s: &[u8]| {
                    let mut signature = [0u8; 20];
                    signature.copy_from_slice(s);
                    signature
                }),
                le_u32,
                le_u32,
                le_u32,
                le_u32,
                le_u32,
                le_u32,
            )
                .parse_next(input)?;

        let (
            string_ids_size,
            string_ids_off,
            type_ids_size,
            type_ids_off,
            proto_ids_size,
            proto_ids_off,
            field_ids_size,
            field_ids_off,
            method_ids_size,
            method_ids_off,
            class_defs_size,
            class_defs_off,
            data_size,
            data_off,
        ) = (
            le_u32, le_u32, le_u32, le_u32, le_u32, le_u32, le_u32, le_u32, le_u32, le_u32,
            le_u32, le_u32, le_u32, le_u32,
        )
            .parse_next(input)?;

        Ok(DexHeader {
            magic: [0; 8],
            version: DexVersion::default(),
            checksum,
            signature,
            file_size,
            header_size,
            endian_tag,
            link_size,
            link_off,
            map_off,
            string_ids_size,
            string_ids_off,
            type_ids_size,
            type_ids_off,
            proto_ids_size,
            proto_ids_off,
            field_ids_size,
            field_ids_off,
            method_ids_size,
            method_ids_off,
            class_defs_size,
            class_defs_off,
            data_size,
            data_off,
            container_size: 0,
            header_offset: 0,
        })
    }

    /// All tables with a declared (count, offset) pair
    pub fn sections(&self) -> [Section; 7] {
        [
            Section {
                name: "string_ids",
                count: self.string_ids_size,
                offset: self.string_ids_off,
                item_size: 4,
            },
            Section {
                name: "type_ids",
                count: self.type_ids_size,
                offset: self.type_ids_off,
                item_size: 4,
            },
            Section {
                name: "proto_ids",
                count: self.proto_ids_size,
                offset: self.proto_ids_off,
                item_size: 12,
            },
            Section {
                name: "field_ids",
                count: self.field_ids_size,
                offset: self.field_ids_off,
                item_size: 8,
            },
            Section {
                name: "method_ids",
                count: self.method_ids_size,
                offset: self.method_ids_off,
                item_size: 8,
            },
            Section {
                name: "class_defs",
                count: self.class_defs_size,
                offset: self.class_defs_off,
                item_size: 32,
            },
            Section {
                name: "data",
                count: self.data_size,
                offset: self.data_off,
                item_size: 1,
            },
        ]
    }

    fn validate_sections(&self, len: usize) -> Result<(), DexError> {
        for section in self.sections() {
            if section.count == 0 {
                continue;
            }

            debug!(
                "{}: {} items at 0x{:x} ({} bytes)",
                section.name,
                section.count,
                section.offset,
                section.byte_len()
            );

            if section.offset as u64 + section.byte_len() > len as u64 {
                return Err(DexError::OffsetOutOfRange {
                    offset: section.offset as u64,
                    width: section.byte_len(),
                    len: len as u64,
                });
            }
        }

        Ok(())
    }

    /// Compare declared values with the actual file
    ///
    /// `data` must be the same buffer the header was parsed from.
    pub fn inconsistencies(&self, data: &[u8]) -> Vec<Inconsistency> {
        let mut found = Vec::new();

        if self.file_size as u64 != data.len() as u64 {
            found.push(Inconsistency::FileSizeMismatch {
                declared: self.file_size,
                actual: data.len() as u64,
            });
        }

        let computed = checksum(data);
        if computed != self.checksum {
            found.push(Inconsistency::ChecksumMismatch {
                declared: self.checksum,
                computed,
            });
        }

        if signature(data) != self.signature {
            found.push(Inconsistency::SignatureMismatch);
        }

        match self.endian_tag {
            ENDIAN_CONSTANT => {}
            REVERSE_ENDIAN_CONSTANT => found.push(Inconsistency::ReverseEndian),
            tag => found.push(Inconsistency::UnknownEndian { tag }),
        }

        found
    }
}

/// Adler32 of everything after the `checksum` field
pub fn checksum(data: &[u8]) -> u32 {
    let mut adler = Adler32::new();
    adler.write(data.get(12..).unwrap_or_default());
    adler.finish()
}

/// SHA-1 of everything after the `signature` field
pub fn signature(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Sha1::digest(data.get(32..).unwrap_or_default()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DexBuilder, put_u32};
    use crate::errors::ErrorKind;

    fn sample() -> Vec<u8> {
        DexBuilder::new()
            .strings(["Lcom/example/app/ExampleService;", "onCreate"])
            .build()
    }

    #[test]
    fn parse_fields() {
        let data = sample();
        let header = DexHeader::parse(&data).unwrap();

        assert_eq!(&header.magic, b"dex\n035\0");
        assert_eq!(header.version, DexVersion::DEX35);
        assert_eq!(header.file_size as usize, data.len());
        assert_eq!(header.header_size as usize, HEADER_SIZE);
        assert_eq!(header.endian_tag, ENDIAN_CONSTANT);
        assert_eq!(header.string_ids_size, 2);
        assert_eq!(header.string_ids_off as usize, HEADER_SIZE);
        assert_eq!(header.data_off as usize, HEADER_SIZE + 8);
        assert!(header.inconsistencies(&data).is_empty());
    }

    #[test]
    fn known_versions() {
        for version in [DexVersion::DEX35, DexVersion::DEX39, DexVersion::DEX41] {
            let data = DexBuilder::new().version(version).string("a").build();
            assert_eq!(DexHeader::parse(&data).unwrap().version, version);
        }
    }

    #[test]
    fn container_fields() {
        let data = DexBuilder::new().container_header().string("a").build();
        let header = DexHeader::parse(&data).unwrap();

        assert_eq!(header.version, DexVersion::DEX41);
        assert_eq!(header.header_size as usize, HEADER_SIZE_V41);
        assert_eq!(header.string_ids_off as usize, HEADER_SIZE_V41);
        assert_eq!(header.container_size as usize, data.len());
        assert_eq!(header.header_offset, 0);
        assert!(header.inconsistencies(&data).is_empty());

        // older versions never read past data_off
        let mut data = DexBuilder::new().version(DexVersion::DEX40).string("a").build();
        put_u32(&mut data, 36, HEADER_SIZE_V41 as u32);
        let header = DexHeader::parse(&data).unwrap();
        assert_eq!((header.container_size, header.header_offset), (0, 0));
    }

    #[test]
    fn invalid_magic() {
        let mut data = sample();
        data[0] = b'x';
        assert_eq!(DexHeader::parse(&data).unwrap_err().kind(), ErrorKind::InvalidMagic);

        let mut data = sample();
        data[4..7].copy_from_slice(b"099");
        assert_eq!(DexHeader::parse(&data).unwrap_err().kind(), ErrorKind::InvalidMagic);

        assert_eq!(
            DexHeader::parse(b"dex\n").unwrap_err().kind(),
            ErrorKind::InvalidMagic
        );
    }

    #[test]
    fn truncated_header() {
        let data = sample();
        assert_eq!(
            DexHeader::parse(&data[..0x40]).unwrap_err(),
            DexError::HeaderTruncated {
                got: 0x40,
                expected: 0x70
            }
        );

        let mut data = sample();
        put_u32(&mut data, 36, 0x60);
        assert_eq!(
            DexHeader::parse(&data).unwrap_err().kind(),
            ErrorKind::HeaderTruncated
        );
    }

    #[test]
    fn sections_out_of_range() {
        let mut data = sample();
        put_u32(&mut data, 56, u32::MAX);
        assert_eq!(
            DexHeader::parse(&data).unwrap_err().kind(),
            ErrorKind::OffsetOutOfRange
        );

        let mut data = sample();
        let len = data.len();
        put_u32(&mut data, 96, 1);
        put_u32(&mut data, 100, len as u32 - 16);
        assert_eq!(
            DexHeader::parse(&data).unwrap_err(),
            DexError::OffsetOutOfRange {
                offset: len as u64 - 16,
                width: 32,
                len: len as u64
            }
        );
    }

    #[test]
    fn inconsistencies_are_not_fatal() {
        let data = DexBuilder::new().string("a").declared_file_size(4096).build();
        let header = DexHeader::parse(&data).unwrap();
        assert_eq!(
            header.inconsistencies(&data),
            [Inconsistency::FileSizeMismatch {
                declared: 4096,
                actual: data.len() as u64
            }]
        );

        let mut data = sample();
        put_u32(&mut data, 40, REVERSE_ENDIAN_CONSTANT);
        let header = DexHeader::parse(&data).unwrap();
        let found = header.inconsistencies(&data);

        assert!(found.contains(&Inconsistency::ReverseEndian));
        assert!(found.contains(&Inconsistency::SignatureMismatch));
        assert!(matches!(found[0], Inconsistency::ChecksumMismatch { .. }));

        let mut data = sample();
        put_u32(&mut data, 40, 0xdeadbeef);
        let header = DexHeader::parse(&data).unwrap();

        assert!(
            header
                .inconsistencies(&data)
                .contains(&Inconsistency::UnknownEndian { tag: 0xdeadbeef })
        );
    }
}
