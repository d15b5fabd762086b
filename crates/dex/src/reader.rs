use winnow::binary::{le_u16, le_u32, u8};
use winnow::error::ContextError;
use winnow::prelude::*;

use crate::errors::DexError;

/// Longest `uleb128` encoding of a 32-bit value
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#leb128>
pub const MAX_ULEB128_LEN: usize = 5;

/// Little-endian reads at explicit offsets, every one of them bounds-checked
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Reader<'a> {
        Reader { data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get everything from `offset` up to the end of the buffer
    #[inline]
    pub fn tail(&self, offset: usize) -> Result<&'a [u8], DexError> {
        self.data
            .get(offset..)
            .ok_or_else(|| self.out_of_range(offset, 0))
    }

    /// Run `parser` over the bytes starting at `offset`
    ///
    /// Any failure means the `width` bytes the parser needs are not there.
    #[inline]
    fn parse_at<O>(
        &self,
        offset: usize,
        width: usize,
        mut parser: impl Parser<&'a [u8], O, ContextError>,
    ) -> Result<O, DexError> {
        let mut input = self
            .data
            .get(offset..)
            .ok_or_else(|| self.out_of_range(offset, width))?;

        parser
            .parse_next(&mut input)
            .map_err(|_| self.out_of_range(offset, width))
    }

    #[inline]
    pub fn u8_at(&self, offset: usize) -> Result<u8, DexError> {
        self.parse_at(offset, 1, u8)
    }

    #[inline]
    pub fn u16_at(&self, offset: usize) -> Result<u16, DexError> {
        self.parse_at(offset, 2, le_u16)
    }

    #[inline]
    pub fn u32_at(&self, offset: usize) -> Result<u32, DexError> {
        self.parse_at(offset, 4, le_u32)
    }

    /// Decode an unsigned LEB128 value at `offset`
    ///
    /// Returns the value and the count of consumed bytes. Bits of the fifth byte
    /// that don't fit into 32 bits are dropped, same as ART does.
    pub fn uleb128_at(&self, offset: usize) -> Result<(u32, usize), DexError> {
        let mut value = 0u32;

        for i in 0..MAX_ULEB128_LEN {
            let byte = self.u8_at(offset.saturating_add(i))?;
            value |= ((byte & 0x7f) as u32) << (7 * i);

            if byte & 0x80 == 0 {
                return Ok((value, i + 1));
            }
        }

        Err(DexError::MalformedVarint {
            offset: offset as u64,
        })
    }

    #[inline]
    fn out_of_range(&self, offset: usize, width: usize) -> DexError {
        DexError::OffsetOutOfRange {
            offset: offset as u64,
            width: width as u64,
            len: self.data.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn little_endian_reads() {
        let data = [0x78, 0x56, 0x34, 0x12, 0xff];
        let reader = Reader::new(&data);

        assert_eq!(reader.u8_at(4), Ok(0xff));
        assert_eq!(reader.u16_at(0), Ok(0x5678));
        assert_eq!(reader.u32_at(0), Ok(0x12345678));
        assert_eq!(reader.u32_at(1), Ok(0xff123456));
    }

    #[test]
    fn reads_past_the_end_are_rejected() {
        let data = [0u8; 6];
        let reader = Reader::new(&data);

        assert_eq!(
            reader.u32_at(3),
            Err(DexError::OffsetOutOfRange {
                offset: 3,
                width: 4,
                len: 6
            })
        );
        assert_eq!(reader.u8_at(6).unwrap_err().kind(), ErrorKind::OffsetOutOfRange);
        assert!(reader.u16_at(usize::MAX).is_err());
        assert_eq!(
            reader.u32_at(usize::MAX).unwrap_err(),
            DexError::OffsetOutOfRange {
                offset: usize::MAX as u64,
                width: 4,
                len: 6
            }
        );
        assert_eq!(reader.tail(6), Ok(&[][..]));
        assert!(reader.tail(7).is_err());
    }

    #[test]
    fn uleb128_values() {
        let cases: &[(&[u8], u32, usize)] = &[
            (&[0x00], 0, 1),
            (&[0x01], 1, 1),
            (&[0x7f], 127, 1),
            (&[0x80, 0x7f], 16256, 2),
            (&[0xb4, 0x07], 0x3b4, 2),
            (&[0x8c, 0x08], 0x40c, 2),
            (&[0xff, 0xff, 0xff, 0xff, 0x0f], u32::MAX, 5),
        ];

        for &(bytes, value, len) in cases {
            assert_eq!(Reader::new(bytes).uleb128_at(0), Ok((value, len)), "{bytes:02x?}");
        }
    }

    #[test]
    fn uleb128_without_terminator() {
        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(
            Reader::new(&data).uleb128_at(0),
            Err(DexError::MalformedVarint { offset: 0 })
        );

        let truncated = [0x01, 0x80, 0x80];
        assert_eq!(
            Reader::new(&truncated).uleb128_at(1).unwrap_err().kind(),
            ErrorKind::OffsetOutOfRange
        );
    }
}
