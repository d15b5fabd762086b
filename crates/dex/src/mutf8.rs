//! Modified UTF-8, the encoding of `string_data_item`
//!
//! Differs from standard UTF-8 in two ways: U+0000 is written as `C0 80`, and
//! characters outside the basic multilingual plane are written as a surrogate
//! pair, each half as its own 3-byte sequence.
//!
//! See: <https://source.android.com/docs/core/runtime/dex-format#mutf-8>

use crate::errors::DexError;

/// Decode exactly `utf16_len` UTF-16 code units from `bytes`
///
/// Bytes after the last code unit are not inspected.
pub fn decode(bytes: &[u8], utf16_len: usize) -> Result<String, DexError> {
    let mut out = String::with_capacity(utf16_len);
    let mut produced = 0usize;
    let mut pos = 0usize;

    while produced < utf16_len {
        let start = pos;
        let unit = next_unit(bytes, &mut pos)?;
        produced += 1;

        match unit {
            0xd800..=0xdbff => {
                if produced == utf16_len {
                    return Err(invalid(start, "unpaired high surrogate"));
                }

                let low_start = pos;
                let low = next_unit(bytes, &mut pos)?;
                if !(0xdc00..=0xdfff).contains(&low) {
                    return Err(invalid(low_start, "unpaired high surrogate"));
                }
                produced += 1;

                let code_point =
                    0x10000 + (((unit - 0xd800) as u32) << 10) + (low - 0xdc00) as u32;
                out.push(char::from_u32(code_point).ok_or(invalid(start, "bad code point"))?);
            }
            0xdc00..=0xdfff => return Err(invalid(start, "unpaired low surrogate")),
            _ => out.push(char::from_u32(unit as u32).ok_or(invalid(start, "bad code point"))?),
        }
    }

    Ok(out)
}

/// Encode `s` as modified UTF-8, without the trailing NUL
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());

    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }

    out
}

/// Count of UTF-16 code units, the value stored in `utf16_size`
#[inline]
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Read one code unit (1, 2 or 3 bytes) and advance `pos`
#[inline]
fn next_unit(bytes: &[u8], pos: &mut usize) -> Result<u16, DexError> {
    let start = *pos;
    let lead = *bytes
        .get(start)
        .ok_or(invalid(start, "string data truncated"))?;

    let unit = match lead {
        0x00 => return Err(invalid(start, "unexpected NUL byte")),
        0x01..=0x7f => {
            *pos += 1;
            lead as u16
        }
        0xc0..=0xdf => {
            let b1 = continuation(bytes, start + 1)?;
            *pos += 2;
            ((lead as u16 & 0x1f) << 6) | b1
        }
        0xe0..=0xef => {
            let b1 = continuation(bytes, start + 1)?;
            let b2 = continuation(bytes, start + 2)?;
            *pos += 3;
            ((lead as u16 & 0x0f) << 12) | (b1 << 6) | b2
        }
        _ => return Err(invalid(start, "invalid lead byte")),
    };

    Ok(unit)
}

#[inline]
fn continuation(bytes: &[u8], pos: usize) -> Result<u16, DexError> {
    match bytes.get(pos) {
        Some(&b) if b & 0xc0 == 0x80 => Ok((b & 0x3f) as u16),
        Some(_) => Err(invalid(pos, "invalid continuation byte")),
        None => Err(invalid(pos, "string data truncated")),
    }
}

#[inline(always)]
fn invalid(position: usize, reason: &'static str) -> DexError {
    DexError::InvalidEncoding { position, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn decode_ascii_stops_at_declared_length() {
        assert_eq!(decode(b"onCreate\0", 8).unwrap(), "onCreate");
        assert_eq!(decode(b"abcdef", 3).unwrap(), "abc");
        assert_eq!(decode(b"", 0).unwrap(), "");
    }

    #[test]
    fn decode_multibyte() {
        assert_eq!(decode(&[0xc0, 0x80], 1).unwrap(), "\0");
        assert_eq!(decode(&[0xc3, 0xa9], 1).unwrap(), "é");
        assert_eq!(decode(&[0xe2, 0x82, 0xac], 1).unwrap(), "€");
    }

    #[test]
    fn decode_surrogate_pair() {
        let bytes = [0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80];
        assert_eq!(decode(&bytes, 2).unwrap(), "\u{1f600}");
    }

    #[test]
    fn decode_rejects_invalid_sequences() {
        let cases: &[(&[u8], usize)] = &[
            (b"a\0b", 3),
            (&[0xc3, 0x41], 1),
            (&[0x80], 1),
            (&[0xf0, 0x9f, 0x98, 0x80], 2),
            (&[0xed, 0xa0, 0xbd], 1),
            (&[0xed, 0xa0, 0xbd, 0x41], 2),
            (&[0xed, 0xb8, 0x80], 1),
            (&[0xe2, 0x82], 1),
            (b"ab", 3),
        ];

        for &(bytes, len) in cases {
            let err = decode(bytes, len).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidEncoding, "{bytes:02x?}");
        }
    }

    #[test]
    fn encode_matches_dalvik_layout() {
        assert_eq!(encode("set"), b"set");
        assert_eq!(encode("a\0"), [0x61, 0xc0, 0x80]);
        assert_eq!(
            encode("\u{1f600}"),
            [0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80]
        );

        let mixed = "Lcom/пример/€\u{1f600};";
        assert_eq!(decode(&encode(mixed), utf16_len(mixed)).unwrap(), mixed);
    }
}
