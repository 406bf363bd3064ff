// TLS specific helpers for parsing binary packets.

use bytes::Bytes;

use crate::error::{Error, Result};

pub const U8_LIMIT: usize = u8::MAX as usize;
pub const U16_LIMIT: usize = u16::MAX as usize;
pub const U24_LIMIT: usize = 1 << 24;

pub fn exp2(v: usize) -> usize {
    1 << v
}

/// Parsers take their input by value and return the parsed value along with
/// all remaining unconsumed bytes.
pub type ParseResult<T> = Result<(T, Bytes)>;

pub fn be_u8(input: Bytes) -> ParseResult<u8> {
    if input.is_empty() {
        return Err(Error::Incomplete);
    }
    let v = input[0];
    Ok((v, input.slice(1..)))
}

pub fn be_u16(input: Bytes) -> ParseResult<u16> {
    if input.len() < 2 {
        return Err(Error::Incomplete);
    }
    let v = u16::from_be_bytes([input[0], input[1]]);
    Ok((v, input.slice(2..)))
}

pub fn be_u24(input: Bytes) -> ParseResult<u32> {
    if input.len() < 3 {
        return Err(Error::Incomplete);
    }
    let v = u32::from_be_bytes([0, input[0], input[1], input[2]]);
    Ok((v, input.slice(3..)))
}

pub fn be_u32(input: Bytes) -> ParseResult<u32> {
    if input.len() < 4 {
        return Err(Error::Incomplete);
    }
    let v = u32::from_be_bytes([input[0], input[1], input[2], input[3]]);
    Ok((v, input.slice(4..)))
}

pub fn be_u64(input: Bytes) -> ParseResult<u64> {
    if input.len() < 8 {
        return Err(Error::Incomplete);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&input[..8]);
    Ok((u64::from_be_bytes(buf), input.slice(8..)))
}

pub fn take_exact(n: usize, input: Bytes) -> ParseResult<Bytes> {
    if input.len() < n {
        return Err(Error::Incomplete);
    }
    Ok((input.slice(0..n), input.slice(n..)))
}

/// Parses a variable length vector of bytes.
///
/// The max_bytes is used to determine how large the length field is: TLS
/// always encodes the length in the minimum number of bytes able to store
/// max_bytes.
pub fn varlen_vector(min_bytes: usize, max_bytes: usize, input: Bytes) -> ParseResult<Bytes> {
    let (len, rest) = if max_bytes <= U8_LIMIT {
        let (v, rest) = be_u8(input)?;
        (v as usize, rest)
    } else if max_bytes <= U16_LIMIT {
        let (v, rest) = be_u16(input)?;
        (v as usize, rest)
    } else if max_bytes <= U24_LIMIT {
        let (v, rest) = be_u24(input)?;
        (v as usize, rest)
    } else {
        panic!("Maximum length not supported");
    };

    if len < min_bytes || len > max_bytes {
        return Err(Error::Decode("vector length out of allowed range"));
    }

    take_exact(len, rest)
}

/// Encodes a byte vector using the length prefixed wire format defined by TLS.
pub fn serialize_varlen_vector<F: FnMut(&mut Vec<u8>)>(
    min_bytes: usize,
    max_bytes: usize,
    out: &mut Vec<u8>,
    mut f: F,
) {
    let i = out.len();
    let n = if max_bytes <= U8_LIMIT {
        1
    } else if max_bytes <= U16_LIMIT {
        2
    } else if max_bytes <= U24_LIMIT {
        3
    } else {
        panic!("Maximum length not supported");
    };

    out.resize(i + n, 0);
    let ii = out.len();

    f(out);

    let size = out.len() - ii;
    assert!(size >= min_bytes && size <= max_bytes);

    match n {
        1 => {
            out[i] = size as u8;
        }
        2 => {
            out[i..i + 2].copy_from_slice(&(size as u16).to_be_bytes());
        }
        3 => {
            let b = (size as u32).to_be_bytes();
            out[i..i + 3].copy_from_slice(&b[1..4]);
        }
        _ => unreachable!(),
    };
}

/// Requires that a parser consumed its entire input.
///
/// Unconsumed trailing bytes inside a declared length field are a syntax
/// error, as is an inner value that claims to extend past the field.
pub fn complete<T>(res: ParseResult<T>) -> Result<T> {
    match res {
        Ok((v, rest)) => {
            if rest.is_empty() {
                Ok(v)
            } else {
                Err(Error::Decode("not all bytes decoded"))
            }
        }
        Err(e) if e.is_incomplete() => Err(Error::Decode("value truncated")),
        Err(e) => Err(e),
    }
}

/// Runs a parser repeatedly until the input is exhausted.
pub fn many<T, F>(mut f: F, mut input: Bytes) -> Result<Vec<T>>
where
    F: FnMut(Bytes) -> ParseResult<T>,
{
    let mut out = vec![];
    while !input.is_empty() {
        let (v, rest) = match f(input) {
            Ok(v) => v,
            Err(e) if e.is_incomplete() => return Err(Error::Decode("value truncated")),
            Err(e) => return Err(e),
        };
        out.push(v);
        input = rest;
    }
    Ok(out)
}

/// Like many() but the list must contain at least one element.
pub fn many1<T, F>(f: F, input: Bytes) -> Result<Vec<T>>
where
    F: FnMut(Bytes) -> ParseResult<T>,
{
    let out = many(f, input)?;
    if out.is_empty() {
        return Err(Error::Decode("expected at least one element"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varlen_vector_round_trip() {
        let mut out = vec![];
        serialize_varlen_vector(0, U16_LIMIT, &mut out, |out| {
            out.extend_from_slice(b"hello");
        });
        assert_eq!(&out, &[0, 5, b'h', b'e', b'l', b'l', b'o']);

        let (data, rest) = varlen_vector(0, U16_LIMIT, Bytes::from(out)).unwrap();
        assert_eq!(&data[..], b"hello");
        assert!(rest.is_empty());
    }

    #[test]
    fn varlen_vector_u24_length() {
        let mut out = vec![];
        serialize_varlen_vector(0, U24_LIMIT, &mut out, |out| {
            out.extend_from_slice(&[0xAB; 300]);
        });
        assert_eq!(&out[0..3], &[0, 1, 44]);
        let (data, _) = varlen_vector(0, U24_LIMIT, Bytes::from(out)).unwrap();
        assert_eq!(data.len(), 300);
    }

    #[test]
    fn rejects_out_of_range_length() {
        // Length 3 under a minimum of 4.
        let input = Bytes::from_static(&[3, 1, 2, 3]);
        assert!(varlen_vector(4, U8_LIMIT, input).is_err());
    }

    #[test]
    fn truncated_vector_is_incomplete() {
        let input = Bytes::from_static(&[0, 9, 1, 2]);
        assert!(matches!(
            varlen_vector(0, U16_LIMIT, input),
            Err(Error::Incomplete)
        ));
    }

    #[test]
    fn complete_rejects_trailing_bytes() {
        let input = Bytes::from_static(&[7, 0]);
        let res = complete(be_u8(input));
        assert!(matches!(res, Err(Error::Decode(_))));
    }
}
