use bytes::Bytes;

use crate::error::{Error, Result};
use crate::parsing::exp2;
use crate::transport::Transport;

pub const TLS_1_0_VERSION: u16 = 0x0301;
pub const TLS_1_2_VERSION: u16 = 0x0303;
pub const TLS_1_3_VERSION: u16 = 0x0304;

pub type ProtocolVersion = u16;

/// Largest plaintext fragment we will put in a single record.
pub const MAX_PLAINTEXT_SIZE: usize = 1 << 14;

/// Largest encrypted_record length the peer may send (2^14 + 256).
pub const MAX_CIPHERTEXT_SIZE: usize = (1 << 14) + 256;

/*
struct {
    ContentType type;
    ProtocolVersion legacy_record_version;
    uint16 length;
    opaque fragment[TLSPlaintext.length];
} TLSPlaintext;

struct {
    opaque content[TLSPlaintext.length];
    ContentType type;
    uint8 zeros[length_of_padding];
} TLSInnerPlaintext;

struct {
    ContentType opaque_type = application_data; /* 23 */
    ProtocolVersion legacy_record_version = 0x0303; /* TLS v1.2 */
    uint16 length;
    opaque encrypted_record[TLSCiphertext.length];
} TLSCiphertext;
*/

/// Outer most data type transmitted on the wire.
#[derive(Debug)]
pub struct Record {
    pub typ: ContentType,
    pub legacy_record_version: ProtocolVersion,
    /// If typ == ApplicationData, then this is encrypted data.
    pub data: Bytes,
}

impl Record {
    pub fn read(transport: &mut dyn Transport) -> Result<Record> {
        let mut header = [0u8; 5];
        transport.read_exact(&mut header)?;

        let typ = ContentType::from_u8(header[0]);
        let legacy_record_version = u16::from_be_bytes([header[1], header[2]]);
        let length = u16::from_be_bytes([header[3], header[4]]) as usize;

        if length > MAX_CIPHERTEXT_SIZE {
            return Err(Error::RecordOverflow);
        }

        let mut data = vec![0u8; length];
        transport.read_exact(&mut data)?;
        Ok(Record {
            typ,
            legacy_record_version,
            data: Bytes::from(data),
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        assert!(self.data.len() <= MAX_CIPHERTEXT_SIZE);
        out.push(self.typ.to_u8());
        out.extend_from_slice(&self.legacy_record_version.to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.data);
    }
}

tls_enum_u8!(ContentType => {
    Invalid(0),
    ChangeCipherSpec(20),
    Alert(21),
    Handshake(22),
    ApplicationData(23),
    (255)
});

/// The plaintext content of a record after any decryption: the content plus
/// the real content type recovered from the TLSInnerPlaintext encoding.
#[derive(Debug)]
pub struct RecordInner {
    pub typ: ContentType,
    pub data: Bytes,
}

/// Serializes a TLSInnerPlaintext: content, real content type, then zero
/// padding of the chosen length.
pub fn serialize_inner_plaintext(inner: &RecordInner, padding: usize, out: &mut Vec<u8>) {
    out.reserve(inner.data.len() + 1 + padding);
    out.extend_from_slice(&inner.data);
    out.push(inner.typ.to_u8());
    out.resize(out.len() + padding, 0);
}

/// Recovers (content, real content type) from a decrypted TLSInnerPlaintext
/// by scanning backwards over the zero padding. A payload with no non-zero
/// byte has no content type and is malformed.
pub fn parse_inner_plaintext(mut plaintext: Vec<u8>) -> Result<RecordInner> {
    let content_end = match plaintext.iter().rposition(|b| *b != 0) {
        Some(i) => i,
        None => return Err(Error::Decode("inner plaintext is all zeros")),
    };

    let typ = ContentType::from_u8(plaintext[content_end]);
    if typ == ContentType::Invalid {
        return Err(Error::Decode("invalid inner content type"));
    }

    plaintext.truncate(content_end);
    Ok(RecordInner {
        typ,
        data: Bytes::from(plaintext),
    })
}

/// Limit on the inner plaintext (content + type byte + padding) negotiated
/// via the record_size_limit extension; exp2(14) + 1 when absent.
pub fn default_record_size_limit() -> usize {
    exp2(14) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_plaintext_padding_round_trip() {
        for padding in [0usize, 1, 17, 255] {
            let inner = RecordInner {
                typ: ContentType::Handshake,
                data: Bytes::from_static(b"hello"),
            };

            let mut buf = vec![];
            serialize_inner_plaintext(&inner, padding, &mut buf);
            assert_eq!(buf.len(), 5 + 1 + padding);

            let decoded = parse_inner_plaintext(buf).unwrap();
            assert_eq!(decoded.typ, ContentType::Handshake);
            assert_eq!(&decoded.data[..], b"hello");
        }
    }

    #[test]
    fn inner_plaintext_all_zeros_is_rejected() {
        assert!(parse_inner_plaintext(vec![0u8; 32]).is_err());
        assert!(parse_inner_plaintext(vec![]).is_err());
    }
}
