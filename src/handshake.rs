use bytes::Bytes;

use crate::cipher_suite::CipherSuite;
use crate::error::Error;
use crate::extensions::*;
use crate::parsing::*;
use crate::record::ProtocolVersion;

// https://tools.ietf.org/html/rfc8446#section-4

/// ServerHello.random value that reinterprets the message as a
/// HelloRetryRequest: SHA-256 of "HelloRetryRequest".
pub const HELLO_RETRY_REQUEST_RANDOM: [u8; 32] = [
    0xCF, 0x21, 0xAD, 0x74, 0xE5, 0x9A, 0x61, 0x11, 0xBE, 0x1D, 0x8C, 0x02, 0x1E, 0x65, 0xB8,
    0x91, 0xC2, 0xA2, 0x11, 0x16, 0x7A, 0xBB, 0x8C, 0x5E, 0x07, 0x9E, 0x09, 0xE2, 0xC8, 0xA8,
    0x33, 0x9C,
];

/*
struct {
    HandshakeType msg_type;    /* handshake type */
    uint24 length;             /* remaining bytes in message */
    select (Handshake.msg_type) {
        case client_hello:          ClientHello;
        case server_hello:          ServerHello;
        case end_of_early_data:     EndOfEarlyData;
        case encrypted_extensions:  EncryptedExtensions;
        case certificate_request:   CertificateRequest;
        case certificate:           Certificate;
        case certificate_verify:    CertificateVerify;
        case finished:              Finished;
        case new_session_ticket:    NewSessionTicket;
        case key_update:            KeyUpdate;
    };
} Handshake;
*/

#[derive(Debug, Clone)]
pub enum Handshake {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    EndOfEarlyData,
    EncryptedExtensions(EncryptedExtensions),
    CertificateRequest(CertificateRequest),
    Certificate(Certificate),
    CertificateVerify(CertificateVerify),
    Finished(Finished),
    NewSessionTicket(NewSessionTicket),
    KeyUpdate(KeyUpdate),
}

impl Handshake {
    /// Parses one handshake message, returning unconsumed input. Fails with
    /// an incomplete error if the declared length extends beyond the input;
    /// the record layer uses this to reassemble messages spanning records.
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (msg_type, rest) = HandshakeType::parse(input)?;
        let (payload, rest) = varlen_vector(0, U24_LIMIT, rest)?;

        let msg = match msg_type {
            HandshakeType::ClientHello => {
                Handshake::ClientHello(complete(ClientHello::parse(payload))?)
            }
            HandshakeType::ServerHello => {
                Handshake::ServerHello(complete(ServerHello::parse(payload))?)
            }
            HandshakeType::EndOfEarlyData => {
                if !payload.is_empty() {
                    return Err(Error::Decode("end_of_early_data carries no body"));
                }
                Handshake::EndOfEarlyData
            }
            HandshakeType::EncryptedExtensions => {
                Handshake::EncryptedExtensions(complete(EncryptedExtensions::parse(payload))?)
            }
            HandshakeType::CertificateRequest => {
                Handshake::CertificateRequest(complete(CertificateRequest::parse(payload))?)
            }
            HandshakeType::Certificate => {
                Handshake::Certificate(complete(Certificate::parse(payload))?)
            }
            HandshakeType::CertificateVerify => {
                Handshake::CertificateVerify(complete(CertificateVerify::parse(payload))?)
            }
            HandshakeType::Finished => Handshake::Finished(Finished {
                verify_data: payload,
            }),
            HandshakeType::NewSessionTicket => {
                Handshake::NewSessionTicket(complete(NewSessionTicket::parse(payload))?)
            }
            HandshakeType::KeyUpdate => Handshake::KeyUpdate(complete(KeyUpdate::parse(payload))?),
            _ => {
                return Err(Error::UnexpectedMessage("unsupported handshake type"));
            }
        };

        Ok((msg, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.typ().serialize(out);

        serialize_varlen_vector(0, U24_LIMIT, out, |out| match self {
            Handshake::ClientHello(v) => v.serialize(out),
            Handshake::ServerHello(v) => v.serialize(out),
            Handshake::EndOfEarlyData => {}
            Handshake::EncryptedExtensions(v) => v.serialize(out),
            Handshake::CertificateRequest(v) => v.serialize(out),
            Handshake::Certificate(v) => v.serialize(out),
            Handshake::CertificateVerify(v) => v.serialize(out),
            Handshake::Finished(v) => v.serialize(out),
            Handshake::NewSessionTicket(v) => v.serialize(out),
            Handshake::KeyUpdate(v) => v.serialize(out),
        });
    }

    pub fn typ(&self) -> HandshakeType {
        match self {
            Handshake::ClientHello(_) => HandshakeType::ClientHello,
            Handshake::ServerHello(_) => HandshakeType::ServerHello,
            Handshake::EndOfEarlyData => HandshakeType::EndOfEarlyData,
            Handshake::EncryptedExtensions(_) => HandshakeType::EncryptedExtensions,
            Handshake::CertificateRequest(_) => HandshakeType::CertificateRequest,
            Handshake::Certificate(_) => HandshakeType::Certificate,
            Handshake::CertificateVerify(_) => HandshakeType::CertificateVerify,
            Handshake::Finished(_) => HandshakeType::Finished,
            Handshake::NewSessionTicket(_) => HandshakeType::NewSessionTicket,
            Handshake::KeyUpdate(_) => HandshakeType::KeyUpdate,
        }
    }
}

tls_enum_u8!(HandshakeType => {
    ClientHello(1),
    ServerHello(2),
    NewSessionTicket(4),
    EndOfEarlyData(5),
    EncryptedExtensions(8),
    Certificate(11),
    CertificateRequest(13),
    CertificateVerify(15),
    Finished(20),
    KeyUpdate(24),
    MessageHash(254),
    (255)
});

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.1.2: Client Hello
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    ProtocolVersion legacy_version = 0x0303;    /* TLS v1.2 */
    Random random;
    opaque legacy_session_id<0..32>;
    CipherSuite cipher_suites<2..2^16-2>;
    opaque legacy_compression_methods<1..2^8-1>;
    Extension extensions<8..2^16-1>;
} ClientHello;
*/

#[derive(Debug, Clone)]
pub struct ClientHello {
    pub legacy_version: ProtocolVersion,
    /// 32 random bytes.
    pub random: Bytes,
    /// 0-32 bytes.
    pub legacy_session_id: Bytes,
    pub cipher_suites: Vec<CipherSuite>,
    pub legacy_compression_methods: Bytes,
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (legacy_version, rest) = be_u16(input)?;
        let (random, rest) = take_exact(32, rest)?;
        let (legacy_session_id, rest) = varlen_vector(0, 32, rest)?;

        let (suite_data, rest) = varlen_vector(2, exp2(16) - 2, rest)?;
        let cipher_suites = many(CipherSuite::parse, suite_data)?;

        let (legacy_compression_methods, rest) = varlen_vector(1, U8_LIMIT, rest)?;

        let (extension_data, rest) = varlen_vector(8, U16_LIMIT, rest)?;
        let extensions = parse_extension_list(
            extension_data,
            ExtensionContext::new(HandshakeType::ClientHello),
        )?;

        // 'The "pre_shared_key" extension MUST be the last extension in the
        // ClientHello.'
        for (i, e) in extensions.iter().enumerate() {
            if matches!(e, Extension::PreSharedKeyClientHello(_)) && i + 1 != extensions.len() {
                return Err(Error::IllegalParameter("pre_shared_key is not last"));
            }
        }

        Ok((
            ClientHello {
                legacy_version,
                random,
                legacy_session_id,
                cipher_suites,
                legacy_compression_methods,
                extensions,
            },
            rest,
        ))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.legacy_version.to_be_bytes());
        assert_eq!(self.random.len(), 32);
        out.extend_from_slice(&self.random);

        serialize_varlen_vector(0, 32, out, |out| {
            out.extend_from_slice(&self.legacy_session_id);
        });
        serialize_varlen_vector(2, exp2(16) - 2, out, |out| {
            for c in self.cipher_suites.iter() {
                c.serialize(out);
            }
        });
        serialize_varlen_vector(1, U8_LIMIT, out, |out| {
            out.extend_from_slice(&self.legacy_compression_methods);
        });
        serialize_varlen_vector(8, U16_LIMIT, out, |out| {
            for e in self.extensions.iter() {
                e.serialize(ExtensionContext::new(HandshakeType::ClientHello), out)
                    .unwrap();
            }
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.1.3: Server Hello
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    ProtocolVersion legacy_version = 0x0303;    /* TLS v1.2 */
    Random random;
    opaque legacy_session_id_echo<0..32>;
    CipherSuite cipher_suite;
    uint8 legacy_compression_method = 0;
    Extension extensions<6..2^16-1>;
} ServerHello;
*/

#[derive(Debug, Clone)]
pub struct ServerHello {
    pub legacy_version: ProtocolVersion,
    pub random: Bytes,
    pub legacy_session_id_echo: Bytes,
    pub cipher_suite: CipherSuite,
    pub legacy_compression_method: u8,
    pub extensions: Vec<Extension>,
}

impl ServerHello {
    /// Whether this ServerHello is really a HelloRetryRequest. This changes
    /// how its extensions decode.
    pub fn is_hello_retry(&self) -> bool {
        self.random[..] == HELLO_RETRY_REQUEST_RANDOM
    }

    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (legacy_version, rest) = be_u16(input)?;
        let (random, rest) = take_exact(32, rest)?;
        let (legacy_session_id_echo, rest) = varlen_vector(0, 32, rest)?;
        let (cipher_suite, rest) = CipherSuite::parse(rest)?;
        let (legacy_compression_method, rest) = be_u8(rest)?;

        let ctx = if random[..] == HELLO_RETRY_REQUEST_RANDOM {
            ExtensionContext::hello_retry()
        } else {
            ExtensionContext::new(HandshakeType::ServerHello)
        };

        let (extension_data, rest) = varlen_vector(6, U16_LIMIT, rest)?;
        let extensions = parse_extension_list(extension_data, ctx)?;

        Ok((
            Self {
                legacy_version,
                random,
                legacy_session_id_echo,
                cipher_suite,
                legacy_compression_method,
                extensions,
            },
            rest,
        ))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        let ctx = if self.is_hello_retry() {
            ExtensionContext::hello_retry()
        } else {
            ExtensionContext::new(HandshakeType::ServerHello)
        };

        out.extend_from_slice(&self.legacy_version.to_be_bytes());
        assert_eq!(self.random.len(), 32);
        out.extend_from_slice(&self.random);
        serialize_varlen_vector(0, 32, out, |out| {
            out.extend_from_slice(&self.legacy_session_id_echo);
        });
        self.cipher_suite.serialize(out);
        out.push(self.legacy_compression_method);
        serialize_varlen_vector(6, U16_LIMIT, out, |out| {
            for e in self.extensions.iter() {
                e.serialize(ctx, out).unwrap();
            }
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.3.1: Encrypted Extensions
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    Extension extensions<0..2^16-1>;
} EncryptedExtensions;
*/

#[derive(Debug, Clone)]
pub struct EncryptedExtensions {
    pub extensions: Vec<Extension>,
}

impl EncryptedExtensions {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(0, U16_LIMIT, input)?;
        let extensions = parse_extension_list(
            data,
            ExtensionContext::new(HandshakeType::EncryptedExtensions),
        )?;
        Ok((Self { extensions }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(0, U16_LIMIT, out, |out| {
            for e in self.extensions.iter() {
                e.serialize(
                    ExtensionContext::new(HandshakeType::EncryptedExtensions),
                    out,
                )
                .unwrap();
            }
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.4.2: Certificate
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    opaque cert_data<1..2^24-1>;
    Extension extensions<0..2^16-1>;
} CertificateEntry;

struct {
    opaque certificate_request_context<0..2^8-1>;
    CertificateEntry certificate_list<0..2^24-1>;
} Certificate;
*/

#[derive(Debug, Clone)]
pub struct Certificate {
    pub certificate_request_context: Bytes,
    pub certificate_list: Vec<CertificateEntry>,
}

impl Certificate {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (certificate_request_context, rest) = varlen_vector(0, U8_LIMIT, input)?;
        let (list_data, rest) = varlen_vector(0, U24_LIMIT, rest)?;
        let certificate_list = many(CertificateEntry::parse, list_data)?;

        Ok((
            Self {
                certificate_request_context,
                certificate_list,
            },
            rest,
        ))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(0, U8_LIMIT, out, |out| {
            out.extend_from_slice(&self.certificate_request_context);
        });
        serialize_varlen_vector(0, U24_LIMIT, out, |out| {
            for c in self.certificate_list.iter() {
                c.serialize(out);
            }
        });
    }
}

#[derive(Debug, Clone)]
pub struct CertificateEntry {
    pub cert: Bytes,
    pub extensions: Vec<Extension>,
}

impl CertificateEntry {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (cert, rest) = varlen_vector(1, U24_LIMIT, input)?;
        let (extension_data, rest) = varlen_vector(0, U16_LIMIT, rest)?;
        let extensions = parse_extension_list(
            extension_data,
            ExtensionContext::new(HandshakeType::Certificate),
        )?;
        Ok((Self { cert, extensions }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(1, U24_LIMIT, out, |out| {
            out.extend_from_slice(&self.cert);
        });
        serialize_varlen_vector(0, U16_LIMIT, out, |out| {
            for e in self.extensions.iter() {
                e.serialize(ExtensionContext::new(HandshakeType::Certificate), out)
                    .unwrap();
            }
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.3.2: Certificate Request
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    opaque certificate_request_context<0..2^8-1>;
    Extension extensions<2..2^16-1>;
} CertificateRequest;
*/

#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub certificate_request_context: Bytes,
    pub extensions: Vec<Extension>,
}

impl CertificateRequest {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (certificate_request_context, rest) = varlen_vector(0, U8_LIMIT, input)?;
        let (extension_data, rest) = varlen_vector(2, U16_LIMIT, rest)?;
        let extensions = parse_extension_list(
            extension_data,
            ExtensionContext::new(HandshakeType::CertificateRequest),
        )?;
        Ok((
            Self {
                certificate_request_context,
                extensions,
            },
            rest,
        ))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(0, U8_LIMIT, out, |out| {
            out.extend_from_slice(&self.certificate_request_context);
        });
        serialize_varlen_vector(2, U16_LIMIT, out, |out| {
            for e in self.extensions.iter() {
                e.serialize(
                    ExtensionContext::new(HandshakeType::CertificateRequest),
                    out,
                )
                .unwrap();
            }
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.4.3: Certificate Verify
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    SignatureScheme algorithm;
    opaque signature<0..2^16-1>;
} CertificateVerify;
*/

#[derive(Debug, Clone)]
pub struct CertificateVerify {
    pub algorithm: SignatureScheme,
    pub signature: Bytes,
}

impl CertificateVerify {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (algorithm, rest) = SignatureScheme::parse(input)?;
        let (signature, rest) = varlen_vector(0, U16_LIMIT, rest)?;
        Ok((Self { algorithm, signature }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.algorithm.serialize(out);
        serialize_varlen_vector(0, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.signature);
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.4.4: Finished
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    opaque verify_data[Hash.length];
} Finished;
*/

#[derive(Debug, Clone)]
pub struct Finished {
    pub verify_data: Bytes,
}

impl Finished {
    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.verify_data);
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.6.1: New Session Ticket
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    uint32 ticket_lifetime;
    uint32 ticket_age_add;
    opaque ticket_nonce<0..255>;
    opaque ticket<1..2^16-1>;
    Extension extensions<0..2^16-2>;
} NewSessionTicket;
*/

#[derive(Debug, Clone)]
pub struct NewSessionTicket {
    pub ticket_lifetime: u32,
    pub ticket_age_add: u32,
    pub ticket_nonce: Bytes,
    pub ticket: Bytes,
    pub extensions: Vec<Extension>,
}

impl NewSessionTicket {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (ticket_lifetime, rest) = be_u32(input)?;
        let (ticket_age_add, rest) = be_u32(rest)?;
        let (ticket_nonce, rest) = varlen_vector(0, U8_LIMIT, rest)?;
        let (ticket, rest) = varlen_vector(1, U16_LIMIT, rest)?;
        let (extension_data, rest) = varlen_vector(0, U16_LIMIT - 1, rest)?;
        let extensions = parse_extension_list(
            extension_data,
            ExtensionContext::new(HandshakeType::NewSessionTicket),
        )?;

        Ok((
            Self {
                ticket_lifetime,
                ticket_age_add,
                ticket_nonce,
                ticket,
                extensions,
            },
            rest,
        ))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.ticket_lifetime.to_be_bytes());
        out.extend_from_slice(&self.ticket_age_add.to_be_bytes());
        serialize_varlen_vector(0, U8_LIMIT, out, |out| {
            out.extend_from_slice(&self.ticket_nonce);
        });
        serialize_varlen_vector(1, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.ticket);
        });
        serialize_varlen_vector(0, U16_LIMIT - 1, out, |out| {
            for e in self.extensions.iter() {
                e.serialize(ExtensionContext::new(HandshakeType::NewSessionTicket), out)
                    .unwrap();
            }
        });
    }

    pub fn max_early_data_size(&self) -> u32 {
        for e in &self.extensions {
            if let Extension::EarlyDataTicket(n) = e {
                return *n;
            }
        }
        0
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.6.3: Key Update
////////////////////////////////////////////////////////////////////////////////

tls_struct!(KeyUpdate => {
    KeyUpdateRequest request_update;
});

tls_enum_u8!(KeyUpdateRequest => {
    update_not_requested(0), update_requested(1), (255)
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TLS_1_2_VERSION;

    fn sample_client_hello() -> ClientHello {
        ClientHello {
            legacy_version: TLS_1_2_VERSION,
            random: Bytes::from(vec![7u8; 32]),
            legacy_session_id: Bytes::from(vec![9u8; 32]),
            cipher_suites: vec![
                CipherSuite::TLS_AES_128_GCM_SHA256,
                CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
            ],
            legacy_compression_methods: Bytes::from_static(&[0]),
            extensions: vec![
                Extension::SupportedVersionsClientHello(SupportedVersionsClientHello {
                    versions: vec![crate::record::TLS_1_3_VERSION],
                }),
                Extension::SupportedGroups(NamedGroupList {
                    groups: vec![NamedGroup::x25519, NamedGroup::secp256r1],
                }),
                Extension::KeyShareClientHello(KeyShareClientHello {
                    client_shares: vec![KeyShareEntry {
                        group: NamedGroup::x25519,
                        key_exchange: Bytes::from(vec![1u8; 32]),
                    }],
                }),
            ],
        }
    }

    #[test]
    fn client_hello_round_trip() {
        let hello = sample_client_hello();
        let mut out = vec![];
        Handshake::ClientHello(hello.clone()).serialize(&mut out);

        let (parsed, rest) = Handshake::parse(Bytes::from(out)).unwrap();
        assert!(rest.is_empty());
        let parsed = match parsed {
            Handshake::ClientHello(v) => v,
            other => panic!("wrong message type: {:?}", other),
        };
        assert_eq!(parsed.random, hello.random);
        assert_eq!(parsed.cipher_suites, hello.cipher_suites);
        assert_eq!(parsed.extensions, hello.extensions);
    }

    #[test]
    fn truncated_message_is_incomplete() {
        let mut out = vec![];
        Handshake::ClientHello(sample_client_hello()).serialize(&mut out);
        out.truncate(out.len() - 10);

        assert!(matches!(
            Handshake::parse(Bytes::from(out)),
            Err(crate::error::Error::Incomplete)
        ));
    }

    #[test]
    fn pre_shared_key_must_be_last() {
        let mut hello = sample_client_hello();
        hello.extensions.insert(
            0,
            Extension::PreSharedKeyClientHello(OfferedPsks {
                identities: vec![PskIdentity {
                    identity: Bytes::from_static(b"t"),
                    obfuscated_ticket_age: 0,
                }],
                binders: vec![Bytes::from(vec![0u8; 32])],
            }),
        );

        let mut out = vec![];
        Handshake::ClientHello(hello).serialize(&mut out);
        assert!(Handshake::parse(Bytes::from(out)).is_err());
    }

    #[test]
    fn hello_retry_request_extensions_decode_with_retry_context() {
        let hrr = ServerHello {
            legacy_version: TLS_1_2_VERSION,
            random: Bytes::from(HELLO_RETRY_REQUEST_RANDOM.to_vec()),
            legacy_session_id_echo: Bytes::from(vec![9u8; 32]),
            cipher_suite: CipherSuite::TLS_AES_128_GCM_SHA256,
            legacy_compression_method: 0,
            extensions: vec![
                Extension::SupportedVersionsServerHello(SupportedVersionsServerHello {
                    selected_version: crate::record::TLS_1_3_VERSION,
                }),
                Extension::KeyShareHelloRetryRequest(KeyShareHelloRetryRequest {
                    selected_group: NamedGroup::secp256r1,
                }),
            ],
        };

        let mut out = vec![];
        Handshake::ServerHello(hrr).serialize(&mut out);

        let (parsed, _) = Handshake::parse(Bytes::from(out)).unwrap();
        match parsed {
            Handshake::ServerHello(sh) => {
                assert!(sh.is_hello_retry());
                assert!(sh
                    .extensions
                    .iter()
                    .any(|e| matches!(e, Extension::KeyShareHelloRetryRequest(_))));
            }
            other => panic!("wrong message type: {:?}", other),
        }
    }

    #[test]
    fn key_update_round_trip() {
        let mut out = vec![];
        Handshake::KeyUpdate(KeyUpdate {
            request_update: KeyUpdateRequest::update_requested,
        })
        .serialize(&mut out);
        assert_eq!(out, vec![24, 0, 0, 1, 1]);

        let (parsed, _) = Handshake::parse(Bytes::from(out)).unwrap();
        match parsed {
            Handshake::KeyUpdate(k) => {
                assert_eq!(k.request_update, KeyUpdateRequest::update_requested)
            }
            other => panic!("wrong message type: {:?}", other),
        }
    }
}
