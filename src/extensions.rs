use bytes::Bytes;

use crate::dh::{DiffieHellmanFn, Secp256r1, X25519};
use crate::error::{Error, Result};
use crate::handshake::HandshakeType;
use crate::parsing::*;
use crate::record::ProtocolVersion;

// List of all extensions:
// https://www.iana.org/assignments/tls-extensiontype-values/tls-extensiontype-values.xml

/*
struct {
    ExtensionType extension_type;
    opaque extension_data<0..2^16-1>;
} Extension;
*/

/// Several extension type codes decode differently depending on the message
/// containing them, and for ServerHello, on whether that ServerHello is
/// actually a HelloRetryRequest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtensionContext {
    pub msg_type: HandshakeType,
    pub hello_retry: bool,
}

impl ExtensionContext {
    pub fn new(msg_type: HandshakeType) -> Self {
        Self {
            msg_type,
            hello_retry: false,
        }
    }

    pub fn hello_retry() -> Self {
        Self {
            msg_type: HandshakeType::ServerHello,
            hello_retry: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    /// An empty server name is only allowed when a server is acknowledging a
    /// client's name (RFC 6066 section 3).
    ServerName(Option<ServerNameList>),

    SupportedGroups(NamedGroupList),
    SignatureAlgorithms(SignatureSchemeList),

    SupportedVersionsClientHello(SupportedVersionsClientHello),
    SupportedVersionsServerHello(SupportedVersionsServerHello),

    Cookie(Cookie),

    KeyShareClientHello(KeyShareClientHello),
    KeyShareHelloRetryRequest(KeyShareHelloRetryRequest),
    KeyShareServerHello(KeyShareServerHello),

    PskKeyExchangeModes(PskKeyExchangeModes),
    PreSharedKeyClientHello(OfferedPsks),
    PreSharedKeyServerHello(PskSelectedIdentity),

    /// Empty marker in ClientHello and EncryptedExtensions.
    EarlyData,
    /// Carries max_early_data_size inside NewSessionTicket.
    EarlyDataTicket(u32),

    RecordSizeLimit(u16),

    ALPN(ProtocolNameList),

    Unknown { typ: u16, data: Bytes },
}

impl Extension {
    pub fn parse(input: Bytes, ctx: ExtensionContext) -> ParseResult<Self> {
        let (raw_type, rest) = be_u16(input)?;
        let extension_type = ExtensionType::from_u16(raw_type);

        if !extension_type.allowed(ctx) {
            return Err(Error::IllegalParameter("extension not allowed in this message"));
        }

        let (data, rest) = varlen_vector(0, U16_LIMIT, rest)?;

        let ext = match extension_type {
            ExtensionType::ServerName => {
                // Per RFC 6066 section 3, a server is allowed to send back an
                // empty server_name.
                if data.is_empty() {
                    Extension::ServerName(None)
                } else {
                    Extension::ServerName(Some(complete(ServerNameList::parse(data))?))
                }
            }
            ExtensionType::SupportedGroups => {
                Extension::SupportedGroups(complete(NamedGroupList::parse(data))?)
            }
            ExtensionType::SignatureAlgorithms => {
                Extension::SignatureAlgorithms(complete(SignatureSchemeList::parse(data))?)
            }
            ExtensionType::SupportedVersions => match ctx.msg_type {
                HandshakeType::ClientHello => Extension::SupportedVersionsClientHello(complete(
                    SupportedVersionsClientHello::parse(data),
                )?),
                HandshakeType::ServerHello => Extension::SupportedVersionsServerHello(complete(
                    SupportedVersionsServerHello::parse(data),
                )?),
                _ => return Err(Error::Decode("supported_versions in unsupported message")),
            },
            ExtensionType::Cookie => Extension::Cookie(complete(Cookie::parse(data))?),
            ExtensionType::KeyShare => match (ctx.msg_type, ctx.hello_retry) {
                (HandshakeType::ClientHello, _) => {
                    Extension::KeyShareClientHello(complete(KeyShareClientHello::parse(data))?)
                }
                (HandshakeType::ServerHello, true) => Extension::KeyShareHelloRetryRequest(
                    complete(KeyShareHelloRetryRequest::parse(data))?,
                ),
                (HandshakeType::ServerHello, false) => {
                    Extension::KeyShareServerHello(complete(KeyShareServerHello::parse(data))?)
                }
                _ => return Err(Error::Decode("key_share in unsupported message")),
            },
            ExtensionType::PskKeyExchangeModes => {
                Extension::PskKeyExchangeModes(complete(PskKeyExchangeModes::parse(data))?)
            }
            ExtensionType::PreSharedKey => match ctx.msg_type {
                HandshakeType::ClientHello => {
                    Extension::PreSharedKeyClientHello(complete(OfferedPsks::parse(data))?)
                }
                HandshakeType::ServerHello => {
                    Extension::PreSharedKeyServerHello(complete(PskSelectedIdentity::parse(data))?)
                }
                _ => return Err(Error::Decode("pre_shared_key in unsupported message")),
            },
            ExtensionType::EarlyData => match ctx.msg_type {
                HandshakeType::NewSessionTicket => {
                    Extension::EarlyDataTicket(complete(be_u32(data))?)
                }
                _ => {
                    if !data.is_empty() {
                        return Err(Error::Decode("early_data indication must be empty"));
                    }
                    Extension::EarlyData
                }
            },
            ExtensionType::RecordSizeLimit => {
                let limit = complete(be_u16(data))?;
                if limit < 64 {
                    return Err(Error::IllegalParameter("record_size_limit below 64"));
                }
                Extension::RecordSizeLimit(limit)
            }
            ExtensionType::ApplicationLayerProtocolNegotiation => {
                Extension::ALPN(complete(ProtocolNameList::parse(data))?)
            }
            ExtensionType::Unknown(typ) => Extension::Unknown { typ, data },
        };

        Ok((ext, rest))
    }

    pub fn serialize(&self, ctx: ExtensionContext, out: &mut Vec<u8>) -> Result<()> {
        let typ = self.typ();
        if !typ.allowed(ctx) {
            return Err(Error::InternalError("extension not allowed in this message"));
        }

        out.extend_from_slice(&typ.to_u16().to_be_bytes());

        serialize_varlen_vector(0, U16_LIMIT, out, |out| match self {
            Extension::ServerName(e) => {
                if let Some(e) = e {
                    e.serialize(out)
                }
            }
            Extension::SupportedGroups(e) => e.serialize(out),
            Extension::SignatureAlgorithms(e) => e.serialize(out),
            Extension::SupportedVersionsClientHello(e) => e.serialize(out),
            Extension::SupportedVersionsServerHello(e) => e.serialize(out),
            Extension::Cookie(e) => e.serialize(out),
            Extension::KeyShareClientHello(e) => e.serialize(out),
            Extension::KeyShareHelloRetryRequest(e) => e.serialize(out),
            Extension::KeyShareServerHello(e) => e.serialize(out),
            Extension::PskKeyExchangeModes(e) => e.serialize(out),
            Extension::PreSharedKeyClientHello(e) => e.serialize(out),
            Extension::PreSharedKeyServerHello(e) => e.serialize(out),
            Extension::EarlyData => {}
            Extension::EarlyDataTicket(v) => out.extend_from_slice(&v.to_be_bytes()),
            Extension::RecordSizeLimit(v) => out.extend_from_slice(&v.to_be_bytes()),
            Extension::ALPN(e) => e.serialize(out),
            Extension::Unknown { typ: _, data } => out.extend_from_slice(data),
        });

        Ok(())
    }

    pub fn typ(&self) -> ExtensionType {
        use Extension::*;
        match self {
            ServerName(_) => ExtensionType::ServerName,
            SupportedGroups(_) => ExtensionType::SupportedGroups,
            SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            SupportedVersionsClientHello(_) | SupportedVersionsServerHello(_) => {
                ExtensionType::SupportedVersions
            }
            Cookie(_) => ExtensionType::Cookie,
            KeyShareClientHello(_) | KeyShareHelloRetryRequest(_) | KeyShareServerHello(_) => {
                ExtensionType::KeyShare
            }
            PskKeyExchangeModes(_) => ExtensionType::PskKeyExchangeModes,
            PreSharedKeyClientHello(_) | PreSharedKeyServerHello(_) => ExtensionType::PreSharedKey,
            EarlyData | EarlyDataTicket(_) => ExtensionType::EarlyData,
            RecordSizeLimit(_) => ExtensionType::RecordSizeLimit,
            ALPN(_) => ExtensionType::ApplicationLayerProtocolNegotiation,
            Unknown { typ, data: _ } => ExtensionType::Unknown(*typ),
        }
    }
}

/// Parses the body of an extensions list, rejecting duplicate extension
/// types (fatal per RFC 8446 section 4.2).
pub fn parse_extension_list(data: Bytes, ctx: ExtensionContext) -> Result<Vec<Extension>> {
    let extensions = many(|i| Extension::parse(i, ctx), data)?;

    for (i, a) in extensions.iter().enumerate() {
        for b in &extensions[i + 1..] {
            if a.typ().to_u16() == b.typ().to_u16() {
                return Err(Error::IllegalParameter("duplicate extension"));
            }
        }
    }

    Ok(extensions)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    ServerName,
    SupportedGroups,
    SignatureAlgorithms,
    ApplicationLayerProtocolNegotiation,
    RecordSizeLimit,
    PreSharedKey,
    EarlyData,
    SupportedVersions,
    Cookie,
    PskKeyExchangeModes,
    KeyShare,
    Unknown(u16),
}

impl ExtensionType {
    pub fn to_u16(&self) -> u16 {
        use ExtensionType::*;
        match self {
            ServerName => 0,
            SupportedGroups => 10,
            SignatureAlgorithms => 13,
            ApplicationLayerProtocolNegotiation => 16,
            RecordSizeLimit => 28,
            PreSharedKey => 41,
            EarlyData => 42,
            SupportedVersions => 43,
            Cookie => 44,
            PskKeyExchangeModes => 45,
            KeyShare => 51,
            Unknown(v) => *v,
        }
    }

    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => Self::ServerName,
            10 => Self::SupportedGroups,
            13 => Self::SignatureAlgorithms,
            16 => Self::ApplicationLayerProtocolNegotiation,
            28 => Self::RecordSizeLimit,
            41 => Self::PreSharedKey,
            42 => Self::EarlyData,
            43 => Self::SupportedVersions,
            44 => Self::Cookie,
            45 => Self::PskKeyExchangeModes,
            51 => Self::KeyShare,
            _ => Self::Unknown(v),
        }
    }

    /// See the table in RFC 8446 section 4.2.
    fn allowed(&self, ctx: ExtensionContext) -> bool {
        use ExtensionType::*;
        use HandshakeType::*;

        let m = ctx.msg_type;
        match self {
            ServerName => m == ClientHello || m == EncryptedExtensions,
            SupportedGroups => m == ClientHello || m == EncryptedExtensions,
            SignatureAlgorithms => m == ClientHello || m == CertificateRequest,
            ApplicationLayerProtocolNegotiation => m == ClientHello || m == EncryptedExtensions,
            RecordSizeLimit => m == ClientHello || m == EncryptedExtensions,
            PreSharedKey => m == ClientHello || (m == ServerHello && !ctx.hello_retry),
            EarlyData => m == ClientHello || m == EncryptedExtensions || m == NewSessionTicket,
            SupportedVersions => m == ClientHello || m == ServerHello,
            Cookie => m == ClientHello || (m == ServerHello && ctx.hello_retry),
            PskKeyExchangeModes => m == ClientHello,
            KeyShare => m == ClientHello || m == ServerHello,
            ExtensionType::Unknown(_) => true,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 6066 section 3: Server Name Indication
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    NameType name_type;
    select (name_type) {
        case host_name: HostName;
    } name;
} ServerName;

opaque HostName<1..2^16-1>;

struct {
    ServerName server_name_list<1..2^16-1>
} ServerNameList;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct ServerNameList {
    pub names: Vec<ServerName>,
}

impl ServerNameList {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(1, U16_LIMIT, input)?;
        let names = many1(ServerName::parse, data)?;
        Ok((ServerNameList { names }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(1, U16_LIMIT, out, |out| {
            for n in self.names.iter() {
                n.serialize(out);
            }
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerName {
    pub typ: NameType,
    /// For a host_name this is strictly ASCII.
    pub data: Bytes,
}

impl ServerName {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (typ, rest) = NameType::parse(input)?;
        let (data, rest) = varlen_vector(1, U16_LIMIT, rest)?;
        Ok((ServerName { typ, data }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.typ.serialize(out);
        serialize_varlen_vector(1, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.data);
        });
    }
}

tls_enum_u8!(NameType => {
    host_name(0), (255)
});

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.2.7: Supported Groups
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    NamedGroup named_group_list<2..2^16-1>;
} NamedGroupList;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct NamedGroupList {
    pub groups: Vec<NamedGroup>,
}

impl NamedGroupList {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(2, U16_LIMIT, input)?;
        let groups = many1(NamedGroup::parse, data)?;
        Ok((NamedGroupList { groups }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(2, U16_LIMIT, out, |out| {
            for g in self.groups.iter() {
                g.serialize(out);
            }
        });
    }
}

tls_enum_u16!(NamedGroup => {
    secp256r1(0x0017),
    secp384r1(0x0018),
    secp521r1(0x0019),
    x25519(0x001D),
    x448(0x001E),
    (0xFFFF)
});

impl NamedGroup {
    /// Instantiates the key exchange function for this group, if implemented.
    pub fn create(&self) -> Option<Box<dyn DiffieHellmanFn>> {
        Some(match self {
            NamedGroup::x25519 => Box::new(X25519),
            NamedGroup::secp256r1 => Box::new(Secp256r1),
            _ => return None,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.2.3: Signature Algorithms
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    SignatureScheme supported_signature_algorithms<2..2^16-2>;
} SignatureSchemeList;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSchemeList {
    pub algorithms: Vec<SignatureScheme>,
}

impl SignatureSchemeList {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(2, exp2(16) - 2, input)?;
        let algorithms = many1(SignatureScheme::parse, data)?;
        Ok((Self { algorithms }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(2, exp2(16) - 2, out, |out| {
            for a in self.algorithms.iter() {
                a.serialize(out);
            }
        });
    }
}

tls_enum_u16!(SignatureScheme => {
    ecdsa_secp256r1_sha256(0x0403),
    ecdsa_secp384r1_sha384(0x0503),
    rsa_pss_rsae_sha256(0x0804),
    (0xFFFF)
});

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.2.1: Supported Versions
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    select (Handshake.msg_type) {
        case client_hello:
            ProtocolVersion versions<2..254>;

        case server_hello: // and HelloRetryRequest
            ProtocolVersion selected_version;
    };
} SupportedVersions;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct SupportedVersionsClientHello {
    /// At least one version supported by the client.
    pub versions: Vec<ProtocolVersion>,
}

impl SupportedVersionsClientHello {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(2, 254, input)?;
        let versions = many1(be_u16, data)?;
        Ok((Self { versions }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(2, 254, out, |out| {
            for v in self.versions.iter() {
                out.extend_from_slice(&v.to_be_bytes());
            }
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupportedVersionsServerHello {
    pub selected_version: ProtocolVersion,
}

impl SupportedVersionsServerHello {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (selected_version, rest) = be_u16(input)?;
        Ok((Self { selected_version }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.selected_version.to_be_bytes());
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.2.2: Cookie
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    opaque cookie<1..2^16-1>;
} Cookie;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    pub data: Bytes,
}

impl Cookie {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(1, U16_LIMIT, input)?;
        Ok((Cookie { data }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(1, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.data);
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.2.8: Key Share
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    NamedGroup group;
    opaque key_exchange<1..2^16-1>;
} KeyShareEntry;

struct {
    KeyShareEntry client_shares<0..2^16-1>;
} KeyShareClientHello;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct KeyShareClientHello {
    pub client_shares: Vec<KeyShareEntry>,
}

impl KeyShareClientHello {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(0, U16_LIMIT, input)?;
        let client_shares = many(KeyShareEntry::parse, data)?;
        Ok((Self { client_shares }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(0, U16_LIMIT, out, |out| {
            for e in self.client_shares.iter() {
                e.serialize(out);
            }
        });
    }
}

tls_struct!(KeyShareHelloRetryRequest => {
    NamedGroup selected_group;
});

tls_struct!(KeyShareServerHello => {
    KeyShareEntry server_share;
});

#[derive(Debug, Clone, PartialEq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub key_exchange: Bytes,
}

impl KeyShareEntry {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (group, rest) = NamedGroup::parse(input)?;
        let (key_exchange, rest) = varlen_vector(1, U16_LIMIT, rest)?;
        Ok((KeyShareEntry { group, key_exchange }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.group.serialize(out);
        serialize_varlen_vector(1, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.key_exchange);
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.2.9: PSK Key Exchange Modes
////////////////////////////////////////////////////////////////////////////////

/*
enum { psk_ke(0), psk_dhe_ke(1), (255) } PskKeyExchangeMode;

struct {
    PskKeyExchangeMode ke_modes<1..255>;
} PskKeyExchangeModes;
*/

tls_enum_u8!(PskKeyExchangeMode => {
    psk_ke(0), psk_dhe_ke(1), (255)
});

#[derive(Debug, Clone, PartialEq)]
pub struct PskKeyExchangeModes {
    pub modes: Vec<PskKeyExchangeMode>,
}

impl PskKeyExchangeModes {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(1, U8_LIMIT, input)?;
        let modes = many1(PskKeyExchangeMode::parse, data)?;
        Ok((Self { modes }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(1, U8_LIMIT, out, |out| {
            for m in self.modes.iter() {
                m.serialize(out);
            }
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 8446 section 4.2.11: Pre-Shared Key
////////////////////////////////////////////////////////////////////////////////

/*
struct {
    opaque identity<1..2^16-1>;
    uint32 obfuscated_ticket_age;
} PskIdentity;

opaque PskBinderEntry<32..255>;

struct {
    PskIdentity identities<7..2^16-1>;
    PskBinderEntry binders<33..2^16-1>;
} OfferedPsks;

struct {
    select (Handshake.msg_type) {
        case client_hello: OfferedPsks;
        case server_hello: uint16 selected_identity;
    };
} PreSharedKeyExtension;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct PskIdentity {
    pub identity: Bytes,
    pub obfuscated_ticket_age: u32,
}

impl PskIdentity {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (identity, rest) = varlen_vector(1, U16_LIMIT, input)?;
        let (obfuscated_ticket_age, rest) = be_u32(rest)?;
        Ok((
            Self {
                identity,
                obfuscated_ticket_age,
            },
            rest,
        ))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(1, U16_LIMIT, out, |out| {
            out.extend_from_slice(&self.identity);
        });
        out.extend_from_slice(&self.obfuscated_ticket_age.to_be_bytes());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfferedPsks {
    pub identities: Vec<PskIdentity>,
    pub binders: Vec<Bytes>,
}

impl OfferedPsks {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (identity_data, rest) = varlen_vector(7, U16_LIMIT, input)?;
        let identities = many1(PskIdentity::parse, identity_data)?;

        let (binder_data, rest) = varlen_vector(33, U16_LIMIT, rest)?;
        let binders = many1(|i| varlen_vector(32, U8_LIMIT, i), binder_data)?;

        Ok((Self { identities, binders }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(7, U16_LIMIT, out, |out| {
            for id in self.identities.iter() {
                id.serialize(out);
            }
        });
        serialize_varlen_vector(33, U16_LIMIT, out, |out| {
            for b in self.binders.iter() {
                serialize_varlen_vector(32, U8_LIMIT, out, |out| {
                    out.extend_from_slice(b);
                });
            }
        });
    }

    /// Number of bytes the binders list occupies at the tail of the
    /// serialized ClientHello. Binder computation covers everything before
    /// this point.
    pub fn binders_encoded_len(&self) -> usize {
        2 + self
            .binders
            .iter()
            .map(|b| 1 + b.len())
            .sum::<usize>()
    }
}

tls_struct!(PskSelectedIdentity => {
    U16 selected_identity;
});

/// Helper so tls_struct! fields can be plain big-endian u16 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U16(pub u16);

impl U16 {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (v, rest) = be_u16(input)?;
        Ok((U16(v), rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes());
    }
}

////////////////////////////////////////////////////////////////////////////////
// RFC 7301 section 3.1: ALPN
////////////////////////////////////////////////////////////////////////////////

/*
opaque ProtocolName<1..2^8-1>;

struct {
    ProtocolName protocol_name_list<2..2^16-1>
} ProtocolNameList;
*/

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolNameList {
    /// In descending order of preference.
    pub names: Vec<Bytes>,
}

impl ProtocolNameList {
    pub fn parse(input: Bytes) -> ParseResult<Self> {
        let (data, rest) = varlen_vector(2, U16_LIMIT, input)?;
        let names = many1(|i| varlen_vector(1, U8_LIMIT, i), data)?;
        Ok((ProtocolNameList { names }, rest))
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize_varlen_vector(2, U16_LIMIT, out, |out| {
            for name in &self.names {
                serialize_varlen_vector(1, U8_LIMIT, out, |out| {
                    out.extend_from_slice(name.as_ref());
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(ext: Extension, ctx: ExtensionContext) {
        let mut out = vec![];
        ext.serialize(ctx, &mut out).unwrap();
        let (parsed, rest) = Extension::parse(Bytes::from(out), ctx).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, ext);
    }

    #[test]
    fn key_share_round_trips_per_context() {
        round_trip(
            Extension::KeyShareClientHello(KeyShareClientHello {
                client_shares: vec![KeyShareEntry {
                    group: NamedGroup::x25519,
                    key_exchange: Bytes::from(vec![5u8; 32]),
                }],
            }),
            ExtensionContext::new(HandshakeType::ClientHello),
        );
        round_trip(
            Extension::KeyShareServerHello(KeyShareServerHello {
                server_share: KeyShareEntry {
                    group: NamedGroup::secp256r1,
                    key_exchange: Bytes::from(vec![4u8; 65]),
                },
            }),
            ExtensionContext::new(HandshakeType::ServerHello),
        );
        round_trip(
            Extension::KeyShareHelloRetryRequest(KeyShareHelloRetryRequest {
                selected_group: NamedGroup::secp256r1,
            }),
            ExtensionContext::hello_retry(),
        );
    }

    #[test]
    fn pre_shared_key_round_trips_per_context() {
        round_trip(
            Extension::PreSharedKeyClientHello(OfferedPsks {
                identities: vec![PskIdentity {
                    identity: Bytes::from_static(b"ticket"),
                    obfuscated_ticket_age: 12345,
                }],
                binders: vec![Bytes::from(vec![0xAB; 32])],
            }),
            ExtensionContext::new(HandshakeType::ClientHello),
        );
        round_trip(
            Extension::PreSharedKeyServerHello(PskSelectedIdentity {
                selected_identity: U16(0),
            }),
            ExtensionContext::new(HandshakeType::ServerHello),
        );
    }

    #[test]
    fn early_data_round_trips_per_context() {
        round_trip(
            Extension::EarlyData,
            ExtensionContext::new(HandshakeType::ClientHello),
        );
        round_trip(
            Extension::EarlyDataTicket(16384),
            ExtensionContext::new(HandshakeType::NewSessionTicket),
        );
    }

    #[test]
    fn binders_encoded_len_matches_wire_size() {
        let psks = OfferedPsks {
            identities: vec![PskIdentity {
                identity: Bytes::from_static(b"id"),
                obfuscated_ticket_age: 0,
            }],
            binders: vec![Bytes::from(vec![0u8; 32]), Bytes::from(vec![1u8; 48])],
        };

        let mut full = vec![];
        psks.serialize(&mut full);

        let mut without_binders = vec![];
        serialize_varlen_vector(7, U16_LIMIT, &mut without_binders, |out| {
            for id in psks.identities.iter() {
                id.serialize(out);
            }
        });

        assert_eq!(full.len() - without_binders.len(), psks.binders_encoded_len());
    }

    #[test]
    fn duplicate_extensions_are_fatal() {
        let ctx = ExtensionContext::new(HandshakeType::ClientHello);
        let mut data = vec![];
        for _ in 0..2 {
            Extension::Cookie(Cookie {
                data: Bytes::from_static(b"c"),
            })
            .serialize(ctx, &mut data)
            .unwrap();
        }

        assert!(matches!(
            parse_extension_list(Bytes::from(data), ctx),
            Err(Error::IllegalParameter(_))
        ));
    }

    #[test]
    fn cookie_not_allowed_in_plain_server_hello() {
        let ctx = ExtensionContext::new(HandshakeType::ServerHello);
        let mut out = vec![];
        let res = Extension::Cookie(Cookie {
            data: Bytes::from_static(b"c"),
        })
        .serialize(ctx, &mut out);
        assert!(res.is_err());
    }

    #[test]
    fn record_size_limit_below_64_rejected() {
        let ctx = ExtensionContext::new(HandshakeType::ClientHello);
        let data = Bytes::from(vec![0x00, 28, 0, 2, 0, 63]);
        assert!(Extension::parse(data, ctx).is_err());
    }
}
