use std::sync::Arc;

use bytes::Bytes;

use crate::cipher_suite::CipherSuite;
use crate::extensions::{NamedGroup, SignatureScheme};
use crate::keylog::KeyLog;
use crate::session::{ClientSessionStore, TicketIssuer};
use crate::signatures::{CertificateVerifier, Signer};

/// Configuration for how a client negotiates a handshake: which algorithms
/// we will accept, what we validate about the server, and whether we try to
/// resume prior sessions.
pub struct ClientOptions {
    /// DNS name of the remote server. e.g. "example.com". Sent as SNI when
    /// non-empty and used to validate the server certificate.
    pub hostname: String,

    /// Groups for which the first ClientHello carries a key share.
    ///
    /// NOTE: Must be a subset of 'supported_groups'.
    pub initial_keys_shared: Vec<NamedGroup>,

    pub supported_cipher_suites: Vec<CipherSuite>,

    /// Supported groups for (EC)DHE key exchange, in preference order.
    pub supported_groups: Vec<NamedGroup>,

    /// Algorithms we accept for the server's CertificateVerify.
    pub supported_signature_algorithms: Vec<SignatureScheme>,

    pub alpn_ids: Vec<Bytes>,

    pub certificate_verifier: Arc<dyn CertificateVerifier>,

    /// Present to offer resumption PSKs from previously stored tickets.
    pub session_store: Option<Arc<dyn ClientSessionStore>>,

    /// Application data to send as 0-RTT when resuming with a ticket that
    /// permits it. Ignored on a full handshake.
    pub early_data: Option<Bytes>,

    /// Largest protected record payload we are willing to receive,
    /// advertised via the record_size_limit extension.
    pub record_size_limit: Option<u16>,

    pub key_log: Option<Arc<dyn KeyLog>>,
}

impl ClientOptions {
    pub fn recommended(certificate_verifier: Arc<dyn CertificateVerifier>) -> Self {
        ClientOptions {
            hostname: String::new(),
            initial_keys_shared: vec![NamedGroup::x25519],
            supported_cipher_suites: vec![
                CipherSuite::TLS_AES_128_GCM_SHA256,
                CipherSuite::TLS_AES_256_GCM_SHA384,
                CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
            ],
            supported_groups: vec![NamedGroup::x25519, NamedGroup::secp256r1],
            supported_signature_algorithms: vec![
                SignatureScheme::ecdsa_secp256r1_sha256,
                SignatureScheme::ecdsa_secp384r1_sha384,
                SignatureScheme::rsa_pss_rsae_sha256,
            ],
            alpn_ids: vec![],
            certificate_verifier,
            session_store: None,
            early_data: None,
            record_size_limit: None,
            key_log: None,
        }
    }
}

/// Server side counterpart to ClientOptions.
pub struct ServerOptions {
    /// DER encoded certificate chain, end entity first.
    pub certificates: Vec<Bytes>,

    /// Signs the server CertificateVerify with the key behind
    /// certificates[0].
    pub private_key: Arc<dyn Signer>,

    pub supported_cipher_suites: Vec<CipherSuite>,

    /// In preference order; the first mutually supported group wins.
    pub supported_groups: Vec<NamedGroup>,

    pub supported_signature_algorithms: Vec<SignatureScheme>,

    pub alpn_ids: Vec<Bytes>,

    pub record_size_limit: Option<u16>,

    /// Mint NewSessionTickets and accept resumption PSKs.
    pub accept_resumption: bool,

    /// Accept 0-RTT data under a resumed session. Requires
    /// 'accept_resumption'.
    pub accept_early_data: bool,

    /// Shared across every connection of the process; holds the ticket
    /// sealing key and the 0-RTT replay window.
    pub ticket_issuer: Option<Arc<TicketIssuer>>,

    /// How many tickets to mint after each successful handshake.
    pub tickets_to_send: usize,

    pub key_log: Option<Arc<dyn KeyLog>>,
}

impl ServerOptions {
    pub fn new(certificates: Vec<Bytes>, private_key: Arc<dyn Signer>) -> Self {
        Self {
            certificates,
            private_key,
            supported_cipher_suites: vec![
                CipherSuite::TLS_AES_128_GCM_SHA256,
                CipherSuite::TLS_AES_256_GCM_SHA384,
                CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
            ],
            supported_groups: vec![NamedGroup::x25519, NamedGroup::secp256r1],
            supported_signature_algorithms: vec![
                SignatureScheme::ecdsa_secp256r1_sha256,
                SignatureScheme::ecdsa_secp384r1_sha384,
                SignatureScheme::rsa_pss_rsae_sha256,
            ],
            alpn_ids: vec![],
            record_size_limit: None,
            accept_resumption: false,
            accept_early_data: false,
            ticket_issuer: None,
            tickets_to_send: 1,
            key_log: None,
        }
    }
}
