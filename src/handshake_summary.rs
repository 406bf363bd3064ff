use bytes::Bytes;

use crate::cipher_suite::CipherSuite;

/// Interesting facts collected during the handshake.
#[derive(Default)]
pub struct HandshakeSummary {
    pub cipher_suite: Option<CipherSuite>,

    /// If ALPN ids were offered, which one the server selected.
    pub selected_alpn_protocol: Option<Bytes>,

    /// Whether the handshake resumed a prior session via PSK.
    pub resumed: bool,

    /// Whether 0-RTT data was sent (client) or read (server) under the
    /// early traffic keys.
    pub early_data_accepted: bool,
}
