use thiserror::Error;

use crate::alert::AlertDescription;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Every failure mode of a connection. Variants that are triggered by peer
/// misbehavior map to the alert we send before tearing the connection down.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed syntax: truncated vector, out of range length, trailing
    /// bytes inside a declared length field.
    #[error("malformed message: {0}")]
    Decode(&'static str),

    /// Not enough input yet to finish parsing. Only meaningful inside the
    /// record layer while reassembling handshake messages; it must never
    /// escape to the application.
    #[error("incomplete input")]
    Incomplete,

    #[error("unexpected message: {0}")]
    UnexpectedMessage(&'static str),

    /// AEAD open failure. The connection is irrecoverably failed.
    #[error("bad record mac")]
    BadRecordMac,

    #[error("record larger than protocol limit")]
    RecordOverflow,

    /// No common cipher suite / group / signature algorithm.
    #[error("handshake failure: {0}")]
    HandshakeFailure(&'static str),

    #[error("illegal parameter: {0}")]
    IllegalParameter(&'static str),

    #[error("bad certificate: {0}")]
    BadCertificate(&'static str),

    /// A PSK binder or Finished verify_data did not match.
    #[error("decrypt error: {0}")]
    DecryptError(&'static str),

    /// The peer did not offer / select TLS 1.3.
    #[error("unsupported protocol version")]
    ProtocolVersion,

    /// Key derivation or signer failure; never the peer's fault.
    #[error("internal error: {0}")]
    InternalError(&'static str),

    #[error("canceled by user")]
    UserCanceled,

    /// Graceful shutdown from the peer.
    #[error("close_notify received")]
    CloseNotify,

    /// The peer sent us a fatal alert.
    #[error("received fatal alert: {0:?}")]
    PeerAlert(AlertDescription),

    /// Transport failure. The connection is terminally failed; no alert is
    /// sent since the transport is gone.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Alert description to send to the peer before closing, if any.
    pub fn alert(&self) -> Option<AlertDescription> {
        Some(match self {
            Error::Decode(_) | Error::Incomplete => AlertDescription::decode_error,
            Error::UnexpectedMessage(_) => AlertDescription::unexpected_message,
            Error::BadRecordMac => AlertDescription::bad_record_mac,
            Error::RecordOverflow => AlertDescription::record_overflow,
            Error::HandshakeFailure(_) => AlertDescription::handshake_failure,
            Error::IllegalParameter(_) => AlertDescription::illegal_parameter,
            Error::BadCertificate(_) => AlertDescription::bad_certificate,
            Error::DecryptError(_) => AlertDescription::decrypt_error,
            Error::ProtocolVersion => AlertDescription::protocol_version,
            Error::InternalError(_) => AlertDescription::internal_error,
            Error::UserCanceled => AlertDescription::user_canceled,
            Error::CloseNotify => AlertDescription::close_notify,
            Error::PeerAlert(_) | Error::Io(_) => return None,
        })
    }

    pub(crate) fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete)
    }
}
