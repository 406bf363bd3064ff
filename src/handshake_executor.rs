use bytes::Bytes;
use log::debug;
use subtle::ConstantTimeEq;

use crate::alert::{AlertDescription, AlertLevel};
use crate::error::{Error, Result};
use crate::extensions::SignatureScheme;
use crate::handshake::{CertificateVerify, Finished, Handshake};
use crate::record_stream::{Message, RecordStream};
use crate::signatures::{verify_signature, PeerPublicKey, Signer};
use crate::transcript::Transcript;

const TLS13_CERTIFICATEVERIFY_CLIENT_CTX: &[u8] = b"TLS 1.3, client CertificateVerify";
const TLS13_CERTIFICATEVERIFY_SERVER_CTX: &[u8] = b"TLS 1.3, server CertificateVerify";

/// Common plumbing shared by the client and server handshake drivers.
pub(crate) struct HandshakeExecutor {
    pub stream: RecordStream,
    pub transcript: Transcript,
}

impl HandshakeExecutor {
    pub fn new(stream: RecordStream) -> Self {
        Self {
            stream,
            transcript: Transcript::new(),
        }
    }

    pub fn send_handshake_message(&mut self, handshake: Handshake) -> Result<()> {
        let transcript = &mut self.transcript;
        self.stream
            .writer
            .send_handshake(self.stream.transport.as_mut(), &handshake, Some(transcript))
    }

    /// Receives the next handshake message and appends it to the transcript.
    pub fn receive_handshake_message(&mut self) -> Result<Handshake> {
        let (msg, raw) = self.receive_handshake_message_raw()?;
        self.transcript.push(&raw);
        Ok(msg)
    }

    /// Receives the next handshake message without touching the transcript.
    /// The caller takes responsibility for appending the returned bytes.
    pub fn receive_handshake_message_raw(&mut self) -> Result<(Handshake, Bytes)> {
        loop {
            match self.stream.recv()? {
                Message::Handshake(m, raw) => {
                    return Ok((m, raw));
                }
                Message::ApplicationData(_) => {
                    return Err(Error::UnexpectedMessage(
                        "application data during the handshake",
                    ));
                }
                Message::Alert(alert) => {
                    debug!("alert during handshake: {:?}", alert);
                    if alert.description == AlertDescription::close_notify {
                        return Err(Error::CloseNotify);
                    }
                    if alert.level == AlertLevel::fatal {
                        return Err(Error::PeerAlert(alert.description));
                    }
                    // Warning alerts other than close_notify carry no
                    // semantics in TLS 1.3.
                    continue;
                }
            }
        }
    }

    /// Sends the alert matching 'error' (best effort) and hands the error
    /// back for propagation. A failed connection is terminal.
    pub fn abort(&mut self, error: Error) -> Error {
        self.stream.send_alert_for(&error);
        error
    }

    /// The content signed by a CertificateVerify: 64 spaces, a role specific
    /// context string, a zero byte, then the transcript hash.
    fn certificate_verify_content(server_context: bool, transcript_hash: &[u8]) -> Vec<u8> {
        let mut content = vec![0x20; 64];
        content.extend_from_slice(if server_context {
            TLS13_CERTIFICATEVERIFY_SERVER_CTX
        } else {
            TLS13_CERTIFICATEVERIFY_CLIENT_CTX
        });
        content.push(0);
        content.extend_from_slice(transcript_hash);
        content
    }

    /// Builds our CertificateVerify over the current transcript.
    pub fn create_certificate_verify(
        &self,
        is_server: bool,
        transcript_hash: &[u8],
        remote_supported_algorithms: &[SignatureScheme],
        private_key: &dyn Signer,
    ) -> Result<CertificateVerify> {
        let algorithm = private_key.scheme();
        if !remote_supported_algorithms.contains(&algorithm) {
            return Err(Error::HandshakeFailure(
                "peer does not accept our signature scheme",
            ));
        }

        let content = Self::certificate_verify_content(is_server, transcript_hash);
        let signature = private_key.sign(&content)?;

        Ok(CertificateVerify {
            algorithm,
            signature: Bytes::from(signature),
        })
    }

    /// Checks a received CertificateVerify. 'transcript_hash' must cover the
    /// transcript up to and including the Certificate message.
    pub fn check_certificate_verify(
        &self,
        peer_is_server: bool,
        transcript_hash: &[u8],
        cert_verify: &CertificateVerify,
        peer_public_key: &PeerPublicKey,
        local_supported_algorithms: &[SignatureScheme],
    ) -> Result<()> {
        if !local_supported_algorithms.contains(&cert_verify.algorithm) {
            return Err(Error::IllegalParameter(
                "certificate verify uses a non-advertised algorithm",
            ));
        }

        let content = Self::certificate_verify_content(peer_is_server, transcript_hash);
        verify_signature(
            cert_verify.algorithm,
            peer_public_key,
            &content,
            &cert_verify.signature,
        )
    }

    /// Receives a Finished message and compares it to the locally computed
    /// verify_data in constant time.
    pub fn receive_finished(&mut self, expected_verify_data: &[u8]) -> Result<Finished> {
        let finished = match self.receive_handshake_message()? {
            Handshake::Finished(f) => f,
            _ => return Err(Error::UnexpectedMessage("expected Finished")),
        };

        if finished.verify_data.ct_eq(expected_verify_data).unwrap_u8() != 1 {
            return Err(Error::DecryptError("Finished verify_data mismatch"));
        }

        Ok(finished)
    }
}
