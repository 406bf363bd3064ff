use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Buf, Bytes};
use log::debug;
use zeroize::Zeroizing;

use crate::alert::{Alert, AlertDescription, AlertLevel};
use crate::cipher_suite::CipherSuite;
use crate::error::{Error, Result};
use crate::handshake::{Handshake, KeyUpdate, KeyUpdateRequest, NewSessionTicket};
use crate::hkdf::HKDF;
use crate::key_schedule::{derive_ticket_psk, export_keying_material};
use crate::record_stream::{Message, RecordStream};
use crate::session::{ClientSession, ClientSessionStore};

/// Secrets a connection keeps after the handshake: enough to export keying
/// material and to absorb NewSessionTickets.
pub(crate) struct ConnectionSecrets {
    pub hkdf: HKDF,
    pub cipher_suite: CipherSuite,
    pub exporter_master_secret: Zeroizing<Vec<u8>>,
    pub resumption_master_secret: Zeroizing<Vec<u8>>,
}

/// An established TLS connection carrying application data.
///
/// Handles post-handshake messages (NewSessionTicket, KeyUpdate) that arrive
/// interleaved with application records.
pub struct ApplicationStream {
    stream: RecordStream,

    secrets: ConnectionSecrets,

    summary: crate::handshake_summary::HandshakeSummary,

    is_client: bool,

    /// Decrypted application bytes not yet handed to the caller. Early data
    /// the server accepted is seeded here.
    read_buffer: Bytes,

    recv_closed: bool,
    send_closed: bool,

    /// Set on any fatal error; a failed connection is inert.
    failed: bool,

    /// Client side ticket cache for tickets received on this connection.
    session_store: Option<Arc<dyn ClientSessionStore>>,
    server_name: String,
}

impl std::fmt::Debug for ApplicationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationStream")
            .field("is_client", &self.is_client)
            .field("recv_closed", &self.recv_closed)
            .field("send_closed", &self.send_closed)
            .field("failed", &self.failed)
            .field("server_name", &self.server_name)
            .finish()
    }
}

impl ApplicationStream {
    pub(crate) fn new(
        stream: RecordStream,
        secrets: ConnectionSecrets,
        summary: crate::handshake_summary::HandshakeSummary,
        is_client: bool,
        buffered_early_data: Bytes,
        session_store: Option<Arc<dyn ClientSessionStore>>,
        server_name: String,
    ) -> Self {
        Self {
            stream,
            secrets,
            summary,
            is_client,
            read_buffer: buffered_early_data,
            recv_closed: false,
            send_closed: false,
            failed: false,
            session_store,
            server_name,
        }
    }

    pub fn summary(&self) -> &crate::handshake_summary::HandshakeSummary {
        &self.summary
    }

    /// Reads decrypted application data. Returns 0 once the peer has sent
    /// close_notify.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.failed {
            return Err(Error::InternalError("connection is failed"));
        }

        loop {
            if !self.read_buffer.is_empty() {
                let n = buf.len().min(self.read_buffer.len());
                buf[..n].copy_from_slice(&self.read_buffer[..n]);
                self.read_buffer.advance(n);
                return Ok(n);
            }

            if self.recv_closed {
                return Ok(0);
            }

            let msg = match self.stream.recv() {
                Ok(v) => v,
                Err(e) => {
                    self.failed = true;
                    self.stream.send_alert_for(&e);
                    return Err(e);
                }
            };

            match msg {
                Message::ApplicationData(data) => {
                    self.read_buffer = data;
                }
                Message::Handshake(m, _raw) => {
                    if let Err(e) = self.handle_post_handshake_message(m) {
                        self.failed = true;
                        self.stream.send_alert_for(&e);
                        return Err(e);
                    }
                }
                Message::Alert(alert) => {
                    if alert.description == AlertDescription::close_notify {
                        // Shutdown of the receive direction only; we may
                        // still flush and send our own close_notify.
                        self.recv_closed = true;
                        return Ok(0);
                    }
                    if alert.level == AlertLevel::fatal {
                        self.failed = true;
                        return Err(Error::PeerAlert(alert.description));
                    }
                    debug!("ignoring warning alert: {:?}", alert);
                }
            }
        }
    }

    /// Writes application data, fragmenting into records as needed.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.failed {
            return Err(Error::InternalError("connection is failed"));
        }
        if self.send_closed {
            return Err(Error::InternalError("write after close"));
        }

        // Rekey rather than let the sequence number be exhausted.
        if self.stream.writer.at_sequence_limit() {
            self.key_update(false)?;
        }

        self.stream.send_application_data(buf)?;
        Ok(buf.len())
    }

    /// Sends close_notify. The peer may still be read until its own
    /// close_notify arrives.
    pub fn close(&mut self) -> Result<()> {
        if self.send_closed {
            return Ok(());
        }
        self.send_closed = true;
        self.stream.send_alert(Alert {
            level: AlertLevel::warning,
            description: AlertDescription::close_notify,
        })
    }

    /// Rotates our sending keys, optionally asking the peer to rotate
    /// theirs too.
    pub fn key_update(&mut self, request_peer_update: bool) -> Result<()> {
        let request_update = if request_peer_update {
            KeyUpdateRequest::update_requested
        } else {
            KeyUpdateRequest::update_not_requested
        };

        // The KeyUpdate itself travels under the old key.
        let transport = self.stream.transport.as_mut();
        self.stream.writer.send_handshake(
            transport,
            &Handshake::KeyUpdate(KeyUpdate { request_update }),
            None,
        )?;
        self.stream.writer.update_local_key()
    }

    /// RFC 8446 section 7.5 exporter interface.
    pub fn export_keying_material(
        &self,
        label: &[u8],
        context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>> {
        export_keying_material(
            &self.secrets.hkdf,
            &self.secrets.exporter_master_secret,
            label,
            context,
            length,
        )
    }

    fn handle_post_handshake_message(&mut self, msg: Handshake) -> Result<()> {
        match msg {
            Handshake::NewSessionTicket(ticket) => {
                if !self.is_client {
                    return Err(Error::UnexpectedMessage(
                        "NewSessionTicket sent toward the server",
                    ));
                }
                self.process_new_session_ticket(ticket)
            }
            Handshake::KeyUpdate(key_update) => {
                self.stream.reader.update_remote_key()?;
                if key_update.request_update == KeyUpdateRequest::update_requested {
                    // Acknowledge before any further application data is
                    // sent under our current keys.
                    self.key_update(false)?;
                }
                Ok(())
            }
            _ => Err(Error::UnexpectedMessage(
                "handshake message after the handshake completed",
            )),
        }
    }

    fn process_new_session_ticket(&mut self, ticket: NewSessionTicket) -> Result<()> {
        // A lifetime of zero means the ticket must not be stored; the cap is
        // seven days (RFC 8446 section 4.6.1).
        let lifetime = ticket.ticket_lifetime.min(604800);
        if lifetime == 0 {
            return Ok(());
        }

        let store = match &self.session_store {
            Some(v) => v.clone(),
            None => return Ok(()),
        };

        let psk = derive_ticket_psk(
            &self.secrets.hkdf,
            &self.secrets.resumption_master_secret,
            &ticket.ticket_nonce,
        )?;

        debug!("storing session ticket for {}", self.server_name);
        store.put(
            &self.server_name,
            ClientSession {
                ticket: ticket.ticket.clone(),
                psk,
                cipher_suite: self.secrets.cipher_suite,
                lifetime_seconds: lifetime,
                age_add: ticket.ticket_age_add,
                issued_at: SystemTime::now(),
                max_early_data_size: ticket.max_early_data_size(),
            },
        );
        Ok(())
    }
}
