use bytes::Bytes;
use log::{debug, warn};

use crate::alert::{Alert, AlertDescription, AlertLevel};
use crate::cipher::CipherEndpointSpec;
use crate::error::{Error, Result};
use crate::handshake::Handshake;
use crate::parsing::complete;
use crate::record::*;
use crate::transcript::Transcript;
use crate::transport::Transport;

/// Maximum number of change_cipher_spec records we will silently discard
/// over the lifetime of a connection (middlebox compatibility mode).
const MAX_CHANGE_CIPHER_SPEC_DISCARDS: usize = 8;

/// One full message recovered from the record layer.
///
/// Handshake messages carry their raw wire bytes so the caller can feed the
/// transcript, which is not always append-only (HelloRetryRequest).
#[derive(Debug)]
pub enum Message {
    Alert(Alert),
    Handshake(Handshake, Bytes),
    /// Decrypted data directed at the application.
    ApplicationData(Bytes),
}

pub struct RecordReader {
    is_server: bool,

    received_first_record: bool,

    /// Cipher parameters used by the remote endpoint to encrypt records.
    /// Empty until the handshake installs keys; always set once the
    /// handshake is complete.
    remote_cipher_spec: Option<CipherEndpointSpec>,

    /// Bytes of a partial handshake message. Handshake messages may be
    /// coalesced into, or split across, multiple records.
    handshake_buffer: Vec<u8>,

    ccs_discards_left: usize,

    /// When the server rejects offered early data, this many bytes of
    /// undecryptable records are skipped while waiting for the client's
    /// second flight.
    trial_discard_budget: usize,
}

impl RecordReader {
    pub fn new(is_server: bool) -> Self {
        Self {
            is_server,
            received_first_record: false,
            remote_cipher_spec: None,
            handshake_buffer: vec![],
            ccs_discards_left: MAX_CHANGE_CIPHER_SPEC_DISCARDS,
            trial_discard_budget: 0,
        }
    }

    pub fn set_remote_cipher_spec(&mut self, remote_cipher_spec: CipherEndpointSpec) -> Result<()> {
        if !self.handshake_buffer.is_empty() {
            return Err(Error::UnexpectedMessage(
                "key change across a partial handshake message",
            ));
        }
        self.remote_cipher_spec = Some(remote_cipher_spec);
        Ok(())
    }

    pub fn replace_remote_key(&mut self, traffic_secret: zeroize::Zeroizing<Vec<u8>>) -> Result<()> {
        match self.remote_cipher_spec.as_mut() {
            Some(spec) => spec.replace_key(traffic_secret),
            None => Err(Error::InternalError("cipher spec not set yet")),
        }
    }

    /// Rotates the peer's sending key in response to a KeyUpdate.
    pub fn update_remote_key(&mut self) -> Result<()> {
        match self.remote_cipher_spec.as_mut() {
            Some(spec) => spec.update_key(),
            None => Err(Error::InternalError("cipher spec not set yet")),
        }
    }

    /// Allows up to 'budget' bytes of records that fail to decrypt, used to
    /// flush early data the server declined.
    pub fn skip_undecryptable(&mut self, budget: usize) {
        self.trial_discard_budget = budget;
    }

    /// Receives the next full message. A handshake message may span
    /// multiple records and is reassembled before being returned.
    pub fn recv(&mut self, transport: &mut dyn Transport) -> Result<Message> {
        loop {
            if !self.handshake_buffer.is_empty() {
                let buffered = Bytes::from(self.handshake_buffer.clone());
                match Handshake::parse(buffered.clone()) {
                    Ok((msg, rest)) => {
                        let consumed = buffered.len() - rest.len();
                        self.handshake_buffer = rest.to_vec();
                        return Ok(Message::Handshake(msg, buffered.slice(0..consumed)));
                    }
                    Err(e) if e.is_incomplete() => {}
                    Err(e) => return Err(e),
                }
            }

            let inner = self.recv_record(transport)?;

            match inner.typ {
                ContentType::Handshake => {
                    if inner.data.is_empty() {
                        return Err(Error::Decode("zero length handshake fragment"));
                    }
                    self.handshake_buffer.extend_from_slice(&inner.data);
                }
                ContentType::Alert => {
                    if !self.handshake_buffer.is_empty() {
                        return Err(Error::UnexpectedMessage(
                            "alert interleaved in a handshake message",
                        ));
                    }
                    let alert = complete(Alert::parse(inner.data))?;
                    return Ok(Message::Alert(alert));
                }
                ContentType::ApplicationData => {
                    if !self.handshake_buffer.is_empty() {
                        return Err(Error::UnexpectedMessage(
                            "application data interleaved in a handshake message",
                        ));
                    }
                    return Ok(Message::ApplicationData(inner.data));
                }
                _ => {
                    return Err(Error::UnexpectedMessage("unknown record content type"));
                }
            }
        }
    }

    fn recv_record(&mut self, transport: &mut dyn Transport) -> Result<RecordInner> {
        loop {
            let record = Record::read(transport)?;

            // Only the record containing the first ClientHello may use the
            // TLS 1.0 compatibility version.
            let version_ok = record.legacy_record_version == TLS_1_2_VERSION
                || (self.is_server
                    && !self.received_first_record
                    && record.legacy_record_version == TLS_1_0_VERSION);
            if !version_ok {
                return Err(Error::Decode("unexpected record version"));
            }

            self.received_first_record = true;

            if record.typ == ContentType::ChangeCipherSpec {
                // Silently dropped for middlebox compatibility, a bounded
                // number of times.
                if record.data.as_ref() != [0x01] {
                    return Err(Error::Decode("malformed change_cipher_spec"));
                }
                if self.ccs_discards_left == 0 {
                    return Err(Error::UnexpectedMessage("too many change_cipher_spec records"));
                }
                self.ccs_discards_left -= 1;
                continue;
            }

            match self.remote_cipher_spec.as_mut() {
                Some(cipher_spec) => {
                    if record.typ == ContentType::ApplicationData {
                        let size = record.data.len();
                        match cipher_spec.decrypt(record) {
                            Ok(inner) => {
                                self.trial_discard_budget = 0;
                                return Ok(inner);
                            }
                            Err(Error::BadRecordMac) if self.trial_discard_budget >= size => {
                                debug!("discarding undecryptable record of rejected early data");
                                self.trial_discard_budget -= size;
                                continue;
                            }
                            Err(e) => return Err(e),
                        }
                    }

                    // Plaintext alerts may still arrive from a peer that
                    // failed before installing keys.
                    if record.typ == ContentType::Alert {
                        warn!("received plaintext alert on a protected connection");
                        return Ok(RecordInner {
                            typ: record.typ,
                            data: record.data,
                        });
                    }

                    return Err(Error::UnexpectedMessage(
                        "plaintext record on a protected connection",
                    ));
                }
                None => {
                    if record.typ == ContentType::ApplicationData {
                        // Early data records may already be in flight when a
                        // HelloRetryRequest implicitly rejects them.
                        if self.trial_discard_budget >= record.data.len() {
                            debug!("discarding early data record sent before HelloRetryRequest");
                            self.trial_discard_budget -= record.data.len();
                            continue;
                        }
                        return Err(Error::UnexpectedMessage(
                            "application data before any keys were negotiated",
                        ));
                    }
                    return Ok(RecordInner {
                        typ: record.typ,
                        data: record.data,
                    });
                }
            }
        }
    }
}

pub struct RecordWriter {
    is_server: bool,

    sent_first_record: bool,

    pub local_cipher_spec: Option<CipherEndpointSpec>,

    /// Maximum inner plaintext size (content + content type byte) accepted
    /// by the peer, from its record_size_limit extension.
    peer_record_size_limit: usize,

    /// Extra zero padding added to every encrypted record.
    padding_policy: usize,
}

impl RecordWriter {
    pub fn new(is_server: bool) -> Self {
        Self {
            is_server,
            sent_first_record: false,
            local_cipher_spec: None,
            peer_record_size_limit: default_record_size_limit(),
            padding_policy: 0,
        }
    }

    pub fn replace_local_key(&mut self, traffic_secret: zeroize::Zeroizing<Vec<u8>>) -> Result<()> {
        match self.local_cipher_spec.as_mut() {
            Some(spec) => spec.replace_key(traffic_secret),
            None => Err(Error::InternalError("cipher spec not set yet")),
        }
    }

    pub fn update_local_key(&mut self) -> Result<()> {
        match self.local_cipher_spec.as_mut() {
            Some(spec) => spec.update_key(),
            None => Err(Error::InternalError("cipher spec not set yet")),
        }
    }

    pub fn at_sequence_limit(&self) -> bool {
        self.local_cipher_spec
            .as_ref()
            .map(|s| s.at_sequence_limit())
            .unwrap_or(false)
    }

    /// Applies the peer's record_size_limit to all future records.
    pub fn set_peer_record_size_limit(&mut self, limit: usize) {
        self.peer_record_size_limit = limit.min(default_record_size_limit());
    }

    /// Largest content fragment we may put in one record.
    fn max_fragment_size(&self) -> usize {
        // One byte of the limit is consumed by the inner content type.
        MAX_PLAINTEXT_SIZE.min(self.peer_record_size_limit - 1)
    }

    pub fn send_handshake(
        &mut self,
        transport: &mut dyn Transport,
        msg: &Handshake,
        transcript: Option<&mut Transcript>,
    ) -> Result<()> {
        let mut data = vec![];
        msg.serialize(&mut data);

        if let Some(transcript) = transcript {
            transcript.push(&data);
        }

        // Handshake messages larger than a record are split across records.
        for chunk in data.chunks(self.max_fragment_size()) {
            self.send_record(
                transport,
                RecordInner {
                    typ: ContentType::Handshake,
                    data: Bytes::copy_from_slice(chunk),
                },
            )?;
        }
        Ok(())
    }

    /// Raw pre-serialized handshake bytes; used when re-sending a
    /// ClientHello whose binders were patched in place.
    pub fn send_handshake_bytes(
        &mut self,
        transport: &mut dyn Transport,
        data: &[u8],
        transcript: Option<&mut Transcript>,
    ) -> Result<()> {
        if let Some(transcript) = transcript {
            transcript.push(data);
        }

        for chunk in data.chunks(self.max_fragment_size()) {
            self.send_record(
                transport,
                RecordInner {
                    typ: ContentType::Handshake,
                    data: Bytes::copy_from_slice(chunk),
                },
            )?;
        }
        Ok(())
    }

    /// Dummy message for middlebox compatibility; always sent unprotected.
    pub fn send_change_cipher_spec(&mut self, transport: &mut dyn Transport) -> Result<()> {
        let record = Record {
            typ: ContentType::ChangeCipherSpec,
            legacy_record_version: TLS_1_2_VERSION,
            data: Bytes::from_static(&[0x01]),
        };
        let mut record_data = vec![];
        record.serialize(&mut record_data);
        self.sent_first_record = true;
        transport.write_all(&record_data)
    }

    pub fn send_application_data(
        &mut self,
        transport: &mut dyn Transport,
        data: &[u8],
    ) -> Result<()> {
        for chunk in data.chunks(self.max_fragment_size()) {
            self.send_record(
                transport,
                RecordInner {
                    typ: ContentType::ApplicationData,
                    data: Bytes::copy_from_slice(chunk),
                },
            )?;
        }
        Ok(())
    }

    pub fn send_alert(&mut self, transport: &mut dyn Transport, alert: Alert) -> Result<()> {
        debug!("sending alert: {:?}", alert);
        let mut data = vec![];
        alert.serialize(&mut data);
        self.send_record(
            transport,
            RecordInner {
                typ: ContentType::Alert,
                data: data.into(),
            },
        )
    }

    pub fn send_fatal_alert(
        &mut self,
        transport: &mut dyn Transport,
        description: AlertDescription,
    ) -> Result<()> {
        let level = if description == AlertDescription::close_notify
            || description == AlertDescription::user_canceled
        {
            AlertLevel::warning
        } else {
            AlertLevel::fatal
        };
        self.send_alert(transport, Alert { level, description })
    }

    fn send_record(&mut self, transport: &mut dyn Transport, inner: RecordInner) -> Result<()> {
        // rfc8446: 'a record containing an initial ClientHello SHOULD have
        // version 0x0301 and a record containing a second ClientHello or a
        // ServerHello MUST have version 0x0303'
        let legacy_record_version = if !self.is_server && !self.sent_first_record {
            TLS_1_0_VERSION
        } else {
            TLS_1_2_VERSION
        };

        let record = match self.local_cipher_spec.as_mut() {
            Some(cipher_spec) => {
                // Padding must also respect the peer's record size limit.
                let space = (self.peer_record_size_limit - 1).saturating_sub(inner.data.len());
                cipher_spec.encrypt(inner, self.padding_policy.min(space))?
            }
            None => {
                if inner.typ == ContentType::ApplicationData {
                    return Err(Error::InternalError(
                        "refusing to send unencrypted application data",
                    ));
                }
                Record {
                    typ: inner.typ,
                    legacy_record_version,
                    data: inner.data,
                }
            }
        };

        self.sent_first_record = true;

        let mut record_data = vec![];
        record.serialize(&mut record_data);
        transport.write_all(&record_data)
    }
}

/// The record layer for one connection: the transport plus the cipher state
/// of both directions.
pub struct RecordStream {
    pub transport: Box<dyn Transport>,
    pub reader: RecordReader,
    pub writer: RecordWriter,
}

impl RecordStream {
    pub fn new(transport: Box<dyn Transport>, is_server: bool) -> Self {
        Self {
            transport,
            reader: RecordReader::new(is_server),
            writer: RecordWriter::new(is_server),
        }
    }

    pub fn recv(&mut self) -> Result<Message> {
        self.reader.recv(self.transport.as_mut())
    }

    pub fn send_handshake(
        &mut self,
        msg: &Handshake,
        transcript: Option<&mut Transcript>,
    ) -> Result<()> {
        self.writer
            .send_handshake(self.transport.as_mut(), msg, transcript)
    }

    pub fn send_handshake_bytes(
        &mut self,
        data: &[u8],
        transcript: Option<&mut Transcript>,
    ) -> Result<()> {
        self.writer
            .send_handshake_bytes(self.transport.as_mut(), data, transcript)
    }

    pub fn send_change_cipher_spec(&mut self) -> Result<()> {
        self.writer.send_change_cipher_spec(self.transport.as_mut())
    }

    pub fn send_application_data(&mut self, data: &[u8]) -> Result<()> {
        self.writer
            .send_application_data(self.transport.as_mut(), data)
    }

    pub fn send_alert(&mut self, alert: Alert) -> Result<()> {
        self.writer.send_alert(self.transport.as_mut(), alert)
    }

    /// Best-effort alert for the error we are about to fail with.
    pub fn send_alert_for(&mut self, error: &Error) {
        if let Some(description) = error.alert() {
            let _ = self
                .writer
                .send_fatal_alert(self.transport.as_mut(), description);
        }
    }
}
