use std::collections::HashMap;
use std::time::SystemTime;

use bytes::Bytes;
use log::debug;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::application_stream::{ApplicationStream, ConnectionSecrets};
use crate::cipher::CipherEndpointSpec;
use crate::cipher_suite::CipherSuiteParts;
use crate::error::{Error, Result};
use crate::extensions::*;
use crate::extensions_util::*;
use crate::handshake::*;
use crate::handshake_executor::HandshakeExecutor;
use crate::handshake_summary::HandshakeSummary;
use crate::key_schedule::KeySchedule;
use crate::options::ClientOptions;
use crate::record::{TLS_1_2_VERSION, TLS_1_3_VERSION};
use crate::record_stream::RecordStream;
use crate::session::ClientSession;
use crate::transport::Transport;

pub struct Client {}

impl Client {
    /// Runs a full handshake as the initiator and returns the established
    /// connection.
    pub fn connect(
        transport: Box<dyn Transport>,
        options: &ClientOptions,
    ) -> Result<ApplicationStream> {
        let executor = ClientHandshakeExecutor::new(transport, options)?;
        executor.run()
    }
}

/// Performs the handshake for a single connection from the client point of
/// view.
struct ClientHandshakeExecutor<'a> {
    executor: HandshakeExecutor,

    options: &'a ClientOptions,

    /// (EC)DHE secrets offered to the server in the last ClientHello sent.
    secrets: HashMap<NamedGroup, Zeroizing<Vec<u8>>>,

    /// The ClientHello as last sent, kept for the HelloRetryRequest rebuild.
    hello: Option<ClientHello>,

    /// Session being offered for resumption, if any.
    session: Option<ClientSession>,

    /// Key schedule carrying the PSK early secret, alive from ClientHello
    /// construction until the ServerHello settles PSK acceptance.
    early_key_schedule: Option<KeySchedule>,

    client_random: Bytes,

    offered_early_data: bool,
    early_accepted: bool,
    sent_ccs: bool,

    summary: HandshakeSummary,
}

impl<'a> ClientHandshakeExecutor<'a> {
    fn new(
        transport: Box<dyn Transport>,
        options: &'a ClientOptions,
    ) -> Result<ClientHandshakeExecutor<'a>> {
        let mut random = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut random);

        Ok(ClientHandshakeExecutor {
            executor: HandshakeExecutor::new(RecordStream::new(transport, false)),
            options,
            secrets: HashMap::new(),
            hello: None,
            session: None,
            early_key_schedule: None,
            client_random: Bytes::from(random),
            offered_early_data: false,
            early_accepted: false,
            sent_ccs: false,
            summary: HandshakeSummary::default(),
        })
    }

    fn run(mut self) -> Result<ApplicationStream> {
        match self.run_inner() {
            Ok(stream) => Ok(stream),
            Err(e) => Err(self.executor.abort(e)),
        }
    }

    fn run_inner(&mut self) -> Result<ApplicationStream> {
        self.take_session();

        let hello = self.build_client_hello()?;
        self.hello = Some(hello);
        self.send_client_hello()?;

        if self.offered_early_data {
            // 'If offering early data, the record is placed immediately
            // after the first ClientHello.'
            self.executor.stream.send_change_cipher_spec()?;
            self.sent_ccs = true;
            self.start_early_data()?;
        }

        let (server_hello, mut key_schedule, parts, psk_in_use) = self.wait_server_hello()?;
        let cipher_suite = server_hello.cipher_suite;
        self.summary.cipher_suite = Some(cipher_suite);
        self.summary.resumed = psk_in_use;

        let hs_secrets = key_schedule.handshake_traffic_secrets(&self.executor.transcript)?;
        key_schedule.master_secret()?;

        self.key_log(
            "CLIENT_HANDSHAKE_TRAFFIC_SECRET",
            &hs_secrets.client_handshake_traffic_secret,
        );
        self.key_log(
            "SERVER_HANDSHAKE_TRAFFIC_SECRET",
            &hs_secrets.server_handshake_traffic_secret,
        );

        self.executor
            .stream
            .reader
            .set_remote_cipher_spec(CipherEndpointSpec::new(
                parts.aead.box_clone(),
                parts.hkdf.clone(),
                hs_secrets.server_handshake_traffic_secret.clone(),
            )?)?;

        if !self.sent_ccs {
            // Dummy change_cipher_spec before the second flight.
            self.executor.stream.send_change_cipher_spec()?;
            self.sent_ccs = true;
        }

        if !self.offered_early_data {
            // With early data still in flight the send direction stays on
            // the early traffic key until EndOfEarlyData.
            self.install_send_key(&parts, &hs_secrets.client_handshake_traffic_secret)?;
        }

        self.wait_encrypted_extensions(&parts, &hs_secrets.client_handshake_traffic_secret)?;

        let mut cert_request = None;
        if !psk_in_use {
            // Optionally a CertificateRequest, then the server certificate.
            let cert = loop {
                match self.executor.receive_handshake_message()? {
                    Handshake::CertificateRequest(req) => {
                        if cert_request.is_some() {
                            return Err(Error::UnexpectedMessage(
                                "multiple certificate requests",
                            ));
                        }
                        cert_request = Some(req);
                    }
                    Handshake::Certificate(c) => break c,
                    _ => {
                        return Err(Error::UnexpectedMessage("expected Certificate"));
                    }
                }
            };

            if !cert.certificate_request_context.is_empty() {
                return Err(Error::IllegalParameter(
                    "server certificate carries a request context",
                ));
            }
            if cert.certificate_list.is_empty() {
                return Err(Error::BadCertificate("empty certificate chain"));
            }

            let chain: Vec<Bytes> = cert
                .certificate_list
                .iter()
                .map(|e| e.cert.clone())
                .collect();
            let server_name = if self.options.hostname.is_empty() {
                None
            } else {
                Some(self.options.hostname.as_str())
            };
            let peer_key = self.options.certificate_verifier.verify(
                &chain,
                server_name,
                SystemTime::now(),
            )?;

            // The signature covers the transcript through the Certificate.
            let ch_ct_hash = self.executor.transcript.hash(parts.hash);
            let cert_verify = match self.executor.receive_handshake_message()? {
                Handshake::CertificateVerify(cv) => cv,
                _ => return Err(Error::UnexpectedMessage("expected CertificateVerify")),
            };
            self.executor.check_certificate_verify(
                true,
                &ch_ct_hash,
                &cert_verify,
                &peer_key,
                &self.options.supported_signature_algorithms,
            )?;
        }

        let expected_server_verify = key_schedule.verify_data_server(&self.executor.transcript)?;
        self.executor.receive_finished(&expected_server_verify)?;

        let final_secrets = key_schedule.server_finished(&self.executor.transcript)?;

        if self.early_accepted {
            // Closes the early data stream; still protected under the early
            // traffic key, then the send direction moves to handshake keys.
            self.executor
                .send_handshake_message(Handshake::EndOfEarlyData)?;
            self.install_send_key(&parts, &hs_secrets.client_handshake_traffic_secret)?;
            self.summary.early_data_accepted = true;
        }

        if let Some(req) = cert_request {
            // We have no client certificate; answer with an empty chain.
            self.executor
                .send_handshake_message(Handshake::Certificate(Certificate {
                    certificate_request_context: req.certificate_request_context,
                    certificate_list: vec![],
                }))?;
        }

        let verify_data_client = key_schedule.verify_data_client(&self.executor.transcript)?;
        self.executor
            .send_handshake_message(Handshake::Finished(Finished {
                verify_data: Bytes::from(verify_data_client),
            }))?;

        let resumption_master_secret =
            key_schedule.resumption_master_secret(&self.executor.transcript)?;

        self.executor
            .stream
            .reader
            .replace_remote_key(final_secrets.server_application_traffic_secret_0.clone())?;
        self.executor
            .stream
            .writer
            .replace_local_key(final_secrets.client_application_traffic_secret_0.clone())?;

        self.key_log(
            "CLIENT_TRAFFIC_SECRET_0",
            &final_secrets.client_application_traffic_secret_0,
        );
        self.key_log(
            "SERVER_TRAFFIC_SECRET_0",
            &final_secrets.server_application_traffic_secret_0,
        );
        self.key_log("EXPORTER_SECRET", &final_secrets.exporter_master_secret);

        self.executor.transcript.clear();

        let stream = std::mem::replace(
            &mut self.executor.stream,
            RecordStream::new(Box::new(ClosedTransport), false),
        );

        Ok(ApplicationStream::new(
            stream,
            ConnectionSecrets {
                hkdf: parts.hkdf.clone(),
                cipher_suite,
                exporter_master_secret: final_secrets.exporter_master_secret,
                resumption_master_secret,
            },
            std::mem::take(&mut self.summary),
            true,
            Bytes::new(),
            self.options.session_store.clone(),
            self.options.hostname.clone(),
        ))
    }

    /// Pulls a resumable session out of the store, discarding unusable ones.
    fn take_session(&mut self) {
        let store = match &self.options.session_store {
            Some(v) => v,
            None => return,
        };
        if self.options.hostname.is_empty() {
            return;
        }

        if let Some(session) = store.take(&self.options.hostname) {
            let usable = !session.expired(SystemTime::now())
                && self
                    .options
                    .supported_cipher_suites
                    .contains(&session.cipher_suite)
                && session.cipher_suite.decode().is_ok();
            if usable {
                self.offered_early_data = self.options.early_data.is_some()
                    && session.max_early_data_size > 0;
                self.session = Some(session);
            }
        }
    }

    /// Generates a new random secret key and returns the corresponding
    /// public share to offer the server.
    fn new_secret(&mut self, group: NamedGroup) -> Result<KeyShareEntry> {
        let inst = group
            .create()
            .ok_or(Error::InternalError("NamedGroup not supported"))?;

        let secret_value = Zeroizing::new(inst.secret_value()?);
        let entry = KeyShareEntry {
            group,
            key_exchange: Bytes::from(inst.public_value(&secret_value)?),
        };

        self.secrets.insert(group, secret_value);
        Ok(entry)
    }

    fn build_client_hello(&mut self) -> Result<ClientHello> {
        let mut extensions = vec![];

        if !self.options.hostname.is_empty() {
            extensions.push(Extension::ServerName(Some(ServerNameList {
                names: vec![ServerName {
                    typ: NameType::host_name,
                    data: Bytes::from(self.options.hostname.clone().into_bytes()),
                }],
            })));
        }

        // Required to be sent in every ClientHello.
        extensions.push(Extension::SupportedVersionsClientHello(
            SupportedVersionsClientHello {
                versions: vec![TLS_1_3_VERSION],
            },
        ));

        extensions.push(Extension::SupportedGroups(NamedGroupList {
            groups: self.options.supported_groups.clone(),
        }));

        extensions.push(Extension::SignatureAlgorithms(SignatureSchemeList {
            algorithms: self.options.supported_signature_algorithms.clone(),
        }));

        if let Some(limit) = self.options.record_size_limit {
            extensions.push(Extension::RecordSizeLimit(limit));
        }

        if !self.options.alpn_ids.is_empty() {
            extensions.push(Extension::ALPN(ProtocolNameList {
                names: self.options.alpn_ids.clone(),
            }));
        }

        let mut client_shares = vec![];
        for group in self.options.initial_keys_shared.iter().cloned() {
            client_shares.push(self.new_secret(group)?);
        }
        extensions.push(Extension::KeyShareClientHello(KeyShareClientHello {
            client_shares,
        }));

        if self.session.is_some() {
            extensions.push(Extension::PskKeyExchangeModes(PskKeyExchangeModes {
                modes: vec![
                    PskKeyExchangeMode::psk_dhe_ke,
                    PskKeyExchangeMode::psk_ke,
                ],
            }));

            if self.offered_early_data {
                extensions.push(Extension::EarlyData);
            }

            // pre_shared_key is appended by send_client_hello; it must
            // always be the last extension.
        }

        // A non-empty legacy session id puts middleboxes in compatibility
        // mode.
        let mut session_id = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut session_id);

        Ok(ClientHello {
            legacy_version: TLS_1_2_VERSION,
            random: self.client_random.clone(),
            legacy_session_id: Bytes::from(session_id),
            cipher_suites: self.options.supported_cipher_suites.clone(),
            legacy_compression_methods: Bytes::from_static(&[0]),
            extensions,
        })
    }

    /// Serializes and sends the current ClientHello. When a PSK is offered
    /// this is a two pass construction: serialize with zeroed binders,
    /// compute the real binders over the truncated message, then patch them
    /// in place before the bytes hit the wire.
    fn send_client_hello(&mut self) -> Result<()> {
        let mut hello = self.hello.clone().unwrap();

        let session = match &self.session {
            Some(session) => session,
            None => {
                let msg = Handshake::ClientHello(hello);
                return self.executor.send_handshake_message(msg);
            }
        };

        let parts = session.cipher_suite.decode()?;
        let hash_len = parts.hash.output_size();

        let offered = OfferedPsks {
            identities: vec![PskIdentity {
                identity: session.ticket.clone(),
                obfuscated_ticket_age: session.obfuscated_ticket_age(SystemTime::now()),
            }],
            binders: vec![Bytes::from(vec![0u8; hash_len])],
        };
        let binders_len = offered.binders_encoded_len();

        hello
            .extensions
            .retain(|e| !matches!(e, Extension::PreSharedKeyClientHello(_)));
        hello
            .extensions
            .push(Extension::PreSharedKeyClientHello(offered));

        let mut data = vec![];
        Handshake::ClientHello(hello.clone()).serialize(&mut data);

        // Early secret and binder key depend only on the PSK; reuse the
        // schedule across a HelloRetryRequest rebuild.
        if self.early_key_schedule.is_none() {
            let mut ks = KeySchedule::new(parts.hkdf.clone(), parts.hash);
            ks.early_secret(Some(&session.psk));
            self.early_key_schedule = Some(ks);
        }
        let ks = self.early_key_schedule.as_ref().unwrap();

        let truncated = &data[..data.len() - binders_len];
        let truncated_hash = self
            .executor
            .transcript
            .hash_with(parts.hash, truncated);
        let binder = ks.psk_binder(&ks.binder_key(false)?, &truncated_hash)?;

        let n = data.len();
        data[n - hash_len..].copy_from_slice(&binder);

        self.hello = Some(hello);

        let transcript = &mut self.executor.transcript;
        self.executor
            .stream
            .send_handshake_bytes(&data, Some(transcript))
    }

    /// Sends the configured 0-RTT data under the client early traffic
    /// secret, derived from the PSK and the first ClientHello alone.
    fn start_early_data(&mut self) -> Result<()> {
        let session = self.session.as_ref().unwrap();
        let parts = session.cipher_suite.decode()?;
        let ks = self.early_key_schedule.as_ref().unwrap();

        let ch_hash = self.executor.transcript.hash(parts.hash);
        let early_secret = ks.client_early_traffic_secret(&ch_hash)?;
        self.key_log("CLIENT_EARLY_TRAFFIC_SECRET", &early_secret);

        self.executor.stream.writer.local_cipher_spec = Some(CipherEndpointSpec::new(
            parts.aead.box_clone(),
            parts.hkdf.clone(),
            early_secret,
        )?);

        let data = self.options.early_data.clone().unwrap();
        let max = session.max_early_data_size as usize;
        if data.len() > max {
            return Err(Error::InternalError(
                "early data larger than the ticket allows",
            ));
        }

        debug!("sending {} bytes of early data", data.len());
        self.executor.stream.send_application_data(&data)
    }

    fn install_send_key(
        &mut self,
        parts: &CipherSuiteParts,
        traffic_secret: &Zeroizing<Vec<u8>>,
    ) -> Result<()> {
        self.executor.stream.writer.local_cipher_spec = Some(CipherEndpointSpec::new(
            parts.aead.box_clone(),
            parts.hkdf.clone(),
            traffic_secret.clone(),
        )?);
        Ok(())
    }

    /// Waits for a usable ServerHello, retrying the ClientHello once if the
    /// server answers with a HelloRetryRequest.
    fn wait_server_hello(
        &mut self,
    ) -> Result<(ServerHello, KeySchedule, CipherSuiteParts, bool)> {
        let mut last_retry: Option<ServerHello> = None;

        loop {
            let (msg, raw) = self.executor.receive_handshake_message_raw()?;
            let server_hello = match msg {
                Handshake::ServerHello(sh) => sh,
                _ => {
                    return Err(Error::UnexpectedMessage("expected ServerHello"));
                }
            };

            if server_hello.legacy_version != TLS_1_2_VERSION {
                return Err(Error::ProtocolVersion);
            }
            if server_hello.legacy_compression_method != 0 {
                return Err(Error::IllegalParameter("non-zero compression method"));
            }

            let hello = self.hello.as_ref().unwrap();
            if server_hello.legacy_session_id_echo != hello.legacy_session_id {
                return Err(Error::IllegalParameter("legacy_session_id echo mismatch"));
            }
            if !self
                .options
                .supported_cipher_suites
                .contains(&server_hello.cipher_suite)
            {
                return Err(Error::IllegalParameter(
                    "server selected a cipher suite we didn't offer",
                ));
            }

            let selected_version = find_supported_versions_sh(&server_hello.extensions)
                .map(|v| v.selected_version);
            if selected_version != Some(TLS_1_3_VERSION) {
                return Err(Error::ProtocolVersion);
            }

            if server_hello.is_hello_retry() {
                if last_retry.is_some() {
                    return Err(Error::UnexpectedMessage("second HelloRetryRequest"));
                }

                // The transcript restarts from the hash of ClientHello1,
                // then the HelloRetryRequest itself.
                let parts = server_hello.cipher_suite.decode()?;
                self.executor.transcript.rewrite_for_hello_retry(parts.hash);
                self.executor.transcript.push(&raw);

                self.retry_client_hello(&server_hello)?;
                last_retry = Some(server_hello);
                continue;
            }

            self.executor.transcript.push(&raw);

            if let Some(retry) = &last_retry {
                if retry.cipher_suite != server_hello.cipher_suite {
                    return Err(Error::IllegalParameter(
                        "cipher suite changed after HelloRetryRequest",
                    ));
                }
            }

            let parts = server_hello.cipher_suite.decode()?;

            // PSK acceptance.
            let psk_in_use = match find_pre_shared_key_sh(&server_hello.extensions) {
                Some(selected_identity) => {
                    if self.session.is_none() || selected_identity != 0 {
                        return Err(Error::IllegalParameter(
                            "server selected a PSK we didn't offer",
                        ));
                    }
                    true
                }
                None => false,
            };

            let mut key_schedule = if psk_in_use {
                let ks = self.early_key_schedule.take().unwrap();
                if ks.hash() != parts.hash {
                    return Err(Error::IllegalParameter(
                        "PSK resumed with an incompatible hash",
                    ));
                }
                ks
            } else {
                self.early_key_schedule = None;
                let mut ks = KeySchedule::new(parts.hkdf.clone(), parts.hash);
                ks.early_secret(None);
                ks
            };

            // (EC)DHE share, absent only for pure PSK key establishment.
            let shared_secret = match find_key_share_sh(&server_hello.extensions) {
                Some(ks_ext) => {
                    let share = &ks_ext.server_share;
                    if let Some(retry) = &last_retry {
                        let selected =
                            find_key_share_retry(&retry.extensions).map(|e| e.selected_group);
                        if selected.is_some() && selected != Some(share.group) {
                            return Err(Error::IllegalParameter(
                                "key share group differs from HelloRetryRequest selection",
                            ));
                        }
                    }

                    let local_secret = self.secrets.get(&share.group).ok_or(
                        Error::IllegalParameter(
                            "server key share for a group we didn't offer",
                        ),
                    )?;
                    let group = share
                        .group
                        .create()
                        .ok_or(Error::InternalError("group disappeared"))?;
                    Some(group.shared_secret(&share.key_exchange, local_secret)?)
                }
                None => {
                    if !psk_in_use {
                        return Err(Error::IllegalParameter(
                            "ServerHello without key_share or pre_shared_key",
                        ));
                    }
                    None
                }
            };

            key_schedule.handshake_secret(shared_secret.as_deref())?;

            return Ok((server_hello, key_schedule, parts, psk_in_use));
        }
    }

    /// Applies RFC 8446 section 4.1.2: the second ClientHello is the first
    /// one with the key share replaced, early data dropped, and any cookie
    /// echoed.
    fn retry_client_hello(&mut self, retry: &ServerHello) -> Result<()> {
        let selected_group = find_key_share_retry(&retry.extensions).map(|e| e.selected_group);
        let cookie = find_cookie(&retry.extensions).cloned();

        if selected_group.is_none() && cookie.is_none() {
            return Err(Error::IllegalParameter(
                "HelloRetryRequest carries neither key_share nor cookie",
            ));
        }

        let mut hello = self.hello.take().unwrap();
        hello.extensions.retain(|e| {
            !matches!(
                e,
                Extension::EarlyData | Extension::Cookie(_) | Extension::PreSharedKeyClientHello(_)
            )
        });

        if let Some(selected_group) = selected_group {
            if self.secrets.contains_key(&selected_group) {
                return Err(Error::IllegalParameter(
                    "HelloRetryRequest selected a group we already offered",
                ));
            }
            if !self.options.supported_groups.contains(&selected_group) {
                return Err(Error::IllegalParameter(
                    "HelloRetryRequest selected a group we don't support",
                ));
            }

            // The server rejected the shares it saw; don't let it backtrack.
            self.secrets.clear();
            let new_share = self.new_secret(selected_group)?;

            hello
                .extensions
                .retain(|e| !matches!(e, Extension::KeyShareClientHello(_)));
            hello
                .extensions
                .push(Extension::KeyShareClientHello(KeyShareClientHello {
                    client_shares: vec![new_share],
                }));
        }

        if let Some(cookie) = cookie {
            hello.extensions.push(Extension::Cookie(cookie));
        }

        // Early data is implicitly rejected by a HelloRetryRequest; the
        // second flight goes back on the wire unprotected.
        if self.offered_early_data {
            self.offered_early_data = false;
            self.executor.stream.writer.local_cipher_spec = None;
        }

        self.hello = Some(hello);
        self.send_client_hello()
    }

    fn wait_encrypted_extensions(
        &mut self,
        parts: &CipherSuiteParts,
        client_hs_secret: &Zeroizing<Vec<u8>>,
    ) -> Result<()> {
        let ee = match self.executor.receive_handshake_message()? {
            Handshake::EncryptedExtensions(e) => e,
            _ => {
                return Err(Error::UnexpectedMessage("expected EncryptedExtensions"));
            }
        };

        for e in &ee.extensions {
            match e {
                Extension::ALPN(protocols) => {
                    if protocols.names.len() != 1
                        || !self.options.alpn_ids.contains(&protocols.names[0])
                    {
                        return Err(Error::IllegalParameter(
                            "server ALPN selection was not offered",
                        ));
                    }
                    self.summary.selected_alpn_protocol = Some(protocols.names[0].clone());
                }
                Extension::RecordSizeLimit(limit) => {
                    self.executor
                        .stream
                        .writer
                        .set_peer_record_size_limit(*limit as usize);
                }
                Extension::EarlyData => {
                    if !self.offered_early_data {
                        return Err(Error::IllegalParameter(
                            "early data accepted but never offered",
                        ));
                    }
                    self.early_accepted = true;
                }
                Extension::ServerName(v) => {
                    if v.is_some() {
                        return Err(Error::IllegalParameter(
                            "server echoed a non-empty server_name",
                        ));
                    }
                }
                _ => {}
            }
        }

        if self.offered_early_data && !self.early_accepted {
            // Rejected: no EndOfEarlyData will be sent, move the send
            // direction onto the handshake key now.
            debug!("server rejected 0-RTT data");
            self.install_send_key(parts, client_hs_secret)?;
        }

        Ok(())
    }

    fn key_log(&self, label: &str, secret: &[u8]) {
        if let Some(log) = &self.options.key_log {
            log.log(label, &self.client_random, secret);
        }
    }
}

/// Placeholder transport left behind once the real one moves into the
/// ApplicationStream.
pub(crate) struct ClosedTransport;

impl std::io::Read for ClosedTransport {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::NotConnected.into())
    }
}

impl std::io::Write for ClosedTransport {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::NotConnected.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
