use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use log::debug;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::application_stream::{ApplicationStream, ConnectionSecrets};
use crate::cipher::CipherEndpointSpec;
use crate::cipher_suite::{CipherSuite, CipherSuiteParts};
use crate::client::ClosedTransport;
use crate::error::{Error, Result};
use crate::extensions::*;
use crate::extensions_util::*;
use crate::handshake::*;
use crate::handshake_executor::HandshakeExecutor;
use crate::handshake_summary::HandshakeSummary;
use crate::key_schedule::{derive_ticket_psk, KeySchedule};
use crate::options::ServerOptions;
use crate::record::{TLS_1_2_VERSION, TLS_1_3_VERSION};
use crate::record_stream::{Message, RecordStream};
use crate::session::TicketState;
use crate::transport::Transport;

pub struct Server {}

impl Server {
    /// Accepts one connection as the responder and returns the established
    /// stream once the handshake completes.
    pub fn accept(
        transport: Box<dyn Transport>,
        options: &ServerOptions,
    ) -> Result<ApplicationStream> {
        let executor = ServerHandshakeExecutor::new(transport, options);
        executor.run()
    }
}

/// Outcome of ClientHello negotiation.
struct Negotiation {
    client_hello: ClientHello,
    cipher_suite: CipherSuite,
    parts: CipherSuiteParts,
    key_schedule: KeySchedule,
    /// Present when (EC)DHE is in use.
    ecdhe: Option<EcdheSelection>,
    psk_in_use: bool,
    /// Early traffic secret when 0-RTT was accepted.
    early_traffic_secret: Option<Zeroizing<Vec<u8>>>,
    /// Client offered early data that we are not reading.
    early_data_rejected: bool,
    early_discard_budget: usize,
    max_early_data_size: u32,
}

struct EcdheSelection {
    group: NamedGroup,
    server_public: Vec<u8>,
    shared_secret: Zeroizing<Vec<u8>>,
}

struct ServerHandshakeExecutor<'a> {
    executor: HandshakeExecutor,
    options: &'a ServerOptions,
    summary: HandshakeSummary,
}

impl<'a> ServerHandshakeExecutor<'a> {
    fn new(transport: Box<dyn Transport>, options: &'a ServerOptions) -> Self {
        Self {
            executor: HandshakeExecutor::new(RecordStream::new(transport, true)),
            options,
            summary: HandshakeSummary::default(),
        }
    }

    fn run(mut self) -> Result<ApplicationStream> {
        match self.run_inner() {
            Ok(stream) => Ok(stream),
            Err(e) => Err(self.executor.abort(e)),
        }
    }

    fn run_inner(&mut self) -> Result<ApplicationStream> {
        let client_hello = match self.executor.receive_handshake_message()? {
            Handshake::ClientHello(v) => v,
            _ => return Err(Error::UnexpectedMessage("expected ClientHello")),
        };

        let negotiation = self.negotiate(client_hello)?;
        let client_random = negotiation.client_hello.random.clone();
        let cipher_suite = negotiation.cipher_suite;
        self.summary.cipher_suite = Some(cipher_suite);
        self.summary.resumed = negotiation.psk_in_use;

        let Negotiation {
            client_hello,
            parts,
            mut key_schedule,
            ecdhe,
            psk_in_use,
            early_traffic_secret,
            early_data_rejected,
            early_discard_budget,
            max_early_data_size,
            ..
        } = negotiation;

        // ServerHello.
        let mut random = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut random);

        let mut extensions = vec![Extension::SupportedVersionsServerHello(
            SupportedVersionsServerHello {
                selected_version: TLS_1_3_VERSION,
            },
        )];

        if let Some(ecdhe) = &ecdhe {
            extensions.push(Extension::KeyShareServerHello(KeyShareServerHello {
                server_share: KeyShareEntry {
                    group: ecdhe.group,
                    key_exchange: Bytes::from(ecdhe.server_public.clone()),
                },
            }));
        }

        if psk_in_use {
            extensions.push(Extension::PreSharedKeyServerHello(PskSelectedIdentity {
                selected_identity: U16(0),
            }));
        }

        self.executor
            .send_handshake_message(Handshake::ServerHello(ServerHello {
                legacy_version: TLS_1_2_VERSION,
                random: Bytes::from(random),
                legacy_session_id_echo: client_hello.legacy_session_id.clone(),
                cipher_suite,
                legacy_compression_method: 0,
                extensions,
            }))?;

        self.executor.stream.send_change_cipher_spec()?;

        // Traffic keys for the handshake flight.
        key_schedule.handshake_secret(ecdhe.as_ref().map(|e| &e.shared_secret[..]))?;
        let hs_secrets = key_schedule.handshake_traffic_secrets(&self.executor.transcript)?;
        key_schedule.master_secret()?;

        self.key_log(
            &client_random,
            "CLIENT_HANDSHAKE_TRAFFIC_SECRET",
            &hs_secrets.client_handshake_traffic_secret,
        );
        self.key_log(
            &client_random,
            "SERVER_HANDSHAKE_TRAFFIC_SECRET",
            &hs_secrets.server_handshake_traffic_secret,
        );

        self.executor.stream.writer.local_cipher_spec = Some(CipherEndpointSpec::new(
            parts.aead.box_clone(),
            parts.hkdf.clone(),
            hs_secrets.server_handshake_traffic_secret.clone(),
        )?);

        match &early_traffic_secret {
            Some(secret) => {
                // Client early records arrive before its second flight.
                self.key_log(&client_random, "CLIENT_EARLY_TRAFFIC_SECRET", secret);
                self.executor
                    .stream
                    .reader
                    .set_remote_cipher_spec(CipherEndpointSpec::new(
                        parts.aead.box_clone(),
                        parts.hkdf.clone(),
                        secret.clone(),
                    )?)?;
            }
            None => {
                self.executor
                    .stream
                    .reader
                    .set_remote_cipher_spec(CipherEndpointSpec::new(
                        parts.aead.box_clone(),
                        parts.hkdf.clone(),
                        hs_secrets.client_handshake_traffic_secret.clone(),
                    )?)?;
                if early_data_rejected {
                    self.executor
                        .stream
                        .reader
                        .skip_undecryptable(early_discard_budget);
                }
            }
        }

        // EncryptedExtensions.
        self.send_encrypted_extensions(&client_hello, early_traffic_secret.is_some())?;

        // Certificate flight, skipped when resuming.
        if !psk_in_use {
            let client_signature_algorithms =
                find_signature_algorithms(&client_hello.extensions)
                    .ok_or(Error::HandshakeFailure("client offered no signature algorithms"))?
                    .algorithms
                    .clone();

            self.executor
                .send_handshake_message(Handshake::Certificate(Certificate {
                    certificate_request_context: Bytes::new(),
                    certificate_list: self
                        .options
                        .certificates
                        .iter()
                        .map(|cert| CertificateEntry {
                            cert: cert.clone(),
                            extensions: vec![],
                        })
                        .collect(),
                }))?;

            let ch_ct_hash = self.executor.transcript.hash(parts.hash);
            let cert_verify = self.executor.create_certificate_verify(
                true,
                &ch_ct_hash,
                &client_signature_algorithms,
                self.options.private_key.as_ref(),
            )?;
            self.executor
                .send_handshake_message(Handshake::CertificateVerify(cert_verify))?;
        }

        let verify_data_server = key_schedule.verify_data_server(&self.executor.transcript)?;
        self.executor
            .send_handshake_message(Handshake::Finished(Finished {
                verify_data: Bytes::from(verify_data_server),
            }))?;

        let final_secrets = key_schedule.server_finished(&self.executor.transcript)?;

        // We may send application data (and tickets) immediately; the send
        // direction moves to application keys now.
        self.executor
            .stream
            .writer
            .replace_local_key(final_secrets.server_application_traffic_secret_0.clone())?;

        // Absorb early data, then the client's second flight.
        let mut early_data = Vec::new();
        if early_traffic_secret.is_some() {
            self.read_early_data(&mut early_data, max_early_data_size)?;
            self.executor
                .stream
                .reader
                .replace_remote_key(hs_secrets.client_handshake_traffic_secret.clone())?;
            self.summary.early_data_accepted = true;
        }

        let expected_client_verify = key_schedule.verify_data_client(&self.executor.transcript)?;
        self.executor.receive_finished(&expected_client_verify)?;

        self.executor
            .stream
            .reader
            .replace_remote_key(final_secrets.client_application_traffic_secret_0.clone())?;

        self.key_log(
            &client_random,
            "CLIENT_TRAFFIC_SECRET_0",
            &final_secrets.client_application_traffic_secret_0,
        );
        self.key_log(
            &client_random,
            "SERVER_TRAFFIC_SECRET_0",
            &final_secrets.server_application_traffic_secret_0,
        );
        self.key_log(
            &client_random,
            "EXPORTER_SECRET",
            &final_secrets.exporter_master_secret,
        );

        let resumption_master_secret =
            key_schedule.resumption_master_secret(&self.executor.transcript)?;

        self.send_session_tickets(&parts, cipher_suite, &resumption_master_secret)?;

        self.executor.transcript.clear();

        let stream = std::mem::replace(
            &mut self.executor.stream,
            RecordStream::new(Box::new(ClosedTransport), true),
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
            false,
            Bytes::from(early_data),
            None,
            String::new(),
        ))
    }

    /// Chooses the suite, key exchange, and PSK disposition, answering with
    /// a HelloRetryRequest (once) when the client guessed no usable share.
    fn negotiate(&mut self, mut client_hello: ClientHello) -> Result<Negotiation> {
        let mut retried = false;

        loop {
            self.validate_client_hello(&client_hello)?;

            let (cipher_suite, parts) = self.select_cipher_suite(&client_hello.cipher_suites)?;

            // PSK resumption.
            let accepted_psk = self.try_accept_psk(&client_hello, cipher_suite, &parts, retried)?;

            let modes = find_psk_key_exchange_modes(&client_hello.extensions);
            let psk_dhe_offered = modes
                .map(|m| m.modes.contains(&PskKeyExchangeMode::psk_dhe_ke))
                .unwrap_or(false);
            let psk_ke_offered = modes
                .map(|m| m.modes.contains(&PskKeyExchangeMode::psk_ke))
                .unwrap_or(false);

            // The first group in our preference list that the client also
            // supports.
            let client_groups = find_supported_groups(&client_hello.extensions);
            let mutual_group = self.options.supported_groups.iter().cloned().find(|g| {
                client_groups
                    .map(|list| list.groups.contains(g))
                    .unwrap_or(false)
            });

            let needs_ecdhe = match &accepted_psk {
                Some(_) if psk_dhe_offered && mutual_group.is_some() => true,
                Some(_) if psk_ke_offered => false,
                Some(_) => true,
                None => true,
            };

            if !needs_ecdhe {
                let accepted = accepted_psk.unwrap();
                return Ok(self.finish_negotiation(
                    client_hello,
                    cipher_suite,
                    parts,
                    None,
                    Some(accepted),
                )?);
            }

            let group = mutual_group.ok_or(Error::HandshakeFailure("no mutually supported group"))?;

            let client_share = find_key_share_ch(&client_hello.extensions)
                .ok_or(Error::IllegalParameter("missing key_share extension"))?
                .client_shares
                .iter()
                .find(|s| s.group == group)
                .cloned();

            let client_share = match client_share {
                Some(share) => share,
                None => {
                    if retried {
                        return Err(Error::IllegalParameter(
                            "second ClientHello still lacks the selected key share",
                        ));
                    }

                    client_hello =
                        self.hello_retry(&client_hello, cipher_suite, &parts, group)?;
                    retried = true;
                    continue;
                }
            };

            let ecdhe = {
                let inst = group
                    .create()
                    .ok_or(Error::InternalError("NamedGroup not supported"))?;
                let secret = Zeroizing::new(inst.secret_value()?);
                let server_public = inst.public_value(&secret)?;
                let shared_secret =
                    Zeroizing::new(inst.shared_secret(&client_share.key_exchange, &secret)?);
                EcdheSelection {
                    group,
                    server_public,
                    shared_secret,
                }
            };

            return Ok(self.finish_negotiation(
                client_hello,
                cipher_suite,
                parts,
                Some(ecdhe),
                accepted_psk,
            )?);
        }
    }

    fn finish_negotiation(
        &mut self,
        client_hello: ClientHello,
        cipher_suite: CipherSuite,
        parts: CipherSuiteParts,
        ecdhe: Option<EcdheSelection>,
        accepted_psk: Option<AcceptedPsk>,
    ) -> Result<Negotiation> {
        let offered_early = has_early_data(&client_hello.extensions);

        let (key_schedule, psk_in_use, early_ok, max_early) = match accepted_psk {
            Some(psk) => (psk.key_schedule, true, psk.early_data_ok, psk.max_early_data_size),
            None => {
                let mut ks = KeySchedule::new(parts.hkdf.clone(), parts.hash);
                ks.early_secret(None);
                (ks, false, false, 0)
            }
        };

        let accept_early = offered_early && early_ok;

        let early_traffic_secret = if accept_early {
            // Bound to the ClientHello alone; must be derived before the
            // ServerHello enters the transcript.
            let ch_hash = self.executor.transcript.hash(parts.hash);
            Some(key_schedule.client_early_traffic_secret(&ch_hash)?)
        } else {
            None
        };

        let early_data_rejected = offered_early && !accept_early;
        let early_discard_budget = if early_data_rejected {
            let configured = self
                .options
                .ticket_issuer
                .as_ref()
                .map(|i| i.max_early_data_size as usize)
                .unwrap_or(0);
            configured.max(crate::record::MAX_PLAINTEXT_SIZE) + 65536
        } else {
            0
        };

        Ok(Negotiation {
            client_hello,
            cipher_suite,
            parts,
            key_schedule,
            ecdhe,
            psk_in_use,
            early_traffic_secret,
            early_data_rejected,
            early_discard_budget,
            max_early_data_size: max_early,
        })
    }

    fn validate_client_hello(&self, client_hello: &ClientHello) -> Result<()> {
        if client_hello.legacy_compression_methods.as_ref() != [0] {
            return Err(Error::IllegalParameter(
                "legacy_compression_methods must be a single zero",
            ));
        }

        let versions = find_supported_versions_ch(&client_hello.extensions)
            .ok_or(Error::ProtocolVersion)?;
        if !versions.versions.contains(&TLS_1_3_VERSION) {
            return Err(Error::ProtocolVersion);
        }

        Ok(())
    }

    fn select_cipher_suite(
        &self,
        client_suites: &[CipherSuite],
    ) -> Result<(CipherSuite, CipherSuiteParts)> {
        for suite in &self.options.supported_cipher_suites {
            if !client_suites.contains(suite) {
                continue;
            }
            if let Ok(parts) = suite.decode() {
                return Ok((*suite, parts));
            }
        }
        Err(Error::HandshakeFailure("no mutually supported cipher suite"))
    }

    /// Attempts PSK resumption with the first offered identity. Returns
    /// None (full handshake) for tickets we cannot use; an offered identity
    /// with a bad binder is fatal.
    fn try_accept_psk(
        &self,
        client_hello: &ClientHello,
        cipher_suite: CipherSuite,
        parts: &CipherSuiteParts,
        after_retry: bool,
    ) -> Result<Option<AcceptedPsk>> {
        let issuer = match (&self.options.ticket_issuer, self.options.accept_resumption) {
            (Some(issuer), true) => issuer,
            _ => return Ok(None),
        };

        let offered = match find_pre_shared_key_ch(&client_hello.extensions) {
            Some(v) => v,
            None => return Ok(None),
        };

        if find_psk_key_exchange_modes(&client_hello.extensions).is_none() {
            return Err(Error::IllegalParameter(
                "pre_shared_key without psk_key_exchange_modes",
            ));
        }
        if offered.binders.len() != offered.identities.len() {
            return Err(Error::IllegalParameter(
                "binder count does not match identity count",
            ));
        }

        let identity = &offered.identities[0];
        let state = match issuer.open(&identity.identity) {
            Some(v) => v,
            None => {
                debug!("ignoring unknown session ticket");
                return Ok(None);
            }
        };

        if !issuer.age_valid(&state, identity.obfuscated_ticket_age, SystemTime::now()) {
            debug!("ignoring expired session ticket");
            return Ok(None);
        }

        // The PSK hash must match the suite we are about to select.
        let ticket_parts = match state.cipher_suite.decode() {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        if ticket_parts.hash != parts.hash {
            return Ok(None);
        }

        let mut key_schedule = KeySchedule::new(parts.hkdf.clone(), parts.hash);
        key_schedule.early_secret(Some(&state.psk));

        // The binder commits the ClientHello (sans binders) to this PSK.
        let truncated_hash = self
            .executor
            .transcript
            .hash_truncating(parts.hash, offered.binders_encoded_len());
        let expected = key_schedule.psk_binder(&key_schedule.binder_key(false)?, &truncated_hash)?;

        if offered.binders[0].ct_eq(&expected).unwrap_u8() != 1 {
            return Err(Error::DecryptError("PSK binder verification failed"));
        }

        // 0-RTT additionally requires the exact original suite, no retry,
        // and an unused replay slot for this ticket.
        let early_data_ok = !after_retry
            && self.options.accept_early_data
            && state.max_early_data_size > 0
            && state.cipher_suite == cipher_suite
            && issuer.accept_early_data_once(&identity.identity);

        Ok(Some(AcceptedPsk {
            key_schedule,
            early_data_ok,
            max_early_data_size: state.max_early_data_size,
        }))
    }

    /// Sends a HelloRetryRequest naming 'group' and reads the second
    /// ClientHello.
    fn hello_retry(
        &mut self,
        client_hello: &ClientHello,
        cipher_suite: CipherSuite,
        parts: &CipherSuiteParts,
        group: NamedGroup,
    ) -> Result<ClientHello> {
        debug!("sending HelloRetryRequest for group {:?}", group);

        // ClientHello1 collapses into a message_hash entry before the
        // HelloRetryRequest is appended.
        self.executor.transcript.rewrite_for_hello_retry(parts.hash);

        self.executor
            .send_handshake_message(Handshake::ServerHello(ServerHello {
                legacy_version: TLS_1_2_VERSION,
                random: Bytes::from(HELLO_RETRY_REQUEST_RANDOM.to_vec()),
                legacy_session_id_echo: client_hello.legacy_session_id.clone(),
                cipher_suite,
                legacy_compression_method: 0,
                extensions: vec![
                    Extension::SupportedVersionsServerHello(SupportedVersionsServerHello {
                        selected_version: TLS_1_3_VERSION,
                    }),
                    Extension::KeyShareHelloRetryRequest(KeyShareHelloRetryRequest {
                        selected_group: group,
                    }),
                ],
            }))?;

        self.executor.stream.send_change_cipher_spec()?;

        // Early data offered alongside ClientHello1 is implicitly rejected;
        // its records may arrive before the second ClientHello.
        if has_early_data(&client_hello.extensions) {
            let budget = self
                .options
                .ticket_issuer
                .as_ref()
                .map(|i| i.max_early_data_size as usize)
                .unwrap_or(0)
                .max(crate::record::MAX_PLAINTEXT_SIZE)
                + 65536;
            self.executor.stream.reader.skip_undecryptable(budget);
        }

        let second = match self.executor.receive_handshake_message()? {
            Handshake::ClientHello(v) => v,
            _ => {
                return Err(Error::UnexpectedMessage(
                    "expected a second ClientHello after HelloRetryRequest",
                ))
            }
        };

        // 'The client MUST send the same ClientHello without modification'
        // except for the updated share, cookie, and dropped early data.
        if second.legacy_session_id != client_hello.legacy_session_id
            || second.random != client_hello.random
        {
            return Err(Error::IllegalParameter(
                "second ClientHello does not match the first",
            ));
        }
        if has_early_data(&second.extensions) {
            return Err(Error::IllegalParameter(
                "early data re-offered after HelloRetryRequest",
            ));
        }
        if !second.cipher_suites.contains(&cipher_suite) {
            return Err(Error::IllegalParameter(
                "second ClientHello dropped the selected cipher suite",
            ));
        }

        Ok(second)
    }

    fn send_encrypted_extensions(
        &mut self,
        client_hello: &ClientHello,
        early_data_accepted: bool,
    ) -> Result<()> {
        let mut extensions = vec![];

        if find_server_name(&client_hello.extensions).is_some() {
            // Acknowledge SNI with an empty server_name.
            extensions.push(Extension::ServerName(None));
        }

        extensions.push(Extension::SupportedGroups(NamedGroupList {
            groups: self.options.supported_groups.clone(),
        }));

        if let Some(limit) = self.options.record_size_limit {
            extensions.push(Extension::RecordSizeLimit(limit));
        }

        if let Some(limit) = find_record_size_limit(&client_hello.extensions) {
            self.executor
                .stream
                .writer
                .set_peer_record_size_limit(limit as usize);
        }

        if let Some(name_list) = find_alpn_extension(&client_hello.extensions) {
            for name in &name_list.names {
                if self.options.alpn_ids.contains(name) {
                    self.summary.selected_alpn_protocol = Some(name.clone());
                    extensions.push(Extension::ALPN(ProtocolNameList {
                        names: vec![name.clone()],
                    }));
                    break;
                }
            }
        }

        if early_data_accepted {
            extensions.push(Extension::EarlyData);
        }

        self.executor
            .send_handshake_message(Handshake::EncryptedExtensions(EncryptedExtensions {
                extensions,
            }))
    }

    /// Reads 0-RTT application data until EndOfEarlyData, enforcing the
    /// ticket's max_early_data_size.
    fn read_early_data(&mut self, out: &mut Vec<u8>, max_early_data_size: u32) -> Result<()> {
        loop {
            match self.executor.stream.recv()? {
                Message::ApplicationData(data) => {
                    if out.len() + data.len() > max_early_data_size as usize {
                        return Err(Error::UnexpectedMessage(
                            "early data exceeds max_early_data_size",
                        ));
                    }
                    out.extend_from_slice(&data);
                }
                Message::Handshake(Handshake::EndOfEarlyData, raw) => {
                    self.executor.transcript.push(&raw);
                    debug!("read {} bytes of early data", out.len());
                    return Ok(());
                }
                Message::Handshake(_, _) => {
                    return Err(Error::UnexpectedMessage(
                        "handshake message inside early data",
                    ));
                }
                Message::Alert(alert) => {
                    if alert.description == crate::alert::AlertDescription::close_notify {
                        return Err(Error::CloseNotify);
                    }
                    if alert.level == crate::alert::AlertLevel::fatal {
                        return Err(Error::PeerAlert(alert.description));
                    }
                }
            }
        }
    }

    /// Mints NewSessionTickets so the client can resume this session.
    fn send_session_tickets(
        &mut self,
        parts: &CipherSuiteParts,
        cipher_suite: CipherSuite,
        resumption_master_secret: &[u8],
    ) -> Result<()> {
        let issuer = match (&self.options.ticket_issuer, self.options.accept_resumption) {
            (Some(issuer), true) => issuer.clone(),
            _ => return Ok(()),
        };

        let now_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::InternalError("system clock before the epoch"))?
            .as_secs();

        for _ in 0..self.options.tickets_to_send {
            let nonce = issuer.next_ticket_nonce();
            let psk = derive_ticket_psk(&parts.hkdf, resumption_master_secret, &nonce)?;

            let age_add = rand::rngs::OsRng.next_u32();
            let ticket = issuer.seal(&TicketState {
                psk,
                cipher_suite,
                issued_at_unix: now_unix,
                age_add,
                lifetime_seconds: issuer.lifetime_seconds,
                max_early_data_size: issuer.max_early_data_size,
            })?;

            let mut extensions = vec![];
            if issuer.max_early_data_size > 0 {
                extensions.push(Extension::EarlyDataTicket(issuer.max_early_data_size));
            }

            let msg = Handshake::NewSessionTicket(NewSessionTicket {
                ticket_lifetime: issuer.lifetime_seconds,
                ticket_age_add: age_add,
                ticket_nonce: Bytes::from(nonce),
                ticket,
                extensions,
            });

            // Post-handshake messages stay out of the transcript.
            let transport = self.executor.stream.transport.as_mut();
            self.executor
                .stream
                .writer
                .send_handshake(transport, &msg, None)?;
        }

        Ok(())
    }

    fn key_log(&self, client_random: &[u8], label: &str, secret: &[u8]) {
        if let Some(log) = &self.options.key_log {
            log.log(label, client_random, secret);
        }
    }
}

struct AcceptedPsk {
    key_schedule: KeySchedule,
    early_data_ok: bool,
    max_early_data_size: u32,
}
