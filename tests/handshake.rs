use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use bytes::Bytes;

use tls13::options::{ClientOptions, ServerOptions};
use tls13::session::{MemorySessionStore, TicketIssuer};
use tls13::signatures::{CertificateVerifier, EcdsaSecp256r1Signer, PeerPublicKey, Signer};
use tls13::{ApplicationStream, Client, Error, Server};

/// One half of an in-memory duplex byte stream.
struct Pipe {
    rx: Receiver<Vec<u8>>,
    tx: Sender<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

fn duplex() -> (Pipe, Pipe) {
    let (tx_a, rx_b) = channel();
    let (tx_b, rx_a) = channel();
    (
        Pipe {
            rx: rx_a,
            tx: tx_a,
            pending: vec![],
            pos: 0,
        },
        Pipe {
            rx: rx_b,
            tx: tx_b,
            pending: vec![],
            pos: 0,
        },
    )
}

impl Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pos == self.pending.len() {
            match self.rx.recv() {
                Ok(data) => {
                    self.pending = data;
                    self.pos = 0;
                }
                // Peer hung up.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Accepts any chain whose first entry is a SEC1 P-256 public key. Chain
/// validation proper is outside the TLS core.
struct TestVerifier;

impl CertificateVerifier for TestVerifier {
    fn verify(
        &self,
        chain: &[Bytes],
        _server_name: Option<&str>,
        _now: SystemTime,
    ) -> Result<PeerPublicKey, Error> {
        let end_entity = chain
            .first()
            .ok_or(Error::BadCertificate("empty chain"))?;
        Ok(PeerPublicKey::EcdsaSecp256r1(end_entity.to_vec()))
    }
}

fn server_options() -> ServerOptions {
    let signer = EcdsaSecp256r1Signer::random();
    let public = signer.public_key();
    ServerOptions::new(
        vec![Bytes::from(public)],
        Arc::new(signer) as Arc<dyn Signer>,
    )
}

fn client_options() -> ClientOptions {
    let mut options = ClientOptions::recommended(Arc::new(TestVerifier));
    options.hostname = "localhost".to_string();
    options
}

fn read_exact_app(stream: &mut ApplicationStream, n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        let read = stream.read(&mut out[filled..]).unwrap();
        assert!(read > 0, "stream closed before {} bytes arrived", n);
        filled += read;
    }
    out
}

#[test]
fn full_handshake_exchanges_data() {
    let (client_pipe, server_pipe) = duplex();

    let server = thread::spawn(move || {
        let mut options = server_options();
        options.alpn_ids = vec![Bytes::from_static(b"h2")];
        options.record_size_limit = Some(100);

        let mut stream = Server::accept(Box::new(server_pipe), &options).unwrap();
        assert_eq!(
            stream.summary().selected_alpn_protocol.as_deref(),
            Some(&b"h2"[..])
        );
        assert!(!stream.summary().resumed);

        let request = read_exact_app(&mut stream, 1024);
        stream.write(&request).unwrap();

        // Client closes first; reads drain to 0.
        let mut buf = [0u8; 16];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    });

    let mut options = client_options();
    options.alpn_ids = vec![Bytes::from_static(b"h2")];
    options.record_size_limit = Some(64);

    let mut stream = Client::connect(Box::new(client_pipe), &options).unwrap();
    assert_eq!(
        stream.summary().selected_alpn_protocol.as_deref(),
        Some(&b"h2"[..])
    );

    // Large enough to be split across many records under the negotiated
    // record size limits.
    let payload: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    stream.write(&payload).unwrap();

    let echoed = read_exact_app(&mut stream, 1024);
    assert_eq!(echoed, payload);

    stream.close().unwrap();
    server.join().unwrap();
}

#[test]
fn hello_retry_request_negotiates_new_group() {
    let (client_pipe, server_pipe) = duplex();

    let server = thread::spawn(move || {
        let mut options = server_options();
        // The client's first flight only carries an x25519 share.
        options.supported_groups = vec![tls13::extensions::NamedGroup::secp256r1];

        let mut stream = Server::accept(Box::new(server_pipe), &options).unwrap();
        let data = read_exact_app(&mut stream, 5);
        assert_eq!(&data, b"after");
        stream.write(b"retry ok").unwrap();
    });

    let options = client_options();
    let mut stream = Client::connect(Box::new(client_pipe), &options).unwrap();

    stream.write(b"after").unwrap();
    let reply = read_exact_app(&mut stream, 8);
    assert_eq!(&reply, b"retry ok");

    server.join().unwrap();
}

fn run_resumption_handshakes(
    second_server_groups: Vec<tls13::extensions::NamedGroup>,
) -> (bool, bool) {
    let issuer = Arc::new(TicketIssuer::new(7200, 16384));
    let store = Arc::new(MemorySessionStore::new());

    // First connection: full handshake, the server mints a ticket.
    let (client_pipe, server_pipe) = duplex();
    let issuer1 = issuer.clone();
    let server = thread::spawn(move || {
        let mut options = server_options();
        options.accept_resumption = true;
        options.accept_early_data = true;
        options.ticket_issuer = Some(issuer1);

        let mut stream = Server::accept(Box::new(server_pipe), &options).unwrap();
        let data = read_exact_app(&mut stream, 5);
        assert_eq!(&data, b"first");
        stream.write(b"hello").unwrap();
    });

    let mut options = client_options();
    options.session_store = Some(store.clone());
    let mut stream = Client::connect(Box::new(client_pipe), &options).unwrap();
    stream.write(b"first").unwrap();
    // Reading the reply also absorbs the NewSessionTicket into the store.
    let reply = read_exact_app(&mut stream, 5);
    assert_eq!(&reply, b"hello");
    drop(stream);
    server.join().unwrap();

    // Second connection: resume with the stored ticket and send 0-RTT data.
    let (client_pipe, server_pipe) = duplex();
    let server = thread::spawn(move || {
        let mut options = server_options();
        options.accept_resumption = true;
        options.accept_early_data = true;
        options.ticket_issuer = Some(issuer);
        options.supported_groups = second_server_groups;

        let mut stream = Server::accept(Box::new(server_pipe), &options).unwrap();
        assert!(stream.summary().resumed);
        assert!(stream.summary().early_data_accepted);

        let early = read_exact_app(&mut stream, 4);
        assert_eq!(&early, b"ping");
        let late = read_exact_app(&mut stream, 4);
        assert_eq!(&late, b"pong");
        stream.write(b"resumed").unwrap();
    });

    let mut options = client_options();
    options.session_store = Some(store);
    options.early_data = Some(Bytes::from_static(b"ping"));

    let mut stream = Client::connect(Box::new(client_pipe), &options).unwrap();
    let summary_resumed = stream.summary().resumed;
    let summary_early = stream.summary().early_data_accepted;

    stream.write(b"pong").unwrap();
    let reply = read_exact_app(&mut stream, 7);
    assert_eq!(&reply, b"resumed");

    server.join().unwrap();
    (summary_resumed, summary_early)
}

#[test]
fn psk_resumption_with_early_data() {
    let (resumed, early) = run_resumption_handshakes(vec![
        tls13::extensions::NamedGroup::x25519,
        tls13::extensions::NamedGroup::secp256r1,
    ]);
    assert!(resumed);
    assert!(early);
}

#[test]
fn psk_resumption_without_ecdhe() {
    // No mutually supported group on the resumed connection forces pure
    // psk_ke key establishment.
    let (resumed, early) = run_resumption_handshakes(vec![]);
    assert!(resumed);
    assert!(early);
}

#[test]
fn key_update_rotates_both_directions() {
    let (client_pipe, server_pipe) = duplex();

    let server = thread::spawn(move || {
        let options = server_options();
        let mut stream = Server::accept(Box::new(server_pipe), &options).unwrap();

        // Reading processes the client's KeyUpdate(update_requested) and
        // answers it before this data arrives under the rotated key.
        let data = read_exact_app(&mut stream, 12);
        assert_eq!(&data, b"new keys now");
        stream.write(b"rotated back").unwrap();
    });

    let options = client_options();
    let mut stream = Client::connect(Box::new(client_pipe), &options).unwrap();

    stream.key_update(true).unwrap();
    stream.write(b"new keys now").unwrap();

    let reply = read_exact_app(&mut stream, 12);
    assert_eq!(&reply, b"rotated back");

    server.join().unwrap();
}

#[test]
fn exporters_agree() {
    let (client_pipe, server_pipe) = duplex();

    let (tx, rx) = channel();
    let server = thread::spawn(move || {
        let options = server_options();
        let mut stream = Server::accept(Box::new(server_pipe), &options).unwrap();
        tx.send(
            stream
                .export_keying_material(b"EXPORTER-test", b"ctx", 42)
                .unwrap(),
        )
        .unwrap();
        let _ = read_exact_app(&mut stream, 4);
    });

    let options = client_options();
    let mut stream = Client::connect(Box::new(client_pipe), &options).unwrap();
    let client_ekm = stream
        .export_keying_material(b"EXPORTER-test", b"ctx", 42)
        .unwrap();

    let server_ekm = rx.recv().unwrap();
    assert_eq!(client_ekm, server_ekm);
    assert_eq!(client_ekm.len(), 42);

    // Different context yields different material.
    let other = stream
        .export_keying_material(b"EXPORTER-test", b"other", 42)
        .unwrap();
    assert_ne!(other, client_ekm);

    stream.write(b"done").unwrap();
    server.join().unwrap();
}

/// Flips one ciphertext byte of the next record written after being armed.
struct TamperingPipe {
    inner: Pipe,
    arm: Arc<AtomicBool>,
}

impl Read for TamperingPipe {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for TamperingPipe {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.arm.swap(false, Ordering::SeqCst) && buf.len() > 7 {
            let mut tampered = buf.to_vec();
            // Past the 5 byte record header, inside the ciphertext.
            tampered[7] ^= 0x01;
            self.inner.write_all(&tampered)?;
            return Ok(buf.len());
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[test]
fn tampered_application_record_fails_connection() {
    let (client_pipe, server_pipe) = duplex();
    let arm = Arc::new(AtomicBool::new(false));

    let server = thread::spawn(move || {
        let options = server_options();
        let mut stream = Server::accept(Box::new(server_pipe), &options).unwrap();

        let mut buf = [0u8; 32];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(matches!(err, Error::BadRecordMac));

        // The connection is terminally failed.
        assert!(stream.read(&mut buf).is_err());
        assert!(stream.write(b"x").is_err());
    });

    let options = client_options();
    let mut stream = Client::connect(
        Box::new(TamperingPipe {
            inner: client_pipe,
            arm: arm.clone(),
        }),
        &options,
    )
    .unwrap();

    arm.store(true, Ordering::SeqCst);
    stream.write(b"integrity protected").unwrap();

    server.join().unwrap();
}

#[test]
fn unexpected_message_during_handshake_is_fatal() {
    let (client_pipe, mut raw_server) = duplex();

    let server = thread::spawn(move || {
        // Consume the ClientHello record.
        let mut header = [0u8; 5];
        raw_server.read_exact(&mut header).unwrap();
        let len = u16::from_be_bytes([header[3], header[4]]) as usize;
        let mut body = vec![0u8; len];
        raw_server.read_exact(&mut body).unwrap();

        // Answer with a plaintext Certificate message instead of a
        // ServerHello: handshake(22), v1.2, then an empty Certificate.
        let cert_msg = [11u8, 0, 0, 4, 0, 0, 0, 0];
        let mut record = vec![22u8, 0x03, 0x03, 0, cert_msg.len() as u8];
        record.extend_from_slice(&cert_msg);
        raw_server.write_all(&record).unwrap();

        // The client must answer with a fatal unexpected_message alert.
        // It may send a change_cipher_spec first; skip non-alert records.
        loop {
            let mut header = [0u8; 5];
            raw_server.read_exact(&mut header).unwrap();
            let len = u16::from_be_bytes([header[3], header[4]]) as usize;
            let mut body = vec![0u8; len];
            raw_server.read_exact(&mut body).unwrap();
            if header[0] == 21 {
                assert_eq!(body, vec![2 /* fatal */, 10 /* unexpected_message */]);
                break;
            }
        }
    });

    let options = client_options();
    let err = Client::connect(Box::new(client_pipe), &options).unwrap_err();
    assert!(matches!(err, Error::UnexpectedMessage(_)));

    server.join().unwrap();
}
