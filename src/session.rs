use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::aead::{Aes256GcmAead, AuthEncAD};
use crate::cipher_suite::CipherSuite;
use crate::error::Result;
use crate::parsing::{be_u32, be_u64, complete, varlen_vector, U8_LIMIT};

/// A resumable session as remembered by a client: the PSK derived from a
/// NewSessionTicket along with everything needed to offer it later.
#[derive(Clone)]
pub struct ClientSession {
    pub ticket: Bytes,
    pub psk: Zeroizing<Vec<u8>>,
    pub cipher_suite: CipherSuite,
    pub lifetime_seconds: u32,
    pub age_add: u32,
    pub issued_at: SystemTime,
    pub max_early_data_size: u32,
}

impl ClientSession {
    pub fn expired(&self, now: SystemTime) -> bool {
        match now.duration_since(self.issued_at) {
            Ok(age) => age.as_secs() >= self.lifetime_seconds as u64,
            // Clock went backwards: treat as unusable.
            Err(_) => true,
        }
    }

    /// obfuscated_ticket_age = age in milliseconds + ticket_age_add mod 2^32.
    pub fn obfuscated_ticket_age(&self, now: SystemTime) -> u32 {
        let age_ms = now
            .duration_since(self.issued_at)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u32;
        age_ms.wrapping_add(self.age_add)
    }
}

/// Client side ticket cache. Keyed by server name; at most one ticket is
/// kept per server and taking a ticket consumes it.
pub trait ClientSessionStore: Send + Sync {
    fn put(&self, server_name: &str, session: ClientSession);

    fn take(&self, server_name: &str) -> Option<ClientSession>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, ClientSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientSessionStore for MemorySessionStore {
    fn put(&self, server_name: &str, session: ClientSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(server_name.to_string(), session);
    }

    fn take(&self, server_name: &str) -> Option<ClientSession> {
        self.sessions.lock().unwrap().remove(server_name)
    }
}

/// Plaintext state sealed inside a ticket. Opaque to clients.
pub struct TicketState {
    pub psk: Zeroizing<Vec<u8>>,
    pub cipher_suite: CipherSuite,
    pub issued_at_unix: u64,
    pub age_add: u32,
    pub lifetime_seconds: u32,
    pub max_early_data_size: u32,
}

/// Mints and opens session tickets for a server process.
///
/// Tickets are AEAD sealed under a process wide key so the server can stay
/// stateless between connections. The replay window is only needed for
/// 0-RTT: a ticket may derive early data keys at most once.
pub struct TicketIssuer {
    aead: Aes256GcmAead,
    key: Zeroizing<Vec<u8>>,

    pub lifetime_seconds: u32,
    pub max_early_data_size: u32,

    nonce_counter: Mutex<u64>,
    early_data_replay: Mutex<HashSet<[u8; 32]>>,
}

impl TicketIssuer {
    pub fn new(lifetime_seconds: u32, max_early_data_size: u32) -> Self {
        let mut key = Zeroizing::new(vec![0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut key);

        Self {
            aead: Aes256GcmAead,
            key,
            lifetime_seconds,
            max_early_data_size,
            nonce_counter: Mutex::new(0),
            early_data_replay: Mutex::new(HashSet::new()),
        }
    }

    /// A fresh ticket_nonce, unique within this issuer.
    pub fn next_ticket_nonce(&self) -> Vec<u8> {
        let mut counter = self.nonce_counter.lock().unwrap();
        let nonce = counter.to_be_bytes().to_vec();
        *counter += 1;
        nonce
    }

    pub fn seal(&self, state: &TicketState) -> Result<Bytes> {
        let mut plaintext = vec![];
        state.cipher_suite.serialize(&mut plaintext);
        plaintext.extend_from_slice(&state.issued_at_unix.to_be_bytes());
        plaintext.extend_from_slice(&state.age_add.to_be_bytes());
        plaintext.extend_from_slice(&state.lifetime_seconds.to_be_bytes());
        plaintext.extend_from_slice(&state.max_early_data_size.to_be_bytes());
        crate::parsing::serialize_varlen_vector(1, U8_LIMIT, &mut plaintext, |out| {
            out.extend_from_slice(&state.psk);
        });

        let mut nonce = [0u8; 12];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let mut ticket = nonce.to_vec();
        self.aead
            .encrypt(&self.key, &nonce, &plaintext, b"session ticket", &mut ticket)?;
        Ok(Bytes::from(ticket))
    }

    /// Recovers the sealed state, or None for tickets we did not mint (or
    /// minted under an older key).
    pub fn open(&self, ticket: &[u8]) -> Option<TicketState> {
        if ticket.len() < 12 {
            return None;
        }
        let (nonce, sealed) = ticket.split_at(12);

        let mut plaintext = vec![];
        self.aead
            .decrypt(&self.key, nonce, sealed, b"session ticket", &mut plaintext)
            .ok()?;

        self.parse_state(Bytes::from(plaintext)).ok()
    }

    fn parse_state(&self, input: Bytes) -> Result<TicketState> {
        let (cipher_suite, rest) = CipherSuite::parse(input)?;
        let (issued_at_unix, rest) = be_u64(rest)?;
        let (age_add, rest) = be_u32(rest)?;
        let (lifetime_seconds, rest) = be_u32(rest)?;
        let (max_early_data_size, rest) = be_u32(rest)?;
        let psk = complete(varlen_vector(1, U8_LIMIT, rest))?;

        Ok(TicketState {
            psk: Zeroizing::new(psk.to_vec()),
            cipher_suite,
            issued_at_unix,
            age_add,
            lifetime_seconds,
            max_early_data_size,
        })
    }

    /// RFC 8446 section 4.6.1: reject tickets whose client-reported age
    /// (deobfuscated) or server-observed age exceeds the lifetime.
    pub fn age_valid(&self, state: &TicketState, obfuscated_ticket_age: u32, now: SystemTime) -> bool {
        let client_age_ms = obfuscated_ticket_age.wrapping_sub(state.age_add) as u64;
        if client_age_ms / 1000 > state.lifetime_seconds as u64 {
            return false;
        }

        let now_unix = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        let server_age = now_unix.saturating_sub(state.issued_at_unix);
        server_age <= state.lifetime_seconds as u64
    }

    /// Registers a ticket for 0-RTT use. Returns false if this exact ticket
    /// already derived early data keys (replay).
    pub fn accept_early_data_once(&self, ticket: &[u8]) -> bool {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&crate::hasher::HashFunction::SHA256.digest(ticket));
        self.early_data_replay.lock().unwrap().insert(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(psk: &[u8]) -> TicketState {
        TicketState {
            psk: Zeroizing::new(psk.to_vec()),
            cipher_suite: CipherSuite::TLS_AES_128_GCM_SHA256,
            issued_at_unix: 1_700_000_000,
            age_add: 0x1111_2222,
            lifetime_seconds: 7200,
            max_early_data_size: 16384,
        }
    }

    #[test]
    fn seal_open_round_trip() {
        let issuer = TicketIssuer::new(7200, 16384);
        let ticket = issuer.seal(&state(b"a shared secret!")).unwrap();

        let opened = issuer.open(&ticket).unwrap();
        assert_eq!(&opened.psk[..], b"a shared secret!");
        assert_eq!(opened.cipher_suite, CipherSuite::TLS_AES_128_GCM_SHA256);
        assert_eq!(opened.age_add, 0x1111_2222);
        assert_eq!(opened.max_early_data_size, 16384);
    }

    #[test]
    fn foreign_tickets_do_not_open() {
        let a = TicketIssuer::new(7200, 0);
        let b = TicketIssuer::new(7200, 0);
        let ticket = a.seal(&state(b"secret")).unwrap();
        assert!(b.open(&ticket).is_none());
        assert!(a.open(&ticket[..ticket.len() - 1]).is_none());
    }

    #[test]
    fn age_validation_follows_lifetime() {
        let issuer = TicketIssuer::new(7200, 0);
        let s = state(b"secret");
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_100);

        // 100 seconds old, reported honestly.
        let obfuscated = (100_000u32).wrapping_add(s.age_add);
        assert!(issuer.age_valid(&s, obfuscated, now));

        // Client claims an age beyond the lifetime.
        let stale = (7_300_000u32).wrapping_add(s.age_add);
        assert!(!issuer.age_valid(&s, stale, now));

        // Server side expiry regardless of the claimed age.
        let much_later = UNIX_EPOCH + Duration::from_secs(1_700_000_000 + 8000);
        assert!(!issuer.age_valid(&s, obfuscated, much_later));
    }

    #[test]
    fn early_data_replay_window() {
        let issuer = TicketIssuer::new(7200, 1024);
        let ticket = issuer.seal(&state(b"secret")).unwrap();

        assert!(issuer.accept_early_data_once(&ticket));
        assert!(!issuer.accept_early_data_once(&ticket));
    }

    #[test]
    fn memory_store_keeps_one_ticket_per_server() {
        let store = MemorySessionStore::new();
        let session = ClientSession {
            ticket: Bytes::from_static(b"t1"),
            psk: Zeroizing::new(vec![1; 32]),
            cipher_suite: CipherSuite::TLS_AES_128_GCM_SHA256,
            lifetime_seconds: 60,
            age_add: 0,
            issued_at: SystemTime::now(),
            max_early_data_size: 0,
        };
        store.put("example.com", session.clone());

        let mut replacement = session.clone();
        replacement.ticket = Bytes::from_static(b"t2");
        store.put("example.com", replacement);

        let taken = store.take("example.com").unwrap();
        assert_eq!(&taken.ticket[..], b"t2");
        // Taking consumes the ticket.
        assert!(store.take("example.com").is_none());
    }
}
