// Key derivation for TLS 1.3 per RFC 8446 section 7.1.
//
//             0
//             |
//             v
//   PSK ->  HKDF-Extract = Early Secret
//             |
//             +-----> Derive-Secret(., "ext binder" | "res binder", "")
//             +-----> Derive-Secret(., "c e traffic", ClientHello)
//             +-----> Derive-Secret(., "e exp master", ClientHello)
//             v
//       Derive-Secret(., "derived", "")
//             |
//             v
// (EC)DHE -> HKDF-Extract = Handshake Secret
//             +-----> Derive-Secret(., "c hs traffic", CH..SH)
//             +-----> Derive-Secret(., "s hs traffic", CH..SH)
//             v
//       Derive-Secret(., "derived", "")
//             |
//             v
//   0 ->    HKDF-Extract = Master Secret
//             +-----> Derive-Secret(., "c ap traffic", CH..server Fin)
//             +-----> Derive-Secret(., "s ap traffic", CH..server Fin)
//             +-----> Derive-Secret(., "exp master",   CH..server Fin)
//             +-----> Derive-Secret(., "res master",   CH..client Fin)

use zeroize::Zeroizing;

use crate::aead::AuthEncAD;
use crate::error::Result;
use crate::hasher::HashFunction;
use crate::hkdf::HKDF;
use crate::parsing::serialize_varlen_vector;
use crate::transcript::Transcript;

pub struct KeySchedule {
    hkdf: HKDF,
    hash: HashFunction,

    /// The most recent secret in the Early -> Handshake -> Master chain.
    current_secret: Zeroizing<Vec<u8>>,

    base_keys: Option<HandshakeTrafficSecrets>,

    /// Vector of zeros of the same length as the hash output.
    zero: Vec<u8>,
    /// Hash of an empty transcript. aka Hash("")
    empty_transcript_hash: Vec<u8>,
}

impl KeySchedule {
    pub fn new(hkdf: HKDF, hash: HashFunction) -> Self {
        let zero = vec![0u8; hash.output_size()];
        let empty_transcript_hash = hash.digest(b"");

        Self {
            hkdf,
            hash,
            current_secret: Zeroizing::new(zero.clone()),
            base_keys: None,
            zero,
            empty_transcript_hash,
        }
    }

    pub fn hash(&self) -> HashFunction {
        self.hash
    }

    pub fn hkdf(&self) -> &HKDF {
        &self.hkdf
    }

    /// Mixes in the PSK (or zeros when not resuming) to form the Early
    /// Secret. Must be the first stage applied.
    pub fn early_secret(&mut self, psk: Option<&[u8]>) {
        let ikm = psk.unwrap_or(&self.zero);
        self.current_secret = Zeroizing::new(self.hkdf.extract(&self.zero, ikm));
    }

    /// Key under which PSK binders are computed. 'external' selects the
    /// out-of-band provisioned label rather than the resumption one.
    pub fn binder_key(&self, external: bool) -> Result<Zeroizing<Vec<u8>>> {
        let label: &[u8] = if external { b"ext binder" } else { b"res binder" };
        Ok(Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            label,
            &self.empty_transcript_hash,
            self.hkdf.hash_size(),
        )?))
    }

    /// Binder value over a truncated ClientHello transcript hash.
    pub fn psk_binder(&self, binder_key: &[u8], truncated_transcript_hash: &[u8]) -> Result<Vec<u8>> {
        let finished_key = Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            binder_key,
            b"finished",
            b"",
            self.hkdf.hash_size(),
        )?);
        Ok(self.hash.hmac(&finished_key, truncated_transcript_hash))
    }

    /// 0-RTT key material, bound to the ClientHello alone.
    pub fn client_early_traffic_secret(&self, client_hello_hash: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            b"c e traffic",
            client_hello_hash,
            self.hkdf.hash_size(),
        )?))
    }

    pub fn early_exporter_master_secret(&self, client_hello_hash: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            b"e exp master",
            client_hello_hash,
            self.hkdf.hash_size(),
        )?))
    }

    /// Mixes in the (EC)DHE shared secret (zeros for psk_ke resumption) to
    /// form the Handshake Secret.
    pub fn handshake_secret(&mut self, shared_secret: Option<&[u8]>) -> Result<()> {
        let salt = hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            b"derived",
            &self.empty_transcript_hash,
            self.hkdf.hash_size(),
        )?;

        let ikm = shared_secret.unwrap_or(&self.zero);
        self.current_secret = Zeroizing::new(self.hkdf.extract(&salt, ikm));
        Ok(())
    }

    /// Should be called with the transcript ending at the ServerHello.
    pub fn handshake_traffic_secrets(
        &mut self,
        transcript: &Transcript,
    ) -> Result<HandshakeTrafficSecrets> {
        let ch_sh_hash = transcript.hash(self.hash);

        let client = Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            b"c hs traffic",
            &ch_sh_hash,
            self.hkdf.hash_size(),
        )?);
        let server = Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            b"s hs traffic",
            &ch_sh_hash,
            self.hkdf.hash_size(),
        )?);

        self.base_keys = Some(HandshakeTrafficSecrets {
            client_handshake_traffic_secret: client,
            server_handshake_traffic_secret: server,
        });

        Ok(self.base_keys.clone().unwrap())
    }

    pub fn master_secret(&mut self) -> Result<()> {
        let salt = hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            b"derived",
            &self.empty_transcript_hash,
            self.hkdf.hash_size(),
        )?;

        self.current_secret = Zeroizing::new(self.hkdf.extract(&salt, &self.zero));
        Ok(())
    }

    /// Expected server Finished verify_data over the current transcript.
    /// Call immediately before sending/receiving the server Finished.
    pub fn verify_data_server(&self, transcript: &Transcript) -> Result<Vec<u8>> {
        let base = self
            .base_keys
            .as_ref()
            .expect("handshake traffic secrets not derived");
        self.finished_verify_data(&base.server_handshake_traffic_secret, transcript)
    }

    /// Expected client Finished verify_data over the current transcript.
    pub fn verify_data_client(&self, transcript: &Transcript) -> Result<Vec<u8>> {
        let base = self
            .base_keys
            .as_ref()
            .expect("handshake traffic secrets not derived");
        self.finished_verify_data(&base.client_handshake_traffic_secret, transcript)
    }

    fn finished_verify_data(&self, base_secret: &[u8], transcript: &Transcript) -> Result<Vec<u8>> {
        // finished_key = HKDF-Expand-Label(BaseKey, "finished", "", Hash.length)
        let finished_key = Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            base_secret,
            b"finished",
            b"",
            self.hkdf.hash_size(),
        )?);

        Ok(self.hash.hmac(&finished_key, &transcript.hash(self.hash)))
    }

    /// Application traffic and exporter secrets. Call with the transcript
    /// ending at the server Finished.
    pub fn server_finished(&self, transcript: &Transcript) -> Result<FinalSecrets> {
        let ch_fin_hash = transcript.hash(self.hash);

        Ok(FinalSecrets {
            client_application_traffic_secret_0: Zeroizing::new(hkdf_expand_label(
                &self.hkdf,
                &self.current_secret,
                b"c ap traffic",
                &ch_fin_hash,
                self.hkdf.hash_size(),
            )?),
            server_application_traffic_secret_0: Zeroizing::new(hkdf_expand_label(
                &self.hkdf,
                &self.current_secret,
                b"s ap traffic",
                &ch_fin_hash,
                self.hkdf.hash_size(),
            )?),
            exporter_master_secret: Zeroizing::new(hkdf_expand_label(
                &self.hkdf,
                &self.current_secret,
                b"exp master",
                &ch_fin_hash,
                self.hkdf.hash_size(),
            )?),
        })
    }

    /// Resumption master secret. Call with the transcript ending at the
    /// client Finished (later than the other master-derived secrets).
    pub fn resumption_master_secret(&self, transcript: &Transcript) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            &self.current_secret,
            b"res master",
            &transcript.hash(self.hash),
            self.hkdf.hash_size(),
        )?))
    }
}

#[derive(Clone)]
pub struct HandshakeTrafficSecrets {
    pub client_handshake_traffic_secret: Zeroizing<Vec<u8>>,
    pub server_handshake_traffic_secret: Zeroizing<Vec<u8>>,
}

pub struct FinalSecrets {
    pub client_application_traffic_secret_0: Zeroizing<Vec<u8>>,
    pub server_application_traffic_secret_0: Zeroizing<Vec<u8>>,
    pub exporter_master_secret: Zeroizing<Vec<u8>>,
}

/// The PSK minted by a NewSessionTicket.
pub fn derive_ticket_psk(
    hkdf: &HKDF,
    resumption_master_secret: &[u8],
    ticket_nonce: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    Ok(Zeroizing::new(hkdf_expand_label(
        hkdf,
        resumption_master_secret,
        b"resumption",
        ticket_nonce,
        hkdf.hash_size(),
    )?))
}

/// RFC 8446 section 7.5 exporter.
pub fn export_keying_material(
    hkdf: &HKDF,
    exporter_master_secret: &[u8],
    label: &[u8],
    context: &[u8],
    length: usize,
) -> Result<Vec<u8>> {
    let hash = hkdf.hash();
    let secret = Zeroizing::new(hkdf_expand_label(
        hkdf,
        exporter_master_secret,
        label,
        &hash.digest(b""),
        hkdf.hash_size(),
    )?);

    hkdf_expand_label(hkdf, &secret, b"exporter", &hash.digest(context), length)
}

pub struct TrafficKey {
    pub key: Zeroizing<Vec<u8>>,
    pub iv: Zeroizing<Vec<u8>>,
}

/// Keying material expanded from a traffic secret along with the record
/// sequence number used to form per-record nonces.
pub struct TrafficKeyingMaterial {
    base_key: TrafficKey,
    sequence: u64,
}

impl TrafficKeyingMaterial {
    // [sender]_write_key = HKDF-Expand-Label(Secret, "key", "", key_length)
    // [sender]_write_iv  = HKDF-Expand-Label(Secret, "iv", "", iv_length)
    pub fn from_secret(
        hkdf: &HKDF,
        aead: &dyn AuthEncAD,
        traffic_secret: &[u8],
    ) -> Result<Self> {
        let key = Zeroizing::new(hkdf_expand_label(
            hkdf,
            traffic_secret,
            b"key",
            b"",
            aead.key_size(),
        )?);
        let iv = Zeroizing::new(hkdf_expand_label(
            hkdf,
            traffic_secret,
            b"iv",
            b"",
            aead.nonce_size(),
        )?);

        Ok(Self {
            base_key: TrafficKey { key, iv },
            sequence: 0,
        })
    }

    /// Key and nonce for the record at the current sequence number without
    /// consuming it. The nonce is the write IV XORed with the left padded
    /// big-endian sequence number (RFC 8446 section 5.3).
    pub fn keys_for_sequence(&self) -> TrafficKey {
        assert!(self.sequence != u64::MAX, "sequence number exhausted");

        let mut nonce = self.base_key.iv.clone();
        let n = nonce.len();
        let seq = self.sequence.to_be_bytes();
        for i in 0..8 {
            nonce[n - 8 + i] ^= seq[i];
        }

        TrafficKey {
            key: self.base_key.key.clone(),
            iv: nonce,
        }
    }

    /// Consumes the current sequence number. Sequence numbers never wrap;
    /// the caller must rekey before the counter is exhausted.
    pub fn advance(&mut self) {
        self.sequence += 1;
    }

    /// Key and nonce for the next record, consuming a sequence number.
    pub fn next_keys(&mut self) -> TrafficKey {
        let keys = self.keys_for_sequence();
        self.advance();
        keys
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True once the only legal next action on this direction is a KeyUpdate.
    pub fn at_sequence_limit(&self) -> bool {
        self.sequence >= u64::MAX - 1
    }
}

// HKDF-Expand-Label(Secret, Label, Context, Length) =
//     HKDF-Expand(Secret, HkdfLabel, Length)
pub fn hkdf_expand_label(
    hkdf: &HKDF,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    length: usize,
) -> Result<Vec<u8>> {
    let mut hkdf_label = vec![];
    HkdfLabel {
        length: length as u16,
        label,
        context,
    }
    .serialize(&mut hkdf_label);

    hkdf.expand(secret, &hkdf_label, length)
}

/*
struct {
    uint16 length = Length;
    opaque label<7..255> = "tls13 " + Label;
    opaque context<0..255> = Context;
} HkdfLabel;
*/
/// NOTE: This never needs to be parsed, so only serialization exists.
struct HkdfLabel<'a> {
    length: u16,
    // NOTE: Without the 'tls13 ' prefix.
    label: &'a [u8],
    context: &'a [u8],
}

impl HkdfLabel<'_> {
    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.length.to_be_bytes());
        serialize_varlen_vector(7, 255, out, |out| {
            out.extend_from_slice(b"tls13 ");
            out.extend_from_slice(self.label);
        });
        serialize_varlen_vector(0, 255, out, |out| {
            out.extend_from_slice(self.context);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::Aes128GcmAead;
    use hex_literal::hex;

    /// HKDF-Extract(zeros, zeros) with SHA-256, i.e. the Early Secret of a
    /// full handshake (RFC 8448 section 3).
    #[test]
    fn early_secret_without_psk() {
        let mut ks = KeySchedule::new(HKDF::new(HashFunction::SHA256), HashFunction::SHA256);
        ks.early_secret(None);
        assert_eq!(
            &ks.current_secret[..],
            hex!("33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a")
        );
    }

    /// Derive-Secret(Early Secret, "derived", "") from RFC 8448 section 3.
    #[test]
    fn derived_secret_for_handshake() {
        let hkdf = HKDF::new(HashFunction::SHA256);
        let early = hex!("33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a");
        let empty_hash = HashFunction::SHA256.digest(b"");

        let derived = hkdf_expand_label(&hkdf, &early, b"derived", &empty_hash, 32).unwrap();
        assert_eq!(
            derived,
            hex!("6f2615a108c702c5678f54fc9dbab69716c076189c48250cebeac3576c3611ba")
        );
    }

    #[test]
    fn per_record_nonces_are_unique_and_reset_on_rekey() {
        let hkdf = HKDF::new(HashFunction::SHA256);
        let secret = [0x17u8; 32];
        let mut keying = TrafficKeyingMaterial::from_secret(&hkdf, &Aes128GcmAead, &secret).unwrap();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let key = keying.next_keys();
            assert!(seen.insert(key.iv.to_vec()), "nonce repeated");
        }

        // A fresh keying off a rotated secret restarts the counter.
        let next = hkdf_expand_label(&hkdf, &secret, b"traffic upd", b"", 32).unwrap();
        let keying2 = TrafficKeyingMaterial::from_secret(&hkdf, &Aes128GcmAead, &next).unwrap();
        assert_eq!(keying2.sequence(), 0);
    }

    #[test]
    fn traffic_key_lengths_match_aead() {
        let hkdf = HKDF::new(HashFunction::SHA256);
        let keying =
            TrafficKeyingMaterial::from_secret(&hkdf, &Aes128GcmAead, &[1u8; 32]).unwrap();
        assert_eq!(keying.base_key.key.len(), 16);
        assert_eq!(keying.base_key.iv.len(), 12);
    }
}
