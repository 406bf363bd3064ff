use bytes::Bytes;
use zeroize::Zeroizing;

use crate::aead::AuthEncAD;
use crate::error::{Error, Result};
use crate::hkdf::HKDF;
use crate::key_schedule::{hkdf_expand_label, TrafficKeyingMaterial};
use crate::record::{
    parse_inner_plaintext, serialize_inner_plaintext, ContentType, Record, RecordInner,
    MAX_CIPHERTEXT_SIZE,
};

/// Defines how to encrypt/decrypt data on one half of a TLS 1.3 connection.
///
/// This is negotiated during the handshake and tracks which AEAD is in use,
/// what traffic secret is currently installed, and the record sequence
/// counter for this direction.
pub struct CipherEndpointSpec {
    aead: Box<dyn AuthEncAD>,

    hkdf: HKDF,

    traffic_secret: Zeroizing<Vec<u8>>,

    /// Derived from the above traffic secret.
    keying: TrafficKeyingMaterial,
}

impl CipherEndpointSpec {
    pub fn new(
        aead: Box<dyn AuthEncAD>,
        hkdf: HKDF,
        traffic_secret: Zeroizing<Vec<u8>>,
    ) -> Result<Self> {
        let keying = TrafficKeyingMaterial::from_secret(&hkdf, aead.as_ref(), &traffic_secret)?;
        Ok(Self {
            aead,
            hkdf,
            traffic_secret,
            keying,
        })
    }

    /// Installs a brand new traffic secret (e.g. switching from handshake to
    /// application keys). Resets the sequence number.
    pub fn replace_key(&mut self, traffic_secret: Zeroizing<Vec<u8>>) -> Result<()> {
        self.keying =
            TrafficKeyingMaterial::from_secret(&self.hkdf, self.aead.as_ref(), &traffic_secret)?;
        self.traffic_secret = traffic_secret;
        Ok(())
    }

    /// Rotates to the next traffic secret in response to a KeyUpdate:
    ///
    /// application_traffic_secret_N+1 =
    ///     HKDF-Expand-Label(application_traffic_secret_N,
    ///                       "traffic upd", "", Hash.length)
    pub fn update_key(&mut self) -> Result<()> {
        let next_secret = Zeroizing::new(hkdf_expand_label(
            &self.hkdf,
            &self.traffic_secret,
            b"traffic upd",
            b"",
            self.hkdf.hash_size(),
        )?);

        self.replace_key(next_secret)
    }

    pub fn at_sequence_limit(&self) -> bool {
        self.keying.at_sequence_limit()
    }

    /// Seals one record. 'padding' extra zero bytes are appended to the
    /// inner plaintext before encryption.
    pub fn encrypt(&mut self, inner: RecordInner, padding: usize) -> Result<Record> {
        let legacy_record_version = crate::record::TLS_1_2_VERSION;

        let total_size = self.aead.expanded_size(inner.data.len() + 1 + padding);
        if total_size > MAX_CIPHERTEXT_SIZE {
            return Err(Error::RecordOverflow);
        }

        // The additional data is the five byte TLSCiphertext header.
        let mut additional_data = vec![];
        ContentType::ApplicationData.serialize(&mut additional_data);
        additional_data.extend_from_slice(&legacy_record_version.to_be_bytes());
        additional_data.extend_from_slice(&(total_size as u16).to_be_bytes());

        let mut plaintext = vec![];
        serialize_inner_plaintext(&inner, padding, &mut plaintext);

        let key = self.keying.next_keys();

        let mut ciphertext = Vec::with_capacity(total_size);
        self.aead
            .encrypt(&key.key, &key.iv, &plaintext, &additional_data, &mut ciphertext)?;
        debug_assert_eq!(ciphertext.len(), total_size);

        Ok(Record {
            typ: ContentType::ApplicationData,
            legacy_record_version,
            data: Bytes::from(ciphertext),
        })
    }

    /// Opens one record and recovers the inner content type. A failure here
    /// irrecoverably fails the connection.
    pub fn decrypt(&mut self, record: Record) -> Result<RecordInner> {
        if record.typ != ContentType::ApplicationData {
            return Err(Error::UnexpectedMessage(
                "protected record without application_data outer type",
            ));
        }

        let mut additional_data = vec![];
        record.typ.serialize(&mut additional_data);
        additional_data.extend_from_slice(&record.legacy_record_version.to_be_bytes());
        additional_data.extend_from_slice(&(record.data.len() as u16).to_be_bytes());

        // The sequence number is only consumed by a record that
        // authenticates; trial decryption of rejected early data must not
        // advance it.
        let key = self.keying.keys_for_sequence();

        let mut plaintext = vec![];
        self.aead
            .decrypt(&key.key, &key.iv, &record.data, &additional_data, &mut plaintext)?;
        self.keying.advance();

        parse_inner_plaintext(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::Aes128GcmAead;
    use crate::hasher::HashFunction;

    fn pair() -> (CipherEndpointSpec, CipherEndpointSpec) {
        let hkdf = HKDF::new(HashFunction::SHA256);
        let secret = Zeroizing::new(vec![0x42u8; 32]);
        let a = CipherEndpointSpec::new(Box::new(Aes128GcmAead), hkdf.clone(), secret.clone())
            .unwrap();
        let b = CipherEndpointSpec::new(Box::new(Aes128GcmAead), hkdf, secret).unwrap();
        (a, b)
    }

    #[test]
    fn record_round_trip() {
        let (mut tx, mut rx) = pair();

        for i in 0..4u8 {
            let record = tx
                .encrypt(
                    RecordInner {
                        typ: ContentType::ApplicationData,
                        data: Bytes::from(vec![i; 100]),
                    },
                    7,
                )
                .unwrap();

            assert_eq!(record.typ, ContentType::ApplicationData);

            let inner = rx.decrypt(record).unwrap();
            assert_eq!(inner.typ, ContentType::ApplicationData);
            assert_eq!(&inner.data[..], &vec![i; 100][..]);
        }
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let (mut tx, mut rx) = pair();

        let record = tx
            .encrypt(
                RecordInner {
                    typ: ContentType::ApplicationData,
                    data: Bytes::from_static(b"sensitive"),
                },
                0,
            )
            .unwrap();

        let mut data = record.data.to_vec();
        data[3] ^= 0x01;

        let res = rx.decrypt(Record {
            typ: record.typ,
            legacy_record_version: record.legacy_record_version,
            data: Bytes::from(data),
        });
        assert!(matches!(res, Err(Error::BadRecordMac)));
    }

    #[test]
    fn tampered_header_is_rejected() {
        let (mut tx, mut rx) = pair();

        let record = tx
            .encrypt(
                RecordInner {
                    typ: ContentType::ApplicationData,
                    data: Bytes::from_static(b"sensitive"),
                },
                0,
            )
            .unwrap();

        // The header is authenticated as additional data.
        let res = rx.decrypt(Record {
            typ: record.typ,
            legacy_record_version: 0x0302,
            data: record.data,
        });
        assert!(matches!(res, Err(Error::BadRecordMac)));
    }

    #[test]
    fn out_of_order_records_fail() {
        let (mut tx, mut rx) = pair();

        let r1 = tx
            .encrypt(
                RecordInner {
                    typ: ContentType::ApplicationData,
                    data: Bytes::from_static(b"first"),
                },
                0,
            )
            .unwrap();
        let r2 = tx
            .encrypt(
                RecordInner {
                    typ: ContentType::ApplicationData,
                    data: Bytes::from_static(b"second"),
                },
                0,
            )
            .unwrap();

        // Decrypting record 2 against sequence number 0 must fail.
        assert!(rx.decrypt(r2).is_err());
        drop(r1);
    }

    #[test]
    fn rekeyed_receiver_rejects_old_key_records() {
        let (mut tx, mut rx) = pair();

        let stale = tx
            .encrypt(
                RecordInner {
                    typ: ContentType::ApplicationData,
                    data: Bytes::from_static(b"old epoch"),
                },
                0,
            )
            .unwrap();

        rx.update_key().unwrap();
        assert!(matches!(rx.decrypt(stale), Err(Error::BadRecordMac)));
    }

    #[test]
    fn key_update_keeps_peers_in_sync() {
        let (mut tx, mut rx) = pair();
        tx.update_key().unwrap();
        rx.update_key().unwrap();

        let record = tx
            .encrypt(
                RecordInner {
                    typ: ContentType::ApplicationData,
                    data: Bytes::from_static(b"after rotation"),
                },
                0,
            )
            .unwrap();
        let inner = rx.decrypt(record).unwrap();
        assert_eq!(&inner.data[..], b"after rotation");
    }
}
