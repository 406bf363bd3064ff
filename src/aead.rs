use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;

use crate::error::{Error, Result};

/// Authenticated encryption with associated data.
///
/// All TLS 1.3 AEADs take a 12 byte nonce and append a 16 byte tag.
pub trait AuthEncAD: Send + Sync {
    fn key_size(&self) -> usize;

    fn nonce_size(&self) -> usize {
        12
    }

    fn tag_size(&self) -> usize {
        16
    }

    /// Size of the ciphertext produced for a plaintext of the given length.
    fn expanded_size(&self, plaintext_size: usize) -> usize {
        plaintext_size + self.tag_size()
    }

    /// Appends 'ciphertext || tag' to out.
    fn encrypt(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        additional_data: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<()>;

    /// Appends the plaintext to out, or fails if the tag does not
    /// authenticate.
    fn decrypt(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        additional_data: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<()>;

    fn box_clone(&self) -> Box<dyn AuthEncAD>;
}

macro_rules! rust_crypto_aead {
    ($wrapper:ident, $cipher:ty, $key_size:expr) => {
        #[derive(Clone)]
        pub struct $wrapper;

        impl AuthEncAD for $wrapper {
            fn key_size(&self) -> usize {
                $key_size
            }

            fn encrypt(
                &self,
                key: &[u8],
                nonce: &[u8],
                plaintext: &[u8],
                additional_data: &[u8],
                out: &mut Vec<u8>,
            ) -> Result<()> {
                let cipher = <$cipher>::new_from_slice(key)
                    .map_err(|_| Error::InternalError("AEAD key of wrong length"))?;
                let ct = cipher
                    .encrypt(
                        nonce.into(),
                        Payload {
                            msg: plaintext,
                            aad: additional_data,
                        },
                    )
                    .map_err(|_| Error::InternalError("AEAD seal failed"))?;
                out.extend_from_slice(&ct);
                Ok(())
            }

            fn decrypt(
                &self,
                key: &[u8],
                nonce: &[u8],
                ciphertext: &[u8],
                additional_data: &[u8],
                out: &mut Vec<u8>,
            ) -> Result<()> {
                let cipher = <$cipher>::new_from_slice(key)
                    .map_err(|_| Error::InternalError("AEAD key of wrong length"))?;
                let pt = cipher
                    .decrypt(
                        nonce.into(),
                        Payload {
                            msg: ciphertext,
                            aad: additional_data,
                        },
                    )
                    .map_err(|_| Error::BadRecordMac)?;
                out.extend_from_slice(&pt);
                Ok(())
            }

            fn box_clone(&self) -> Box<dyn AuthEncAD> {
                Box::new(self.clone())
            }
        }
    };
}

rust_crypto_aead!(Aes128GcmAead, Aes128Gcm, 16);
rust_crypto_aead!(Aes256GcmAead, Aes256Gcm, 32);
rust_crypto_aead!(ChaCha20Poly1305Aead, ChaCha20Poly1305, 32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let aead = Aes128GcmAead;
        let key = [0x42u8; 16];
        let nonce = [7u8; 12];

        let mut ct = vec![];
        aead.encrypt(&key, &nonce, b"attack at dawn", b"header", &mut ct)
            .unwrap();
        assert_eq!(ct.len(), aead.expanded_size(14));

        let mut pt = vec![];
        aead.decrypt(&key, &nonce, &ct, b"header", &mut pt).unwrap();
        assert_eq!(&pt, b"attack at dawn");
    }

    #[test]
    fn open_rejects_tampered_data() {
        for flip in [0usize, 5, 20] {
            let aead = ChaCha20Poly1305Aead;
            let key = [0x42u8; 32];
            let nonce = [7u8; 12];

            let mut ct = vec![];
            aead.encrypt(&key, &nonce, b"attack at dawn", b"", &mut ct)
                .unwrap();
            ct[flip] ^= 1;

            let mut pt = vec![];
            assert!(matches!(
                aead.decrypt(&key, &nonce, &ct, b"", &mut pt),
                Err(Error::BadRecordMac)
            ));
        }
    }

    #[test]
    fn open_rejects_wrong_aad() {
        let aead = Aes256GcmAead;
        let key = [1u8; 32];
        let nonce = [2u8; 12];

        let mut ct = vec![];
        aead.encrypt(&key, &nonce, b"data", b"aad1", &mut ct).unwrap();

        let mut pt = vec![];
        assert!(aead.decrypt(&key, &nonce, &ct, b"aad2", &mut pt).is_err());
    }
}
