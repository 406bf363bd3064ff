use crate::aead::{Aes128GcmAead, Aes256GcmAead, AuthEncAD, ChaCha20Poly1305Aead};
use crate::error::{Error, Result};
use crate::hasher::HashFunction;
use crate::hkdf::HKDF;

tls_enum_u16!(CipherSuite => {
    TLS_AES_128_GCM_SHA256(0x1301),
    TLS_AES_256_GCM_SHA384(0x1302),
    TLS_CHACHA20_POLY1305_SHA256(0x1303),
    (0xFFFF)
});

impl CipherSuite {
    /// Instantiates the AEAD and hash named by this suite.
    pub fn decode(&self) -> Result<CipherSuiteParts> {
        let (aead, hash): (Box<dyn AuthEncAD>, HashFunction) = match self {
            CipherSuite::TLS_AES_128_GCM_SHA256 => {
                (Box::new(Aes128GcmAead), HashFunction::SHA256)
            }
            CipherSuite::TLS_AES_256_GCM_SHA384 => {
                (Box::new(Aes256GcmAead), HashFunction::SHA384)
            }
            CipherSuite::TLS_CHACHA20_POLY1305_SHA256 => {
                (Box::new(ChaCha20Poly1305Aead), HashFunction::SHA256)
            }
            CipherSuite::unknown(_) => {
                return Err(Error::HandshakeFailure("unsupported cipher suite"));
            }
        };

        Ok(CipherSuiteParts {
            aead,
            hash,
            hkdf: HKDF::new(hash),
        })
    }
}

pub struct CipherSuiteParts {
    pub aead: Box<dyn AuthEncAD>,
    pub hash: HashFunction,
    pub hkdf: HKDF,
}
