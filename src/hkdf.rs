use hkdf::Hkdf as HkdfImpl;
use sha2::{Sha256, Sha384};

use crate::error::{Error, Result};
use crate::hasher::HashFunction;

/// HKDF (RFC 5869) instantiated with the cipher suite's hash.
#[derive(Clone)]
pub struct HKDF {
    hash: HashFunction,
}

impl HKDF {
    pub fn new(hash: HashFunction) -> Self {
        Self { hash }
    }

    pub fn hash(&self) -> HashFunction {
        self.hash
    }

    pub fn hash_size(&self) -> usize {
        self.hash.output_size()
    }

    pub fn extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
        match self.hash {
            HashFunction::SHA256 => {
                let (prk, _) = HkdfImpl::<Sha256>::extract(Some(salt), ikm);
                prk.to_vec()
            }
            HashFunction::SHA384 => {
                let (prk, _) = HkdfImpl::<Sha384>::extract(Some(salt), ikm);
                prk.to_vec()
            }
        }
    }

    /// Returns the OKM (output keying material).
    pub fn expand(&self, prk: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>> {
        let mut okm = vec![0u8; len];
        let res = match self.hash {
            HashFunction::SHA256 => HkdfImpl::<Sha256>::from_prk(prk)
                .map_err(|_| Error::InternalError("bad PRK length"))?
                .expand(info, &mut okm),
            HashFunction::SHA384 => HkdfImpl::<Sha384>::from_prk(prk)
                .map_err(|_| Error::InternalError("bad PRK length"))?
                .expand(info, &mut okm),
        };
        res.map_err(|_| Error::InternalError("HKDF output length too large"))?;
        Ok(okm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// RFC 5869 appendix A.1.
    #[test]
    fn extract_expand_sha256() {
        let hkdf = HKDF::new(HashFunction::SHA256);
        let ikm = hex!("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b");
        let salt = hex!("000102030405060708090a0b0c");
        let info = hex!("f0f1f2f3f4f5f6f7f8f9");

        let prk = hkdf.extract(&salt, &ikm);
        assert_eq!(
            prk,
            hex!("077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5")
        );

        let okm = hkdf.expand(&prk, &info, 42).unwrap();
        assert_eq!(
            okm,
            hex!("3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865")
        );
    }
}
