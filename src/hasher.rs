use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384};

/// Hash function fixed by the negotiated cipher suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashFunction {
    SHA256,
    SHA384,
}

impl HashFunction {
    pub fn output_size(&self) -> usize {
        match self {
            HashFunction::SHA256 => 32,
            HashFunction::SHA384 => 48,
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashFunction::SHA256 => Sha256::digest(data).to_vec(),
            HashFunction::SHA384 => Sha384::digest(data).to_vec(),
        }
    }

    pub fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            HashFunction::SHA256 => {
                let mut mac =
                    Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashFunction::SHA384 => {
                let mut mac =
                    Hmac::<Sha384>::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn empty_digests() {
        assert_eq!(
            HashFunction::SHA256.digest(b""),
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(HashFunction::SHA384.digest(b"").len(), 48);
    }

    #[test]
    fn hmac_sha256_rfc4231_case_2() {
        let out = HashFunction::SHA256.hmac(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            out,
            hex!("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
        );
    }
}
