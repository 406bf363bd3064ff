use std::time::SystemTime;

use bytes::Bytes;
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::extensions::SignatureScheme;

/// Signs handshake transcripts with the private key behind the local
/// certificate. Key decoding (PEM/DER/PKCS#8) happens outside the core; a
/// connection only sees this object.
pub trait Signer: Send + Sync {
    fn scheme(&self) -> SignatureScheme;

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// ECDSA over P-256 with SHA-256, producing ASN.1 DER signatures as TLS
/// requires.
pub struct EcdsaSecp256r1Signer {
    key: p256::ecdsa::SigningKey,
}

impl EcdsaSecp256r1Signer {
    pub fn new(key: p256::ecdsa::SigningKey) -> Self {
        Self { key }
    }

    pub fn random() -> Self {
        Self {
            key: p256::ecdsa::SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        Ok(Self {
            key: p256::ecdsa::SigningKey::from_slice(secret)
                .map_err(|_| Error::InternalError("invalid P-256 signing key"))?,
        })
    }

    /// SEC1 uncompressed encoding of the corresponding public key.
    pub fn public_key(&self) -> Vec<u8> {
        use p256::elliptic_curve::sec1::ToEncodedPoint;
        self.key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }
}

impl Signer for EcdsaSecp256r1Signer {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::ecdsa_secp256r1_sha256
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature: p256::ecdsa::Signature = self.key.sign(message);
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

/// RSASSA-PSS with SHA-256 and a salt the length of the digest.
pub struct RsaPssSha256Signer {
    key: rsa::RsaPrivateKey,
}

impl RsaPssSha256Signer {
    pub fn new(key: rsa::RsaPrivateKey) -> Self {
        Self { key }
    }
}

impl Signer for RsaPssSha256Signer {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::rsa_pss_rsae_sha256
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let hashed = Sha256::digest(message);
        self.key
            .sign_with_rng(&mut OsRng, rsa::Pss::new::<Sha256>(), &hashed)
            .map_err(|_| Error::InternalError("RSA-PSS signing failed"))
    }
}

/// Public key of the peer as extracted from its certificate by the
/// certificate verifier.
#[derive(Debug, Clone)]
pub enum PeerPublicKey {
    /// SEC1 encoded P-256 point.
    EcdsaSecp256r1(Vec<u8>),
    /// SEC1 encoded P-384 point.
    EcdsaSecp384r1(Vec<u8>),
    /// PKCS#1 DER encoded RSA public key.
    Rsa(Vec<u8>),
}

/// Checks a CertificateVerify style signature against the peer's public key.
pub fn verify_signature(
    scheme: SignatureScheme,
    public_key: &PeerPublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    match (scheme, public_key) {
        (SignatureScheme::ecdsa_secp256r1_sha256, PeerPublicKey::EcdsaSecp256r1(point)) => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| Error::BadCertificate("malformed P-256 public key"))?;
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| Error::DecryptError("malformed ECDSA signature"))?;
            key.verify(message, &sig)
                .map_err(|_| Error::DecryptError("ECDSA signature mismatch"))
        }
        (SignatureScheme::ecdsa_secp384r1_sha384, PeerPublicKey::EcdsaSecp384r1(point)) => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| Error::BadCertificate("malformed P-384 public key"))?;
            let sig = p384::ecdsa::Signature::from_der(signature)
                .map_err(|_| Error::DecryptError("malformed ECDSA signature"))?;
            use p384::ecdsa::signature::Verifier;
            key.verify(message, &sig)
                .map_err(|_| Error::DecryptError("ECDSA signature mismatch"))
        }
        (SignatureScheme::rsa_pss_rsae_sha256, PeerPublicKey::Rsa(der)) => {
            let key = rsa::RsaPublicKey::from_pkcs1_der(der)
                .map_err(|_| Error::BadCertificate("malformed RSA public key"))?;
            let hashed = Sha256::digest(message);
            key.verify(rsa::Pss::new::<Sha256>(), &hashed, signature)
                .map_err(|_| Error::DecryptError("RSA-PSS signature mismatch"))
        }
        _ => Err(Error::HandshakeFailure(
            "signature scheme does not match the peer's key type",
        )),
    }
}

/// Validates the peer's certificate chain and extracts the end entity
/// public key. X.509 parsing and path building live behind this trait.
pub trait CertificateVerifier: Send + Sync {
    fn verify(
        &self,
        chain: &[Bytes],
        server_name: Option<&str>,
        now: SystemTime,
    ) -> Result<PeerPublicKey>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdsa_sign_verify_round_trip() {
        let signer = EcdsaSecp256r1Signer::random();
        let public = PeerPublicKey::EcdsaSecp256r1(signer.public_key());

        let sig = signer.sign(b"transcript goes here").unwrap();
        verify_signature(
            SignatureScheme::ecdsa_secp256r1_sha256,
            &public,
            b"transcript goes here",
            &sig,
        )
        .unwrap();

        assert!(verify_signature(
            SignatureScheme::ecdsa_secp256r1_sha256,
            &public,
            b"some other message",
            &sig,
        )
        .is_err());
    }

    #[test]
    fn scheme_key_mismatch_is_rejected() {
        let signer = EcdsaSecp256r1Signer::random();
        let public = PeerPublicKey::EcdsaSecp256r1(signer.public_key());
        let sig = signer.sign(b"m").unwrap();

        assert!(matches!(
            verify_signature(SignatureScheme::rsa_pss_rsae_sha256, &public, b"m", &sig),
            Err(Error::HandshakeFailure(_))
        ));
    }
}
