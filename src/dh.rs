use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// An (EC)DHE key exchange function.
pub trait DiffieHellmanFn: Send + Sync {
    /// Generates a secret value. This value must never be sent to another
    /// agent.
    fn secret_value(&self) -> Result<Vec<u8>>;

    /// For a secret value, produces the corresponding public value which can
    /// be safely sent to another agent.
    fn public_value(&self, secret: &[u8]) -> Result<Vec<u8>>;

    /// Given our secret and the other agent's public value, produces the
    /// shared secret known to both parties.
    fn shared_secret(&self, remote_public: &[u8], local_secret: &[u8]) -> Result<Vec<u8>>;
}

/// x25519 (RFC 7748).
pub struct X25519;

impl DiffieHellmanFn for X25519 {
    fn secret_value(&self) -> Result<Vec<u8>> {
        let secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
        Ok(secret.to_bytes().to_vec())
    }

    fn public_value(&self, secret: &[u8]) -> Result<Vec<u8>> {
        let secret = x25519_secret(secret)?;
        Ok(x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec())
    }

    fn shared_secret(&self, remote_public: &[u8], local_secret: &[u8]) -> Result<Vec<u8>> {
        let secret = x25519_secret(local_secret)?;
        let public: [u8; 32] = remote_public
            .try_into()
            .map_err(|_| Error::IllegalParameter("x25519 public value must be 32 bytes"))?;

        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(public));
        if !shared.was_contributory() {
            return Err(Error::IllegalParameter("low order x25519 public value"));
        }
        Ok(shared.as_bytes().to_vec())
    }
}

fn x25519_secret(secret: &[u8]) -> Result<x25519_dalek::StaticSecret> {
    let bytes: [u8; 32] = secret
        .try_into()
        .map_err(|_| Error::InternalError("x25519 secret of wrong length"))?;
    Ok(x25519_dalek::StaticSecret::from(bytes))
}

/// NIST P-256 ECDHE. Public values use the uncompressed SEC1 point encoding;
/// the shared secret is the 32 byte big-endian X coordinate with leading
/// zeros preserved.
pub struct Secp256r1;

impl DiffieHellmanFn for Secp256r1 {
    fn secret_value(&self) -> Result<Vec<u8>> {
        let secret = p256::SecretKey::random(&mut OsRng);
        Ok(secret.to_bytes().to_vec())
    }

    fn public_value(&self, secret: &[u8]) -> Result<Vec<u8>> {
        let secret = p256::SecretKey::from_slice(secret)
            .map_err(|_| Error::InternalError("invalid P-256 secret"))?;
        Ok(secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }

    fn shared_secret(&self, remote_public: &[u8], local_secret: &[u8]) -> Result<Vec<u8>> {
        let secret = p256::SecretKey::from_slice(local_secret)
            .map_err(|_| Error::InternalError("invalid P-256 secret"))?;
        let public = p256::PublicKey::from_sec1_bytes(remote_public)
            .map_err(|_| Error::IllegalParameter("invalid P-256 key share encoding"))?;

        let shared =
            p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
        Ok(shared.raw_secret_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_agreement(group: &dyn DiffieHellmanFn) {
        let a = group.secret_value().unwrap();
        let b = group.secret_value().unwrap();
        let a_pub = group.public_value(&a).unwrap();
        let b_pub = group.public_value(&b).unwrap();

        let s1 = group.shared_secret(&b_pub, &a).unwrap();
        let s2 = group.shared_secret(&a_pub, &b).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(s1.len(), 32);
    }

    #[test]
    fn x25519_agreement() {
        check_agreement(&X25519);
    }

    #[test]
    fn secp256r1_agreement() {
        check_agreement(&Secp256r1);
    }

    #[test]
    fn secp256r1_rejects_garbage_point() {
        let secret = Secp256r1.secret_value().unwrap();
        assert!(Secp256r1.shared_secret(&[4u8; 65], &secret).is_err());
    }
}
