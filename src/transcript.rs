use crate::hasher::HashFunction;

/// Synthetic handshake type standing in for ClientHello1 after a
/// HelloRetryRequest (RFC 8446 4.4.1).
const MESSAGE_HASH: u8 = 254;

/// Accumulates the raw bytes of every handshake message seen during the
/// handshake, in wire order and excluding record framing.
///
/// The buffer is append-only except for the single privileged rewrite used
/// when a HelloRetryRequest replaces ClientHello1 with its hash.
pub struct Transcript {
    buffer: Vec<u8>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { buffer: vec![] }
    }

    /// Appends one full handshake message (type + length + body).
    pub fn push(&mut self, message: &[u8]) {
        self.buffer.extend_from_slice(message);
    }

    pub fn hash(&self, hash: HashFunction) -> Vec<u8> {
        hash.digest(&self.buffer)
    }

    /// Hash of the transcript with additional message bytes appended, without
    /// committing them. Used for PSK binders over a truncated ClientHello.
    pub fn hash_with(&self, hash: HashFunction, extra: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.buffer.len() + extra.len());
        buf.extend_from_slice(&self.buffer);
        buf.extend_from_slice(extra);
        hash.digest(&buf)
    }

    /// Hash of the transcript with the final 'truncate' bytes of the last
    /// message removed. Used by a server verifying the binders of a
    /// ClientHello that is already in the transcript.
    pub fn hash_truncating(&self, hash: HashFunction, truncate: usize) -> Vec<u8> {
        assert!(truncate <= self.buffer.len());
        hash.digest(&self.buffer[..self.buffer.len() - truncate])
    }

    /// On HelloRetryRequest, the transcript restarts as
    /// 'message_hash || 00 00 Hash.length || Hash(ClientHello1)'.
    ///
    /// Must be called after ClientHello1 is the only message present and
    /// before the HelloRetryRequest itself is appended.
    pub fn rewrite_for_hello_retry(&mut self, hash: HashFunction) {
        let digest = hash.digest(&self.buffer);
        self.buffer.clear();
        self.buffer.push(MESSAGE_HASH);
        self.buffer
            .extend_from_slice(&(digest.len() as u32).to_be_bytes()[1..4]);
        self.buffer.extend_from_slice(&digest);
    }

    /// The full transcript is only needed until the handshake completes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_retry_rewrite() {
        let mut t = Transcript::new();
        t.push(&[1, 0, 0, 2, 0xAA, 0xBB]);
        t.rewrite_for_hello_retry(HashFunction::SHA256);

        let expected_digest = HashFunction::SHA256.digest(&[1, 0, 0, 2, 0xAA, 0xBB]);
        let mut expected = vec![254, 0, 0, 32];
        expected.extend_from_slice(&expected_digest);

        assert_eq!(t.hash(HashFunction::SHA256), HashFunction::SHA256.digest(&expected));
    }

    #[test]
    fn any_mutation_changes_the_hash() {
        let mut a = Transcript::new();
        let mut b = Transcript::new();
        a.push(&[1, 0, 0, 1, 0x55]);
        b.push(&[1, 0, 0, 1, 0x54]);
        assert_ne!(a.hash(HashFunction::SHA256), b.hash(HashFunction::SHA256));
    }

    #[test]
    fn truncating_hash_matches_prefix() {
        let mut t = Transcript::new();
        t.push(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(
            t.hash_truncating(HashFunction::SHA256, 2),
            HashFunction::SHA256.digest(&[1, 2, 3, 4])
        );
    }
}
