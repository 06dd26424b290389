//! Content addressing for upload bytes.
//!
//! Every stored blob is identified by the SHA-1 of its bytes, hex encoded.
//! The digest is computed once, while the bytes are staged, and never
//! recomputed from the record afterwards.

use sha1::{Digest, Sha1};

/// Length of a hex-encoded content hash.
pub const SHA1_HEX_LEN: usize = 40;

/// Incremental content digest. Feed chunks as they arrive so ingestion can
/// hash and stage bytes in a single pass over the stream.
#[derive(Default)]
pub struct ContentDigest {
    hasher: Sha1,
}

impl ContentDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Consume the digest and return the lowercase hex hash.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// One-shot digest of an in-memory payload.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Whether `s` is a full hex content hash.
pub fn is_sha1_hex(s: &str) -> bool {
    s.len() == SHA1_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_known_vectors() {
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn digest_is_deterministic() {
        let payload = b"the same bytes every time";
        assert_eq!(sha1_hex(payload), sha1_hex(payload));
    }

    #[test]
    fn incremental_digest_matches_one_shot() {
        let mut digest = ContentDigest::new();
        digest.update(b"hello ");
        digest.update(b"world");
        assert_eq!(digest.finalize_hex(), sha1_hex(b"hello world"));
    }

    #[test]
    fn digest_ignores_chunk_boundaries() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut digest = ContentDigest::new();
        for chunk in payload.chunks(313) {
            digest.update(chunk);
        }
        assert_eq!(digest.finalize_hex(), sha1_hex(&payload));
    }

    #[test]
    fn recognizes_hex_hashes() {
        assert!(is_sha1_hex("a9993e364706816aba3e25717850c26c9cd0d89d"));
        assert!(!is_sha1_hex("a9993e36"));
        assert!(!is_sha1_hex("z9993e364706816aba3e25717850c26c9cd0d89d"));
    }
}
