/// SipHash-2-4 keyed on the blake2b digest of the proof input.
///
/// Only the single-word variant used for edge endpoint generation is needed,
/// so this is a fixed-input implementation rather than a `Hasher`.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

pub type Blake2b256 = Blake2b<U32>;

/// Derive the four SipHash keys from the proof input (`pre_pow || nonce`).
pub fn siphash_keys(pre_proof: &[u8]) -> [u64; 4] {
    let digest = Blake2b256::digest(pre_proof);
    let mut keys = [0u64; 4];
    for (i, chunk) in digest.chunks_exact(8).enumerate() {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        keys[i] = u64::from_le_bytes(word);
    }
    keys
}

pub fn siphash24(keys: &[u64; 4], nonce: u64) -> u64 {
    let mut state = SipState::new(keys);
    state.3 ^= nonce;
    state.round();
    state.round();
    state.0 ^= nonce;
    state.2 ^= 0xff;
    for _ in 0..4 {
        state.round();
    }
    state.digest()
}

struct SipState(u64, u64, u64, u64);

impl SipState {
    fn new(keys: &[u64; 4]) -> Self {
        SipState(keys[0], keys[1], keys[2], keys[3])
    }

    fn round(&mut self) {
        self.0 = self.0.wrapping_add(self.1);
        self.2 = self.2.wrapping_add(self.3);
        self.1 = self.1.rotate_left(13);
        self.3 = self.3.rotate_left(16);
        self.1 ^= self.0;
        self.3 ^= self.2;
        self.0 = self.0.rotate_left(32);
        self.2 = self.2.wrapping_add(self.1);
        self.0 = self.0.wrapping_add(self.3);
        self.1 = self.1.rotate_left(17);
        self.3 = self.3.rotate_left(21);
        self.1 ^= self.2;
        self.3 ^= self.0;
        self.2 = self.2.rotate_left(32);
    }

    fn digest(&self) -> u64 {
        (self.0 ^ self.1) ^ (self.2 ^ self.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siphash_deterministic() {
        let keys = [1, 2, 3, 4];
        assert_eq!(siphash24(&keys, 10), siphash24(&keys, 10));
    }

    #[test]
    fn test_siphash_depends_on_nonce_and_keys() {
        let keys = [1, 2, 3, 4];
        assert_ne!(siphash24(&keys, 10), siphash24(&keys, 11));
        assert_ne!(siphash24(&keys, 10), siphash24(&[4, 3, 2, 1], 10));
    }

    #[test]
    fn test_keys_from_input() {
        let a = siphash_keys(b"header-a");
        let b = siphash_keys(b"header-b");
        assert_ne!(a, b);
        assert_eq!(a, siphash_keys(b"header-a"));
    }
}
