/// Cuckatoo cycle verification
///
/// A proof is a list of `proof_size` edge indices of a bipartite graph with
/// `2^edge_bits` edges. Each edge's endpoints come from SipHash keyed on the
/// proof input. The proof is valid when the edges are strictly ascending,
/// within the edge mask and form exactly one cycle through all of them.

use crate::error::{PowError, Result};
use crate::header::PrePow;
use crate::siphash::{siphash24, siphash_keys};

/// Number of edges in a production proof.
pub const PROOF_SIZE: usize = 42;

/// Smallest edge bits accepted for the primary proof.
pub const MIN_EDGE_BITS: u8 = 31;

/// Largest edge bits representable with a 64-bit edge mask.
pub const MAX_EDGE_BITS: u8 = 63;

/// Primary Cuckatoo sizes only. C29 secondary proofs use the Cuckaroo graph
/// family and are not verified by this crate.
pub fn is_supported_edge_bits(edge_bits: u8) -> bool {
    (MIN_EDGE_BITS..=MAX_EDGE_BITS).contains(&edge_bits)
}

/// Graph parameters for one edge-bit size.
#[derive(Debug, Clone, Copy)]
pub struct Cuckatoo {
    edge_bits: u8,
    proof_size: usize,
    edge_mask: u64,
}

impl Cuckatoo {
    /// `edge_bits` must be in `1..=63`.
    pub fn new(edge_bits: u8, proof_size: usize) -> Result<Self> {
        if edge_bits == 0 || edge_bits > MAX_EDGE_BITS {
            return Err(PowError::Verification("edge bits out of range"));
        }
        if proof_size == 0 || proof_size % 2 != 0 {
            return Err(PowError::Verification("proof size must be even"));
        }
        Ok(Self {
            edge_bits,
            proof_size,
            edge_mask: (1u64 << edge_bits) - 1,
        })
    }

    pub fn edge_bits(&self) -> u8 {
        self.edge_bits
    }

    pub fn edge_mask(&self) -> u64 {
        self.edge_mask
    }

    /// Endpoint of `edge` on side `uorv` (0 = u, 1 = v).
    pub fn sipnode(&self, keys: &[u64; 4], edge: u64, uorv: u64) -> u64 {
        siphash24(keys, 2 * edge + uorv) & self.edge_mask
    }

    pub fn verify(&self, keys: &[u64; 4], proof: &[u64]) -> Result<()> {
        if proof.len() != self.proof_size {
            return Err(PowError::Verification("wrong proof length"));
        }

        let size = self.proof_size;
        let mut uvs = vec![0u64; 2 * size];
        let mut xor0 = 0u64;
        let mut xor1 = 0u64;

        for (n, &edge) in proof.iter().enumerate() {
            if edge > self.edge_mask {
                return Err(PowError::Verification("edge too big"));
            }
            if n > 0 && edge <= proof[n - 1] {
                return Err(PowError::Verification("edges not ascending"));
            }
            uvs[2 * n] = self.sipnode(keys, edge, 0);
            uvs[2 * n + 1] = self.sipnode(keys, edge, 1);
            xor0 ^= uvs[2 * n];
            xor1 ^= uvs[2 * n + 1];
        }
        if xor0 | xor1 != 0 {
            return Err(PowError::Verification("endpoints don't match up"));
        }

        // follow the cycle from edge 0; every endpoint must be shared by exactly one other edge
        let mut n = 0;
        let mut i = 0;
        loop {
            let mut j = i;
            let mut k = i;
            loop {
                k = (k + 2) % (2 * size);
                if k == i {
                    break;
                }
                if uvs[k] == uvs[i] {
                    if j != i {
                        return Err(PowError::Verification("branch in cycle"));
                    }
                    j = k;
                }
            }
            if j == i {
                return Err(PowError::Verification("cycle dead ends"));
            }
            i = j ^ 1;
            n += 1;
            if i == 0 {
                break;
            }
        }

        if n == size {
            Ok(())
        } else {
            Err(PowError::Verification("cycle too short"))
        }
    }
}

/// Verify a production-size proof for `pre_pow || nonce`.
pub fn verify_pow(pre_pow: &PrePow, nonce: u64, edge_bits: u8, proof: &[u64]) -> Result<()> {
    if !is_supported_edge_bits(edge_bits) {
        return Err(PowError::Verification("unsupported edge bits"));
    }
    if proof.len() != PROOF_SIZE {
        return Err(PowError::Verification("wrong proof length"));
    }
    let keys = siphash_keys(&pre_pow.pre_proof(nonce));
    let result = Cuckatoo::new(edge_bits, PROOF_SIZE)?.verify(&keys, proof);
    if let Err(e) = &result {
        log::trace!("cuckatoo{} proof rejected: {}", edge_bits, e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::PrePowBuilder;

    fn header() -> PrePow {
        PrePowBuilder { height: 100, secondary_scaling: 1, ..Default::default() }
            .build()
            .unwrap()
    }

    /// Brute-force a 2-cycle in a 4-edge graph: two edges sharing both endpoints.
    fn find_two_cycle(graph: &Cuckatoo) -> Option<([u64; 4], Vec<u64>)> {
        let pre_pow = header();
        for nonce in 0..10_000u64 {
            let keys = siphash_keys(&pre_pow.pre_proof(nonce));
            for a in 0..=graph.edge_mask() {
                for b in (a + 1)..=graph.edge_mask() {
                    if graph.sipnode(&keys, a, 0) == graph.sipnode(&keys, b, 0)
                        && graph.sipnode(&keys, a, 1) == graph.sipnode(&keys, b, 1)
                    {
                        return Some((keys, vec![a, b]));
                    }
                }
            }
        }
        None
    }

    #[test]
    fn test_supported_edge_bits() {
        assert!(!is_supported_edge_bits(29));
        assert!(is_supported_edge_bits(31));
        assert!(is_supported_edge_bits(32));
        assert!(!is_supported_edge_bits(30));
        assert!(!is_supported_edge_bits(12));
        assert!(!is_supported_edge_bits(64));
    }

    #[test]
    fn test_small_cycle_verifies() {
        let graph = Cuckatoo::new(2, 2).unwrap();
        let (keys, proof) = find_two_cycle(&graph).expect("a 2-cycle exists for some nonce");
        assert_eq!(graph.verify(&keys, &proof), Ok(()));
    }

    #[test]
    fn test_small_cycle_order_matters() {
        let graph = Cuckatoo::new(2, 2).unwrap();
        let (keys, proof) = find_two_cycle(&graph).unwrap();
        let reversed: Vec<u64> = proof.iter().rev().copied().collect();
        assert_eq!(
            graph.verify(&keys, &reversed),
            Err(PowError::Verification("edges not ascending"))
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        let p = header();
        let proof: Vec<u64> = (1..=41).collect();
        assert_eq!(
            verify_pow(&p, 0, 31, &proof),
            Err(PowError::Verification("wrong proof length"))
        );
    }

    #[test]
    fn test_unsupported_edge_bits_rejected() {
        let p = header();
        let proof: Vec<u64> = (1..=42).collect();
        assert_eq!(
            verify_pow(&p, 0, 30, &proof),
            Err(PowError::Verification("unsupported edge bits"))
        );
    }

    #[test]
    fn test_secondary_edge_bits_rejected() {
        let p = header();
        let proof: Vec<u64> = (1..=42).collect();
        assert_eq!(
            verify_pow(&p, 0, 29, &proof),
            Err(PowError::Verification("unsupported edge bits"))
        );
    }

    #[test]
    fn test_edge_too_big_rejected() {
        let p = header();
        let mut proof: Vec<u64> = (1..=42).collect();
        proof[41] = 1u64 << 31;
        assert_eq!(
            verify_pow(&p, 0, 31, &proof),
            Err(PowError::Verification("edge too big"))
        );
    }

    #[test]
    fn test_duplicate_edges_rejected() {
        let p = header();
        let mut proof: Vec<u64> = (1..=42).collect();
        proof[5] = proof[4];
        assert_eq!(
            verify_pow(&p, 0, 31, &proof),
            Err(PowError::Verification("edges not ascending"))
        );
    }

    #[test]
    fn test_random_proof_rejected() {
        let p = header();
        let proof: Vec<u64> = (0..42).map(|i| i * 1000 + 7).collect();
        assert!(verify_pow(&p, 42, 31, &proof).is_err());
    }

    #[test]
    fn test_bad_graph_params() {
        assert!(Cuckatoo::new(0, 42).is_err());
        assert!(Cuckatoo::new(64, 42).is_err());
        assert!(Cuckatoo::new(31, 41).is_err());
    }
}
