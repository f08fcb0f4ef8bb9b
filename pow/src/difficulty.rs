/// Share difficulty for cycle proofs
///
/// difficulty = graph_weight * 2^64 / hash(proof). All intermediate math is
/// done in u128 and saturates at u64::MAX.

use blake2::Digest;

use crate::siphash::Blake2b256;

/// Edge bits that carry a graph weight of `2 * edge_bits`.
pub const BASE_EDGE_BITS: u8 = 24;

/// Blocks per hour at one block per minute.
pub const HOUR_HEIGHT: u64 = 60;
pub const DAY_HEIGHT: u64 = 24 * HOUR_HEIGHT;
pub const WEEK_HEIGHT: u64 = 7 * DAY_HEIGHT;
pub const YEAR_HEIGHT: u64 = 52 * WEEK_HEIGHT;

/// Weight of a primary graph. C31 decays by one edge bit per week after the first year.
pub fn graph_weight(height: u64, edge_bits: u8) -> u64 {
    let shift = match edge_bits.checked_sub(BASE_EDGE_BITS) {
        Some(s) if s < 63 => s,
        _ => return 0,
    };

    let mut xpr_edge_bits = edge_bits as u64;
    if edge_bits == 31 && height >= YEAR_HEIGHT {
        xpr_edge_bits = xpr_edge_bits.saturating_sub(1 + (height - YEAR_HEIGHT) / WEEK_HEIGHT);
    }

    (2u64 << shift).saturating_mul(xpr_edge_bits)
}

/// Pack the proof at `edge_bits` bits per element, little-endian bit order.
pub fn pack_proof(edge_bits: u8, proof: &[u64]) -> Vec<u8> {
    let width = edge_bits as usize;
    let mut packed = vec![0u8; (proof.len() * width + 7) / 8];
    for (n, &edge) in proof.iter().enumerate() {
        for bit in 0..width {
            if (edge >> bit) & 1 == 1 {
                let pos = n * width + bit;
                packed[pos / 8] |= 1 << (pos % 8);
            }
        }
    }
    packed
}

/// First 8 bytes (big-endian) of the blake2b-256 digest of the packed proof.
pub fn proof_hash(edge_bits: u8, proof: &[u64]) -> u64 {
    let digest = Blake2b256::digest(pack_proof(edge_bits, proof));
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

pub fn scaled_difficulty(scale: u64, hash: u64) -> u64 {
    let diff = ((scale as u128) << 64) / (hash.max(1) as u128);
    diff.min(u64::MAX as u128) as u64
}

/// Difficulty credited to a primary proof.
pub fn pow_difficulty(height: u64, edge_bits: u8, proof: &[u64]) -> u64 {
    scaled_difficulty(graph_weight(height, edge_bits), proof_hash(edge_bits, proof))
}
