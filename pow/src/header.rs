/// Pre-pow header commitment
///
/// The stratum job carries the block header without its proof ("pre-pow").
/// Miners append a nonce and search for a cycle in the graph keyed by the
/// hash of `pre_pow || nonce`. All integer fields are big-endian.

use crate::error::{PowError, Result};

/// Exact serialized size of the pre-pow header.
pub const PRE_POW_SIZE: usize = 2 + 8 + 8 + 32 * 6 + 8 + 8 + 8 + 4;

/// Size of the proof input: pre-pow followed by the 8-byte nonce.
pub const PRE_PROOF_SIZE: usize = PRE_POW_SIZE + 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrePow {
    pub version: u16,
    pub height: u64,
    pub timestamp: i64,
    pub prev_hash: [u8; 32],
    pub prev_root: [u8; 32],
    pub output_root: [u8; 32],
    pub range_proof_root: [u8; 32],
    pub kernel_root: [u8; 32],
    pub total_kernel_offset: [u8; 32],
    pub output_mmr_size: u64,
    pub kernel_mmr_size: u64,
    pub total_difficulty: u64,
    pub secondary_scaling: u32,
    raw: [u8; PRE_POW_SIZE],
}

impl PrePow {
    /// Decode from raw bytes. The buffer must be exactly `PRE_POW_SIZE` long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRE_POW_SIZE {
            return Err(PowError::InvalidHeaderLength {
                expected: PRE_POW_SIZE,
                actual: bytes.len(),
            });
        }

        let mut raw = [0u8; PRE_POW_SIZE];
        raw.copy_from_slice(bytes);

        let mut r = Reader::new(bytes);
        Ok(Self {
            version: u16::from_be_bytes(r.array()?),
            height: u64::from_be_bytes(r.array()?),
            timestamp: i64::from_be_bytes(r.array()?),
            prev_hash: r.array()?,
            prev_root: r.array()?,
            output_root: r.array()?,
            range_proof_root: r.array()?,
            kernel_root: r.array()?,
            total_kernel_offset: r.array()?,
            output_mmr_size: u64::from_be_bytes(r.array()?),
            kernel_mmr_size: u64::from_be_bytes(r.array()?),
            total_difficulty: u64::from_be_bytes(r.array()?),
            secondary_scaling: u32::from_be_bytes(r.array()?),
            raw,
        })
    }

    /// Decode from a hex string (optional `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self> {
        let clean = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(clean).map_err(|e| PowError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.raw)
    }

    /// Proof input for a nonce: `pre_pow || nonce` (nonce big-endian).
    pub fn pre_proof(&self, nonce: u64) -> [u8; PRE_PROOF_SIZE] {
        let mut out = [0u8; PRE_PROOF_SIZE];
        out[..PRE_POW_SIZE].copy_from_slice(&self.raw);
        out[PRE_POW_SIZE..].copy_from_slice(&nonce.to_be_bytes());
        out
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self.buf.get(self.pos..end).ok_or(PowError::InvalidHeaderLength {
            expected: end,
            actual: self.buf.len(),
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }
}

/// Builder for test and tooling code that needs a well-formed header.
#[derive(Debug, Clone, Default)]
pub struct PrePowBuilder {
    pub version: u16,
    pub height: u64,
    pub timestamp: i64,
    pub total_difficulty: u64,
    pub secondary_scaling: u32,
    pub prev_hash: [u8; 32],
}

impl PrePowBuilder {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PRE_POW_SIZE);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.prev_hash);
        // prev_root, output_root, range_proof_root, kernel_root, total_kernel_offset
        out.extend_from_slice(&[0u8; 32 * 5]);
        out.extend_from_slice(&0u64.to_be_bytes());
        out.extend_from_slice(&0u64.to_be_bytes());
        out.extend_from_slice(&self.total_difficulty.to_be_bytes());
        out.extend_from_slice(&self.secondary_scaling.to_be_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn build(&self) -> Result<PrePow> {
        PrePow::from_bytes(&self.to_bytes())
    }
}
