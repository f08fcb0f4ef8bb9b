/// Chain capability set
///
/// Everything chain-specific the job and share pipeline needs: decoding the
/// header commitment carried in a template, verifying a proof against it and
/// grading the proof. The pipeline is generic over this trait so a job built
/// for one chain can never be checked with another chain's rules.

use grin_pow::{pow_difficulty, verify_pow, PrePow};
use std::fmt::Debug;

use crate::error::PoolError;

pub trait ChainPow: Debug + Clone + Send + Sync + 'static {
    /// Decoded fixed-size header commitment.
    type Header: Debug + Clone + Send + Sync;

    const NAME: &'static str;

    fn decode_header(bytes: &[u8]) -> Result<Self::Header, PoolError>;

    fn encode_header(header: &Self::Header) -> String;

    fn header_height(header: &Self::Header) -> u64;

    fn secondary_scaling(header: &Self::Header) -> u32;

    /// Structural and cryptographic check of a proof. Never panics on bad input.
    fn verify_proof(header: &Self::Header, nonce: u64, edge_bits: u8, proof: &[u64]) -> bool;

    fn compute_difficulty(height: u64, edge_bits: u8, secondary_scaling: u32, proof: &[u64]) -> u64;
}

/// Grin primary proofs (Cuckatoo31 and up). C29 secondary shares are rejected
/// as unverifiable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grin;

impl ChainPow for Grin {
    type Header = PrePow;

    const NAME: &'static str = "grin";

    fn decode_header(bytes: &[u8]) -> Result<PrePow, PoolError> {
        PrePow::from_bytes(bytes).map_err(|e| PoolError::MalformedTemplate(e.to_string()))
    }

    fn encode_header(header: &PrePow) -> String {
        header.to_hex()
    }

    fn header_height(header: &PrePow) -> u64 {
        header.height
    }

    fn secondary_scaling(header: &PrePow) -> u32 {
        header.secondary_scaling
    }

    fn verify_proof(header: &PrePow, nonce: u64, edge_bits: u8, proof: &[u64]) -> bool {
        verify_pow(header, nonce, edge_bits, proof).is_ok()
    }

    fn compute_difficulty(height: u64, edge_bits: u8, _secondary_scaling: u32, proof: &[u64]) -> u64 {
        pow_difficulty(height, edge_bits, proof)
    }
}
