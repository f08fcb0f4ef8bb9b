//! # grin-pow
//!
//! Cuckatoo cycle proof verification for pool-side share checking.
//!
//! The pool never searches for cycles; it only decodes the pre-pow header of
//! a job, checks a miner's proof against `pre_pow || nonce`, and grades the
//! proof with the chain's difficulty formula.

pub mod cuckatoo;
pub mod difficulty;
pub mod error;
pub mod header;
pub mod siphash;

pub use cuckatoo::{is_supported_edge_bits, verify_pow, Cuckatoo, MAX_EDGE_BITS, MIN_EDGE_BITS, PROOF_SIZE};
pub use difficulty::{graph_weight, pow_difficulty, proof_hash, scaled_difficulty};
pub use error::{PowError, Result};
pub use header::{PrePow, PrePowBuilder, PRE_POW_SIZE, PRE_PROOF_SIZE};
