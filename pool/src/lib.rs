pub mod chain;
pub mod config;
pub mod error;
pub mod feed;
pub mod jobs;
pub mod metrics;
pub mod shares;
pub mod stratum;

pub use chain::{ChainPow, Grin};
pub use error::{PoolError, Result};
