/// Stratum session boundary
///
/// The miner-facing transport lives outside this crate. It asks a
/// `ConnectionFactory` for one session per accepted connection and drives the
/// session with job notifications and share submissions.

pub mod connection;

pub use connection::{ConnectionContext, ConnectionFactory, GrinSession, GrinSessionFactory};
