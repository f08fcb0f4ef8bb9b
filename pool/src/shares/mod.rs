/// Mining shares module
///
/// Handles share grading against published jobs and reporting of block
/// solutions to the result channel.

pub mod processor;
pub mod reporter;
pub mod share;
pub mod validator;

pub use processor::{ShareOutcome, ShareProcessor};
pub use reporter::{
    filter_worker_name, ChannelSink, RedisSolvedShareSink, ResultReporter, SolvedShareRecord, SolvedShareSink,
};
pub use share::{DifficultyLadder, Share, ShareStatus, WorkerIdentity};
pub use validator::{PolicyFlags, ShareValidator};
