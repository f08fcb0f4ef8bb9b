/// Job lifecycle
///
/// Template notifications become immutable jobs; published jobs are shared
/// with share checks through reference-counted handles carrying the stale flag.

pub mod job;
pub mod repository;
pub mod template;

pub use job::{Job, JobHandle};
pub use repository::{JobNotify, JobRepository};
pub use template::{parse_template, RawTemplate};
