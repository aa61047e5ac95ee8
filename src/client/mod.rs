//! Remote job client: submission, polling, and artifact retrieval.

mod http;
mod job;
/// Wire types for the analysis service REST protocol.
pub mod types;

pub use http::{FitOutcome, JobClient};
pub use job::Job;
pub use types::{
    DataSource, FitParameters, JobDescriptor, JobKind, JobMessage, JobMode, JobParameters,
    JobStatus, ServiceIdentity, SimulationParameters, Spectrum, StartReply, StatusReply,
};
