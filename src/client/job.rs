//! The job value object and its monotonic status state machine.

use serde_json::Value;

use crate::error::{ClientError, ClientResult};

use super::types::{JobKind, JobMessage, JobMode, JobParameters, JobStatus, StatusReply};

/// One remote fitting/simulation job.
///
/// Created by [`JobClient::submit`](super::JobClient::submit) and owned by
/// the caller. Status transitions are monotonic: `Pending < Running <
/// {Done, Failed, Error}`, and a terminal status never changes again.
#[derive(Debug, Clone)]
pub struct Job {
    id: String,
    kind: JobKind,
    mode: JobMode,
    status: JobStatus,
    parameters: JobParameters,
    messages: Vec<JobMessage>,
    result: Option<Value>,
    polled_ok: bool,
}

impl Job {
    pub(crate) fn new(
        id: String,
        kind: JobKind,
        mode: JobMode,
        status: JobStatus,
        parameters: JobParameters,
    ) -> Self {
        Self {
            id,
            kind,
            mode,
            status,
            parameters,
            messages: Vec::new(),
            result: None,
            polled_ok: false,
        }
    }

    /// The server-issued opaque job token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The evaluation kind.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// The submission mode.
    pub fn mode(&self) -> JobMode {
        self.mode
    }

    /// The last observed status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// The effective parameters echoed by the service.
    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    /// The accumulated message log, oldest first.
    pub fn messages(&self) -> &[JobMessage] {
        &self.messages
    }

    /// The fit result JSON, present once the job is done.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Whether a status poll for this id ever succeeded.
    ///
    /// Distinguishes a later 404 as eviction from the retention window
    /// rather than an unknown id.
    pub fn polled_ok(&self) -> bool {
        self.polled_ok
    }

    /// Merge a status reply into the job.
    ///
    /// Rejects status regressions (the server guarantees monotonicity, so
    /// a regression means a protocol violation) and appends the message
    /// suffix. The result is captured only at `Done`.
    pub fn apply(&mut self, reply: StatusReply) -> ClientResult<()> {
        let current = self.status;
        let incoming = reply.status;

        let regressed = incoming.rank() < current.rank()
            || (current.is_terminal() && incoming != current);
        if regressed {
            return Err(ClientError::InvalidResponse {
                message: format!(
                    "job {} status regressed from {current} to {incoming}",
                    self.id
                ),
            });
        }

        if reply.messages.len() > self.messages.len() {
            self.messages
                .extend_from_slice(&reply.messages[self.messages.len()..]);
        }
        if let Some(parameters) = reply.parameters {
            self.parameters = parameters;
        }
        if incoming == JobStatus::Done {
            if let Some(result) = reply.result {
                self.result = Some(result);
            }
        }
        self.status = incoming;
        self.polled_ok = true;
        Ok(())
    }

    /// The message log flattened to one line per entry.
    pub fn log_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{} {}", m.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"), m.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Error for a job that ended in `Failed` or `Error`.
    pub(crate) fn remote_failure(&self) -> ClientError {
        ClientError::RemoteJob {
            job_id: self.id.clone(),
            status: self.status,
            log: self.log_text(),
        }
    }
}
