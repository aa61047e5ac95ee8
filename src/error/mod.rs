use thiserror::Error;

use crate::client::types::JobStatus;

/// Top-level errors for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Result error: {0}")]
    Result(#[from] ResultError),
}

/// Circuit model errors: graph topology and element validation
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Malformed topology: {message}")]
    Parse { message: String },

    #[error("Validation failed for {element}: {reason}")]
    Validation { element: String, reason: String },

    #[error("Unknown element kind: {kind}")]
    UnknownKind { kind: String },

    #[error("Document error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remote job client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API key required or incorrect")]
    AuthRequired,

    #[error("Service license invalid")]
    LicenseInvalid,

    #[error("Job {job_id} not found (evicted: {evicted})")]
    JobNotFound { job_id: String, evicted: bool },

    #[error("Job {job_id} not ready: status is {status}")]
    NotReady { job_id: String, status: JobStatus },

    #[error("Remote job {job_id} ended with status {status}: {log}")]
    RemoteJob {
        job_id: String,
        status: JobStatus,
        log: String,
    },

    #[error("Invalid job descriptor: {message}")]
    InvalidDescriptor { message: String },

    #[error("Polling timed out after {timeout_ms}ms (remote job left running)")]
    Timeout { timeout_ms: u64 },

    #[error("Service unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fit result binding errors
#[derive(Debug, Error)]
pub enum ResultError {
    #[error("Incomplete result: element {element} missing from response")]
    MissingElement { element: String },

    #[error("Incomplete result: parameter {parameter} of {element} missing from response")]
    MissingParameter { element: String, parameter: String },

    #[error("Malformed result JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether the error is transient and a retry may succeed.
    ///
    /// Auth, license, and not-found failures are definitive; only
    /// transport-level failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Http(_) | ClientError::InvalidResponse { .. }
        )
    }
}

/// Result type alias for top-level operations
pub type AppResult<T> = Result<T, Error>;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for result binding
pub type BindResult<T> = Result<T, ResultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_display() {
        let err = ModelError::Parse {
            message: "two roots remain".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed topology: two roots remain");

        let err = ModelError::Validation {
            element: "CPE0".to_string(),
            reason: "parameter 1 out of bounds".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation failed for CPE0: parameter 1 out of bounds"
        );

        let err = ModelError::UnknownKind {
            kind: "memristor".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown element kind: memristor");
    }

    #[test]
    fn test_client_error_display() {
        let err = ClientError::AuthRequired;
        assert_eq!(err.to_string(), "API key required or incorrect");

        let err = ClientError::JobNotFound {
            job_id: "job-42".to_string(),
            evicted: true,
        };
        assert_eq!(err.to_string(), "Job job-42 not found (evicted: true)");

        let err = ClientError::Timeout { timeout_ms: 5000 };
        assert_eq!(
            err.to_string(),
            "Polling timed out after 5000ms (remote job left running)"
        );

        let err = ClientError::Unavailable {
            message: "connection refused".to_string(),
            retries: 3,
        };
        assert_eq!(
            err.to_string(),
            "Service unavailable: connection refused (retries: 3)"
        );
    }

    #[test]
    fn test_result_error_display() {
        let err = ResultError::MissingElement {
            element: "R1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Incomplete result: element R1 missing from response"
        );

        let err = ResultError::MissingParameter {
            element: "CPE0".to_string(),
            parameter: "α".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Incomplete result: parameter α of CPE0 missing from response"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(!ClientError::AuthRequired.is_retryable());
        assert!(!ClientError::LicenseInvalid.is_retryable());
        assert!(!ClientError::JobNotFound {
            job_id: "x".to_string(),
            evicted: false
        }
        .is_retryable());
        assert!(ClientError::InvalidResponse {
            message: "truncated body".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_error_conversions() {
        let model_err = ModelError::Parse {
            message: "cycle".to_string(),
        };
        let err: Error = model_err.into();
        assert!(matches!(err, Error::Model(_)));

        let client_err = ClientError::LicenseInvalid;
        let err: Error = client_err.into();
        assert!(matches!(err, Error::Client(_)));

        let result_err = ResultError::MissingElement {
            element: "L0".to_string(),
        };
        let err: Error = result_err.into();
        assert!(matches!(err, Error::Result(_)));
    }
}
