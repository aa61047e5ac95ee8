//! Wire types for the analysis service REST protocol.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Default upper frequency limit in Hz.
pub const DEFAULT_UPPER_FREQUENCY_LIMIT: f64 = 2e6;
/// Default lower frequency limit in Hz.
pub const DEFAULT_LOWER_FREQUENCY_LIMIT: f64 = 1e-2;
/// Default smoothness factor.
pub const DEFAULT_SMOOTHNESS: f64 = 2e-4;
/// Default sample count.
pub const DEFAULT_NUMBER_OF_SAMPLES: u32 = 100;

/// Kind of remote evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Fit the model against a measured spectrum.
    #[serde(rename = "EvalEis.Fit")]
    Fit,
    /// Simulate a spectrum from the model.
    #[serde(rename = "EvalEis.Sim")]
    Simulate,
}

/// Submission mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Return immediately after enqueueing.
    Queued,
    /// Await terminal status before returning (still enqueued server-side).
    Block,
}

/// Which variant of the input spectrum a fit is computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Raw measured data.
    Original,
    /// Smoothed data.
    Smoothed,
    /// Phase-reconstructed (ZHIT) data.
    Zhit,
}

/// Optional fit overrides.
///
/// Unrecognized option keys are rejected at deserialization time, before
/// any network call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitParameters {
    /// Upper frequency limit in Hz, must be positive. Default 2e6.
    #[serde(rename = "UpperFrequencyLimit", skip_serializing_if = "Option::is_none")]
    pub upper_frequency_limit: Option<f64>,
    /// Lower frequency limit in Hz, must be positive. Default 1e-2.
    #[serde(rename = "LowerFrequencyLimit", skip_serializing_if = "Option::is_none")]
    pub lower_frequency_limit: Option<f64>,
    /// Spectrum variant the fit runs against. Default original.
    #[serde(rename = "DataSource", skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,
    /// Smoothing factor in [0,1]. Default 2e-4.
    #[serde(rename = "Smoothness", skip_serializing_if = "Option::is_none")]
    pub smoothness: Option<f64>,
    /// Number of samples, at least 5. Default 100.
    #[serde(rename = "NumberOfSamples", skip_serializing_if = "Option::is_none")]
    pub number_of_samples: Option<u32>,
}

/// Optional simulation overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationParameters {
    /// Upper frequency limit in Hz, must be positive. Default 2e6.
    #[serde(rename = "UpperFrequencyLimit", skip_serializing_if = "Option::is_none")]
    pub upper_frequency_limit: Option<f64>,
    /// Lower frequency limit in Hz, must be positive. Default 1e-2.
    #[serde(rename = "LowerFrequencyLimit", skip_serializing_if = "Option::is_none")]
    pub lower_frequency_limit: Option<f64>,
    /// Number of samples, at least 5. Default 100.
    #[serde(rename = "NumberOfSamples", skip_serializing_if = "Option::is_none")]
    pub number_of_samples: Option<u32>,
}

/// Nested fit/simulation parameter block of a job descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    /// Fit overrides, fit jobs only.
    #[serde(rename = "Fit", skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitParameters>,
    /// Simulation overrides.
    #[serde(rename = "Simulation", skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationParameters>,
}

/// One fitting/simulation request descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Evaluation kind.
    pub job: JobKind,
    /// Submission mode.
    pub mode: JobMode,
    /// Nested overrides.
    pub parameters: JobParameters,
}

/// Job lifecycle status as reported by the service.
///
/// Carries a total order `Pending < Running < terminal`; terminal states
/// never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Enqueued, not yet started.
    Pending,
    /// Computation in progress.
    Running,
    /// Finished successfully; artifacts are available.
    Done,
    /// The computation itself failed.
    Failed,
    /// The service reported an error processing the job.
    Error,
}

/// One timestamped log line of a job, millisecond precision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Server-side timestamp.
    pub timestamp: DateTime<Utc>,
    /// Log text.
    pub text: String,
}

/// Reply to `POST /job/start`
#[derive(Debug, Clone, Deserialize)]
pub struct StartReply {
    /// Server-issued opaque job token.
    #[serde(rename = "job-id")]
    pub job_id: String,
    /// Initial status.
    pub status: JobStatus,
    /// Effective parameters after applying defaults.
    #[serde(default)]
    pub parameters: Option<JobParameters>,
}

/// Reply to `GET /job/{id}/status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReply {
    /// Current status.
    pub status: JobStatus,
    /// Full message log so far.
    #[serde(default)]
    pub messages: Vec<JobMessage>,
    /// Effective parameters.
    #[serde(default)]
    pub parameters: Option<JobParameters>,
    /// Fit result JSON, present only when status is done.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

/// Reply to `GET /id`
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceIdentity {
    /// Build identifier.
    #[serde(default)]
    pub build: Option<String>,
    /// Service version.
    #[serde(default)]
    pub version: Option<String>,
    /// License state, `invalid` when unlicensed.
    #[serde(rename = "license-status")]
    pub license_status: String,
    /// Service status.
    pub status: String,
}

/// An impedance spectrum, opaque to this crate.
///
/// Passed through as a blob on upload and received back as a blob on
/// artifact download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spectrum {
    /// File name forwarded with the upload.
    pub file_name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl Spectrum {
    /// Wrap raw spectrum file content.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a spectrum file from disk, keeping its file name for upload.
    pub async fn from_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "spectrum.ism".to_string());
        Ok(Self { file_name, bytes })
    }
}

impl JobStatus {
    /// Whether the status is terminal (done, failed, or error).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Error)
    }

    /// Position in the fixed status ordering.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Done | JobStatus::Failed | JobStatus::Error => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl JobDescriptor {
    /// Descriptor for a fit job.
    pub fn fit(mode: JobMode) -> Self {
        Self {
            job: JobKind::Fit,
            mode,
            parameters: JobParameters::default(),
        }
    }

    /// Descriptor for a simulation job.
    pub fn simulate(mode: JobMode) -> Self {
        Self {
            job: JobKind::Simulate,
            mode,
            parameters: JobParameters::default(),
        }
    }

    /// Attach fit overrides.
    pub fn with_fit(mut self, fit: FitParameters) -> Self {
        self.parameters.fit = Some(fit);
        self
    }

    /// Attach simulation overrides.
    pub fn with_simulation(mut self, simulation: SimulationParameters) -> Self {
        self.parameters.simulation = Some(simulation);
        self
    }

    /// Validate all option bounds locally.
    pub fn validate(&self) -> ClientResult<()> {
        if let Some(fit) = &self.parameters.fit {
            fit.validate()?;
        }
        if let Some(simulation) = &self.parameters.simulation {
            simulation.validate()?;
        }
        Ok(())
    }

    /// The descriptor with defaults filled into every absent option.
    pub fn effective(&self) -> Self {
        let mut effective = self.clone();
        if self.job == JobKind::Fit {
            effective.parameters.fit =
                Some(effective.parameters.fit.unwrap_or_default().effective());
        }
        effective.parameters.simulation = Some(
            effective
                .parameters
                .simulation
                .unwrap_or_default()
                .effective(),
        );
        effective
    }
}

impl FitParameters {
    /// Parse fit overrides from loose JSON, rejecting unrecognized keys.
    pub fn from_value(value: serde_json::Value) -> ClientResult<Self> {
        serde_json::from_value(value).map_err(|e| ClientError::InvalidDescriptor {
            message: e.to_string(),
        })
    }

    /// Check option bounds.
    pub fn validate(&self) -> ClientResult<()> {
        check_frequency_limits(self.upper_frequency_limit, self.lower_frequency_limit)?;
        if let Some(smoothness) = self.smoothness {
            if !(0.0..=1.0).contains(&smoothness) {
                return Err(ClientError::InvalidDescriptor {
                    message: format!("Smoothness must be in [0,1], got {smoothness}"),
                });
            }
        }
        check_sample_count(self.number_of_samples)?;
        Ok(())
    }

    /// The parameters with defaults filled into every absent option.
    pub fn effective(&self) -> Self {
        Self {
            upper_frequency_limit: Some(
                self.upper_frequency_limit
                    .unwrap_or(DEFAULT_UPPER_FREQUENCY_LIMIT),
            ),
            lower_frequency_limit: Some(
                self.lower_frequency_limit
                    .unwrap_or(DEFAULT_LOWER_FREQUENCY_LIMIT),
            ),
            data_source: Some(self.data_source.unwrap_or(DataSource::Original)),
            smoothness: Some(self.smoothness.unwrap_or(DEFAULT_SMOOTHNESS)),
            number_of_samples: Some(
                self.number_of_samples.unwrap_or(DEFAULT_NUMBER_OF_SAMPLES),
            ),
        }
    }
}

impl SimulationParameters {
    /// Parse simulation overrides from loose JSON, rejecting unrecognized keys.
    pub fn from_value(value: serde_json::Value) -> ClientResult<Self> {
        serde_json::from_value(value).map_err(|e| ClientError::InvalidDescriptor {
            message: e.to_string(),
        })
    }

    /// Check option bounds.
    pub fn validate(&self) -> ClientResult<()> {
        check_frequency_limits(self.upper_frequency_limit, self.lower_frequency_limit)?;
        check_sample_count(self.number_of_samples)?;
        Ok(())
    }

    /// The parameters with defaults filled into every absent option.
    pub fn effective(&self) -> Self {
        Self {
            upper_frequency_limit: Some(
                self.upper_frequency_limit
                    .unwrap_or(DEFAULT_UPPER_FREQUENCY_LIMIT),
            ),
            lower_frequency_limit: Some(
                self.lower_frequency_limit
                    .unwrap_or(DEFAULT_LOWER_FREQUENCY_LIMIT),
            ),
            number_of_samples: Some(
                self.number_of_samples.unwrap_or(DEFAULT_NUMBER_OF_SAMPLES),
            ),
        }
    }
}

fn check_frequency_limits(upper: Option<f64>, lower: Option<f64>) -> ClientResult<()> {
    for (name, value) in [
        ("UpperFrequencyLimit", upper),
        ("LowerFrequencyLimit", lower),
    ] {
        if let Some(value) = value {
            if !(value > 0.0) {
                return Err(ClientError::InvalidDescriptor {
                    message: format!("{name} must be positive, got {value}"),
                });
            }
        }
    }
    if let (Some(upper), Some(lower)) = (upper, lower) {
        if upper <= lower {
            return Err(ClientError::InvalidDescriptor {
                message: format!(
                    "UpperFrequencyLimit ({upper}) must exceed LowerFrequencyLimit ({lower})"
                ),
            });
        }
    }
    Ok(())
}

fn check_sample_count(samples: Option<u32>) -> ClientResult<()> {
    if let Some(samples) = samples {
        if samples < 5 {
            return Err(ClientError::InvalidDescriptor {
                message: format!("NumberOfSamples must be at least 5, got {samples}"),
            });
        }
    }
    Ok(())
}
