//! HTTP client for the remote analysis service.
//!
//! One [`JobClient`] wraps a pooled `reqwest::Client` and may be shared by
//! any number of concurrent job loops; it carries no per-job mutable state.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::multipart;
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use crate::config::{RequestConfig, ServiceConfig};
use crate::error::{ClientError, ClientResult, Error};
use crate::model::{CircuitElement, CircuitModel, ElementKind, ModelDocument, Parameter, ParsedTree};
use crate::result::{FitResult, ResultParser};

use super::job::Job;
use super::types::{
    DataSource, FitParameters, JobDescriptor, JobMode, JobStatus, ServiceIdentity,
    SimulationParameters, Spectrum, StartReply, StatusReply,
};

/// Client for the analysis service REST interface
#[derive(Clone)]
pub struct JobClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    request_config: RequestConfig,
}

/// Everything a completed fit produces
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// The terminal job, including its message log.
    pub job: Job,
    /// Per-parameter statistics bound to the model's ordering.
    pub result: FitResult,
    /// The model document with fitted parameter values.
    pub fitted_model: ModelDocument,
    /// Spectrum simulated from the fitted model.
    pub simulated: Spectrum,
    /// The spectrum subset actually used for fitting.
    pub samples: Spectrum,
}

impl JobClient {
    /// Create a new client
    pub fn new(config: &ServiceConfig, request_config: RequestConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the service identity via `GET /id`.
    pub async fn identity(&self) -> ClientResult<ServiceIdentity> {
        self.retry("identity", move || async move {
            let url = format!("{}/id", self.base_url);
            let response = self.get(&url).send().await.map_err(ClientError::Http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(self.map_status(status, response.text().await.ok(), None));
            }
            response
                .json::<ServiceIdentity>()
                .await
                .map_err(|e| ClientError::InvalidResponse {
                    message: format!("failed to parse identity: {e}"),
                })
        })
        .await
    }

    /// Whether the service is reachable and licensed.
    pub async fn is_online(&self) -> bool {
        match self.identity().await {
            Ok(identity) if identity.license_status == "invalid" => {
                info!("analysis service online - license invalid");
                false
            }
            Ok(_) => {
                info!("analysis service online");
                true
            }
            Err(e) => {
                info!(error = %e, "analysis service offline");
                false
            }
        }
    }

    /// Submit a job: spectrum (fit jobs), model, and descriptor.
    ///
    /// Option bounds and unrecognized options are validated locally before
    /// any network call. Under [`JobMode::Block`] the returned future
    /// resolves only once the job reaches a terminal state, and a remote
    /// `Failed`/`Error` surfaces as an error with the full message log;
    /// under [`JobMode::Queued`] it resolves immediately after enqueueing.
    /// `timeout` bounds the block-mode wait locally; the remote job is
    /// unaffected.
    pub async fn submit(
        &self,
        spectrum: Option<&Spectrum>,
        model: &CircuitModel,
        descriptor: JobDescriptor,
        timeout: Option<Duration>,
    ) -> Result<Job, Error> {
        descriptor.validate()?;
        let effective = descriptor.effective();

        let model_bytes = model.to_document_bytes()?;
        let model_name = format!("{}.json", model.name());
        let descriptor_json =
            serde_json::to_string(&descriptor).map_err(|e| ClientError::InvalidDescriptor {
                message: e.to_string(),
            })?;

        let reply: StartReply = self
            .retry("job submit", move || {
                let model_bytes = model_bytes.clone();
                let model_name = model_name.clone();
                let descriptor_json = descriptor_json.clone();
                async move {
                    let mut form = multipart::Form::new();
                    if let Some(spectrum) = spectrum {
                        form = form.part(
                            "eis-file",
                            multipart::Part::bytes(spectrum.bytes.clone())
                                .file_name(spectrum.file_name.clone()),
                        );
                    }
                    form = form
                        .part(
                            "model-file",
                            multipart::Part::bytes(model_bytes).file_name(model_name),
                        )
                        .part("job", multipart::Part::text(descriptor_json));

                    let url = format!("{}/job/start", self.base_url);
                    let response = self
                        .with_key(self.client.post(&url))
                        .multipart(form)
                        .send()
                        .await
                        .map_err(ClientError::Http)?;
                    let status = response.status();
                    if !status.is_success() {
                        return Err(self.map_status(status, response.text().await.ok(), None));
                    }
                    response
                        .json::<StartReply>()
                        .await
                        .map_err(|e| ClientError::InvalidResponse {
                            message: format!("failed to parse start reply: {e}"),
                        })
                }
            })
            .await?;

        info!(job_id = %reply.job_id, status = %reply.status, "job submitted");

        let mut job = Job::new(
            reply.job_id,
            descriptor.job,
            descriptor.mode,
            reply.status,
            reply.parameters.unwrap_or(effective.parameters),
        );

        if job.status() == JobStatus::Failed || job.status() == JobStatus::Error {
            error!(job_id = %job.id(), status = %job.status(), "job rejected at submission");
            return Err(job.remote_failure().into());
        }

        if descriptor.mode == JobMode::Block {
            self.wait(&mut job, timeout).await?;
            if job.status() != JobStatus::Done {
                return Err(job.remote_failure().into());
            }
        }
        Ok(job)
    }

    /// Poll the job's status once and merge the reply into it.
    ///
    /// Pure poll step: scheduling is the caller's concern, so the same
    /// logic serves thread-based and event-loop concurrency unchanged.
    pub async fn poll(&self, job: &mut Job) -> ClientResult<JobStatus> {
        let reply = self.poll_raw(job.id(), job.polled_ok()).await?;
        debug!(job_id = %job.id(), status = %reply.status, "job status");
        job.apply(reply)?;
        Ok(job.status())
    }

    /// Poll until the job is terminal, with bounded exponential backoff.
    ///
    /// `timeout` is purely local: when it elapses, polling stops and the
    /// remote job is left running (there is no cancel operation).
    pub async fn wait(&self, job: &mut Job, timeout: Option<Duration>) -> ClientResult<JobStatus> {
        let started = Instant::now();
        let mut interval = Duration::from_millis(self.request_config.poll_interval_ms);
        let cap = Duration::from_millis(self.request_config.poll_max_interval_ms);

        loop {
            let status = self.poll(job).await?;
            if status.is_terminal() {
                info!(
                    job_id = %job.id(),
                    status = %status,
                    elapsed_ms = started.elapsed().as_millis(),
                    "job reached terminal state"
                );
                return Ok(status);
            }
            if let Some(timeout) = timeout {
                if started.elapsed() >= timeout {
                    warn!(job_id = %job.id(), "local polling timeout, remote job keeps running");
                    return Err(ClientError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            }
            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(cap);
        }
    }

    /// Fetch the fitted model document; the job must be done.
    pub async fn fetch_model(&self, job: &Job) -> ClientResult<ModelDocument> {
        self.ensure_done(job)?;
        let body = self
            .fetch_artifact(job, "model")
            .await?;
        let text = String::from_utf8(body).map_err(|e| ClientError::InvalidResponse {
            message: format!("model document is not UTF-8: {e}"),
        })?;
        ModelDocument::from_json(&text).map_err(|e| ClientError::InvalidResponse {
            message: format!("failed to parse fitted model: {e}"),
        })
    }

    /// Fetch the simulated spectrum; the job must be done.
    pub async fn fetch_simulation(&self, job: &Job) -> ClientResult<Spectrum> {
        self.ensure_done(job)?;
        let bytes = self.fetch_artifact(job, "simulation").await?;
        Ok(Spectrum::new("fitted_simulated.ism", bytes))
    }

    /// Fetch the spectrum subset used for fitting; the job must be done.
    pub async fn fetch_samples(&self, job: &Job) -> ClientResult<Spectrum> {
        self.ensure_done(job)?;
        let bytes = self.fetch_artifact(job, "samples").await?;
        Ok(Spectrum::new("fit_samples.ism", bytes))
    }

    /// Fit a model to a spectrum and collect every artifact.
    ///
    /// Submits in block mode, binds the fit-result statistics to the
    /// model's element/parameter ordering, and downloads the fitted model,
    /// the simulated spectrum, and the fit-input samples.
    pub async fn fit(
        &self,
        model: &CircuitModel,
        spectrum: &Spectrum,
        fit_parameters: FitParameters,
        simulation_parameters: SimulationParameters,
        timeout: Option<Duration>,
    ) -> Result<FitOutcome, Error> {
        let descriptor = JobDescriptor::fit(JobMode::Block)
            .with_fit(fit_parameters)
            .with_simulation(simulation_parameters);
        let job = self
            .submit(Some(spectrum), model, descriptor, timeout)
            .await?;

        let raw = job.result().cloned().ok_or_else(|| {
            ClientError::InvalidResponse {
                message: format!("job {} is done but carries no result", job.id()),
            }
        })?;
        let result = ResultParser::new(model).bind(&raw)?;

        let fitted_model = self.fetch_model(&job).await?;
        let simulated = self.fetch_simulation(&job).await?;
        let samples = self.fetch_samples(&job).await?;

        Ok(FitOutcome {
            job,
            result,
            fitted_model,
            simulated,
            samples,
        })
    }

    /// Simulate a spectrum from a model.
    pub async fn simulate(
        &self,
        model: &CircuitModel,
        parameters: SimulationParameters,
        timeout: Option<Duration>,
    ) -> Result<Spectrum, Error> {
        let descriptor = JobDescriptor::simulate(JobMode::Block).with_simulation(parameters);
        let job = self.submit(None, model, descriptor, timeout).await?;
        Ok(self.fetch_simulation(&job).await?)
    }

    /// Run the ZHIT reconstruction on a spectrum.
    ///
    /// A fit against a single-resistor placeholder model with
    /// `DataSource=zhit`; everything except the fit-input samples is
    /// discarded.
    pub async fn zhit(
        &self,
        spectrum: &Spectrum,
        mut parameters: FitParameters,
        timeout: Option<Duration>,
    ) -> Result<Spectrum, Error> {
        parameters.data_source = Some(DataSource::Zhit);
        let descriptor = JobDescriptor::fit(JobMode::Block).with_fit(parameters);
        let model = placeholder_model()?;
        let job = self
            .submit(Some(spectrum), &model, descriptor, timeout)
            .await?;
        Ok(self.fetch_samples(&job).await?)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn poll_raw(&self, job_id: &str, known: bool) -> ClientResult<StatusReply> {
        self.retry("status poll", move || async move {
            let url = format!("{}/job/{}/status", self.base_url, job_id);
            let response = self.get(&url).send().await.map_err(ClientError::Http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(self.map_status(
                    status,
                    response.text().await.ok(),
                    Some((job_id, known)),
                ));
            }
            response
                .json::<StatusReply>()
                .await
                .map_err(|e| ClientError::InvalidResponse {
                    message: format!("failed to parse status reply: {e}"),
                })
        })
        .await
    }

    async fn fetch_artifact(&self, job: &Job, artifact: &str) -> ClientResult<Vec<u8>> {
        self.retry(artifact, move || async move {
            let url = format!("{}/job/{}/{}", self.base_url, job.id(), artifact);
            let response = self.get(&url).send().await.map_err(ClientError::Http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(self.map_status(
                    status,
                    response.text().await.ok(),
                    Some((job.id(), job.polled_ok())),
                ));
            }
            let bytes = response.bytes().await.map_err(ClientError::Http)?;
            Ok(bytes.to_vec())
        })
        .await
    }

    fn ensure_done(&self, job: &Job) -> ClientResult<()> {
        match job.status() {
            JobStatus::Done => Ok(()),
            JobStatus::Failed | JobStatus::Error => Err(job.remote_failure()),
            status => Err(ClientError::NotReady {
                job_id: job.id().to_string(),
                status,
            }),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.with_key(self.client.get(url))
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.query(&[("key", key)]),
            None => builder,
        }
    }

    // HTTP status to error taxonomy. A 404 on an id that polled fine
    // before means the job fell out of the server's retention window.
    fn map_status(
        &self,
        status: StatusCode,
        body: Option<String>,
        job: Option<(&str, bool)>,
    ) -> ClientError {
        match status.as_u16() {
            401 => ClientError::AuthRequired,
            402 => ClientError::LicenseInvalid,
            404 => match job {
                Some((job_id, known)) => ClientError::JobNotFound {
                    job_id: job_id.to_string(),
                    evicted: known,
                },
                None => ClientError::InvalidResponse {
                    message: format!("unexpected 404: {}", body.unwrap_or_default()),
                },
            },
            code => ClientError::InvalidResponse {
                message: format!("HTTP {code}: {}", body.unwrap_or_default()),
            },
        }
    }

    // Transport-level retry with exponential backoff, the definitive
    // errors (auth, license, not-found) pass through untouched.
    async fn retry<T, Fut>(
        &self,
        what: &str,
        mut attempt_fn: impl FnMut() -> Fut,
    ) -> ClientResult<T>
    where
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    operation = what,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            match attempt_fn().await {
                Ok(value) => {
                    debug!(
                        operation = what,
                        latency_ms = start.elapsed().as_millis(),
                        "request succeeded"
                    );
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    error!(
                        operation = what,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "request failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClientError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
            retries,
        })
    }
}

// Single fixed 100 Ω resistor, the fit target for ZHIT runs where only the
// preprocessed input samples matter.
fn placeholder_model() -> Result<CircuitModel, Error> {
    let resistor = CircuitElement::new(
        ElementKind::Resistor,
        "R0",
        vec![Parameter {
            index: 0,
            value: 100.0,
            fixed: true,
        }],
    )
    .map_err(Error::Model)?;
    Ok(CircuitModel::from_tree(
        "zhit-placeholder",
        ParsedTree::Element(resistor),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = ServiceConfig {
            base_url: "http://127.0.0.1:8081/".to_string(),
            api_key: Some("test-key".to_string()),
        };
        let client = JobClient::new(&config, RequestConfig::default());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "http://127.0.0.1:8081");
    }

    #[test]
    fn test_placeholder_model_is_single_resistor() {
        let model = placeholder_model().unwrap();
        let elements = model.elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].name(), "R0");
        assert_eq!(elements[0].is_fixed(0), Some(true));
    }
}
