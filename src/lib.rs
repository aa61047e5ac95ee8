//! # EIS Analysis
//!
//! Client library for equivalent-circuit analysis of electrochemical
//! impedance spectra (EIS) through a remote fitting service.
//!
//! ## Features
//!
//! - **Circuit Models**: Typed circuit elements with parameter validation,
//!   stored as serial/parallel graphs and reconstructed into nesting trees
//! - **Model Documents**: JSON serialization of circuit models with a
//!   cached tree that is verified against the authoritative graph
//! - **Job Client**: Async HTTP client for submitting fit, simulation and
//!   ZHIT jobs, polling their progress and retrieving result artifacts
//! - **Result Binding**: Fit statistics bound back to the submitted
//!   model's element and parameter ordering
//!
//! ## Architecture
//!
//! ```text
//! CircuitModel ←→ ModelDocument (JSON)
//!        ↓
//!    JobClient → Fitting Service (HTTP)
//!        ↓
//!    FitResult (per-parameter statistics)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use eis_analysis::{Config, FitParameters, JobClient, ModelDocument, Spectrum};
//! use eis_analysis::client::types::SimulationParameters;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = JobClient::new(&config.service, config.request)?;
//!     let spectrum = Spectrum::from_file("battery.ism").await?;
//!     let model = ModelDocument::from_json(&std::fs::read("rc.model")?)?.into_model()?;
//!     let outcome = client
//!         .fit(
//!             &model,
//!             &spectrum,
//!             FitParameters::default(),
//!             SimulationParameters::default(),
//!             None,
//!         )
//!         .await?;
//!     println!("overall error: {}", outcome.result.overall.overall_error);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// HTTP job client, job state tracking and wire types.
pub mod client;
/// Configuration loaded from environment variables.
pub mod config;
/// Error types and result aliases for the library.
pub mod error;
/// Circuit elements, model graphs, parsed trees and documents.
pub mod model;
/// Binding of fit statistics to a model's ordering.
pub mod result;

pub use client::{
    DataSource, FitOutcome, FitParameters, Job, JobClient, JobDescriptor, JobKind, JobMode,
    JobStatus, SimulationParameters, Spectrum,
};
pub use config::Config;
pub use error::{AppResult, Error};
pub use model::{CircuitElement, CircuitModel, ElementKind, ModelDocument, ParsedTree};
pub use result::{FitResult, ResultParser};
