//! Fits `y = weight * x + bias` to six points on `y = 2x` with `burn`, then exports the
//! fitted model as an ONNX graph.
//!
//! ## Module Structure
//!
//! - [`model`]: the one-feature linear model and its config
//! - [`data`]: the fixed in-memory dataset
//! - [`training`]: training configuration and the full-batch SGD loop
//! - [`onnx`]: tracing, constant folding, export, inspection and execution of ONNX files
//! - [`pipeline`]: the train, report, export sequence the `linear-onnx` binary runs

pub mod data;
pub mod error;
pub mod model;
pub mod onnx;
pub mod pipeline;
pub mod training;

pub use data::RegressionDataset;
pub use error::TrainingError;
pub use model::{LearnedParameters, LinearRegression, LinearRegressionConfig};
pub use pipeline::{run, PipelineConfig, PipelineOutcome};
pub use training::{sgd_session, EpochRecord, TrainingConfig, TrainingSession, TrainingSummary};
