pub mod bindings;
pub mod config;
pub mod local;
pub mod processing;
pub mod utils;

pub use config::{Config, PredictorConfig, ProcessorConfig};
pub use processing::predictor::{DetectorState, SpikePredictor, StateSnapshot, StepOutput};
