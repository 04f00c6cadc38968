pub mod filter;
pub mod predictor;
pub mod ring;
