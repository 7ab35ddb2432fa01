//! linear prediction for synthesized boundary material

pub mod extension;
pub mod predictor;

pub use extension::{extend_signal, FADE_LEN, FADE_WINDOW};
pub use predictor::LinearPredictor;
