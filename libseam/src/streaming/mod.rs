//! frame encoder
//!
//! turns a push stream of raw samples into fixed size codec frames with
//! synthesized boundary frames and consistent granule positions
mod encoder;
mod types;

pub use encoder::FrameEncoder;
pub use types::EncoderOptions;
