pub mod crc32;
pub mod error;
pub mod sample;
pub mod settings;
pub mod types;

pub use crc32::compute as compute_crc32;
pub use error::{CodecError, SeamError, SeamResult};
pub use sample::{f32_to_i16, i16_to_f32, Sample, I16_SCALE};
pub use settings::Settings;
pub use types::*;
