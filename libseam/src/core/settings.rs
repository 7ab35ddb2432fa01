//! chunking settings and chunk geometry
//!
//! [`Settings`] is the single source of truth for chunk boundaries. All
//! sample counts are derived from it with integer arithmetic, and every
//! boundary computation elsewhere goes through [`Settings::chunk_start`] and
//! [`Settings::chunk_end`].

use serde::{Deserialize, Serialize};

use super::error::{SeamError, SeamResult};
use super::types::{is_supported_rate, MAX_BITRATE, MIN_BITRATE, SUPPORTED_RATES};

/// Immutable per-run configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SettingsDef", into = "SettingsDef")]
pub struct Settings {
    rate: u32,
    channels: u8,
    bitrate: u32,
    overlap: f64,
    length: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rate: 48000,
            channels: 2,
            bitrate: 256_000,
            overlap: 1.0e-3,
            length: 5.0,
        }
    }
}

impl Settings {
    /// Validated settings.
    ///
    /// # Arguments
    /// * `rate` - Sample rate, one of 8000, 12000, 16000, 24000, 48000
    /// * `channels` - 1 or 2
    /// * `bitrate` - Target bitrate in bits per second (500-512000)
    /// * `overlap` - Overlap between adjacent chunks in seconds
    /// * `length` - Nominal chunk length in seconds
    pub fn new(rate: u32, channels: u8, bitrate: u32, overlap: f64, length: f64) -> SeamResult<Self> {
        let settings = Settings {
            rate,
            channels,
            bitrate,
            overlap,
            length,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate settings from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> SeamResult<Self> {
        serde_json::from_str(json).map_err(|e| SeamError::invalid("json", e.to_string()))
    }

    fn validate(&self) -> SeamResult<()> {
        if !is_supported_rate(self.rate) {
            return Err(SeamError::invalid(
                "rate",
                format!("{} Hz is not one of {:?}", self.rate, SUPPORTED_RATES),
            ));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(SeamError::invalid(
                "channels",
                format!("{} channels, expected 1 or 2", self.channels),
            ));
        }
        if !(MIN_BITRATE..=MAX_BITRATE).contains(&self.bitrate) {
            return Err(SeamError::invalid(
                "bitrate",
                format!(
                    "{} bit/s is outside {}..={}",
                    self.bitrate, MIN_BITRATE, MAX_BITRATE
                ),
            ));
        }
        if !(self.overlap.is_finite() && self.overlap > 0.0) {
            return Err(SeamError::invalid("overlap", "must be a positive number of seconds"));
        }
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(SeamError::invalid("length", "must be a positive number of seconds"));
        }
        if self.overlap_samples() == 0 {
            return Err(SeamError::invalid(
                "overlap",
                format!("{}s is shorter than one sample at {} Hz", self.overlap, self.rate),
            ));
        }
        if self.length_samples() == 0 {
            return Err(SeamError::invalid(
                "length",
                format!("{}s is shorter than one sample at {} Hz", self.length, self.rate),
            ));
        }
        Ok(())
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    /// overlap in seconds
    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    /// nominal chunk length in seconds
    pub fn length(&self) -> f64 {
        self.length
    }

    /// overlap in samples. 48 for 1ms at 48000 Hz.
    pub fn overlap_samples(&self) -> u64 {
        (self.overlap * self.rate as f64).round() as u64
    }

    /// chunk length in samples. 240000 for 5s at 48000 Hz.
    pub fn length_samples(&self) -> u64 {
        (self.length * self.rate as f64).round() as u64
    }

    /// Maximum length of one chunk, both overlaps included
    pub fn total_length_samples(&self) -> u64 {
        self.length_samples() + 2 * self.overlap_samples()
    }

    /// distance between the ends of consecutive chunks
    pub fn period_samples(&self) -> u64 {
        self.length_samples() + self.overlap_samples()
    }

    /// First sample of chunk `idx`, leading overlap included
    pub fn chunk_start(&self, idx: u64) -> u64 {
        self.period_samples()
            .saturating_mul(idx)
            .saturating_sub(self.overlap_samples())
    }

    /// One past the last sample of chunk `idx`, trailing overlap included.
    /// Saturates at `u64::MAX` for chunks beyond the addressable range.
    pub fn chunk_end(&self, idx: u64) -> u64 {
        self.period_samples().saturating_mul(idx.saturating_add(1))
    }

    pub fn chunk_start_secs(&self, idx: u64) -> f64 {
        self.chunk_start(idx) as f64 / self.rate as f64
    }

    pub fn chunk_end_secs(&self, idx: u64) -> f64 {
        self.chunk_end(idx) as f64 / self.rate as f64
    }

    /// Index of the first chunk that can still be produced in full when
    /// reading resumes at `read_offset`.
    ///
    /// A chunk whose start lies behind the read offset is skipped; the index
    /// never moves backwards.
    pub fn next_chunk_index(&self, read_offset: u64) -> u64 {
        let idx = read_offset.saturating_add(self.overlap_samples()) / self.period_samples();
        if read_offset > self.chunk_start(idx) {
            idx + 1
        } else {
            idx
        }
    }
}

/// wire form of [`Settings`]; every decode goes through validation
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct SettingsDef {
    rate: u32,
    channels: u8,
    bitrate: u32,
    overlap: f64,
    length: f64,
}

impl Default for SettingsDef {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<Settings> for SettingsDef {
    fn from(s: Settings) -> Self {
        SettingsDef {
            rate: s.rate,
            channels: s.channels,
            bitrate: s.bitrate,
            overlap: s.overlap,
            length: s.length,
        }
    }
}

impl TryFrom<SettingsDef> for Settings {
    type Error = SeamError;

    fn try_from(d: SettingsDef) -> SeamResult<Self> {
        Settings::new(d.rate, d.channels, d.bitrate, d.overlap, d.length)
    }
}
