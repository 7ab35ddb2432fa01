//! common types for seam

// constants

/// Sample rates accepted by the codec
pub const SUPPORTED_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Time base of container granule positions, independent of the coded rate
pub const REFERENCE_RATE: u32 = 48000;

/// frame duration in milliseconds
pub const FRAME_MS: u32 = 20;

/// Lowest accepted target bitrate in bits per second
pub const MIN_BITRATE: u32 = 500;

/// Highest accepted target bitrate in bits per second
pub const MAX_BITRATE: u32 = 512_000;

/// Default predictor order
pub const LPC_ORDER: usize = 24;

/// Tag holding the number of samples to cross-fade at the start of a chunk
pub const TAG_CROSSFADE_IN: &str = "CF_IN";

/// Tag holding the number of samples to cross-fade at the end of a chunk
pub const TAG_CROSSFADE_OUT: &str = "CF_OUT";

/// samples in one frame at the given rate
pub const fn frame_size(rate: u32) -> usize {
    (FRAME_MS * rate / 1000) as usize
}

/// is this a rate the codec can run at?
pub fn is_supported_rate(rate: u32) -> bool {
    SUPPORTED_RATES.contains(&rate)
}

/// Multiplier from samples at `rate` to granule units
pub fn granule_multiplier(rate: u32) -> u64 {
    (REFERENCE_RATE / rate) as u64
}

// types

/// Ordered key/value pairs written to the container comment header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    pub fn new() -> Self {
        Tags(Vec::new())
    }

    /// append a pair, keeping insertion order
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    /// first value stored under `key`
    ///
    /// Keys compare case-insensitively, as comment field names do in Vorbis
    /// style comment headers.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn crossfade_in(&self) -> Option<usize> {
        self.get(TAG_CROSSFADE_IN).and_then(|v| v.parse().ok())
    }

    pub fn crossfade_out(&self) -> Option<usize> {
        self.get(TAG_CROSSFADE_OUT).and_then(|v| v.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (k, v) in iter {
            tags.push(k, v);
        }
        tags
    }
}

/// Layout of raw interleaved sample bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// signed 16 bit, little endian
    S16Le,
    /// 32 bit IEEE float, little endian
    F32Le,
}

impl SampleFormat {
    /// bytes per single-channel sample
    pub fn bytes(self) -> usize {
        match self {
            SampleFormat::S16Le => 2,
            SampleFormat::F32Le => 4,
        }
    }

    /// decode one little endian sample to a normalized float
    pub fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            SampleFormat::S16Le => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
            SampleFormat::F32Le => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}

impl std::str::FromStr for SampleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s16le" | "s16" => Ok(SampleFormat::S16Le),
            "f32le" | "f32" => Ok(SampleFormat::F32Le),
            other => Err(format!("unknown sample format `{}` (use s16le or f32le)", other)),
        }
    }
}
