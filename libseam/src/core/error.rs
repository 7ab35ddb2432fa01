//! error types for seam

use thiserror::Error;

/// A rejection reported by a [`FrameCodec`](crate::codec::FrameCodec).
///
/// The variants follow the status codes of the Opus reference encoder so
/// that any libopus binding can map onto them one to one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// One or more invalid or out of range arguments
    #[error("invalid or out of range argument: {0}")]
    BadArg(String),
    /// Not enough bytes allocated in the output buffer
    #[error("output buffer too small")]
    BufferTooSmall,
    /// An internal error was detected
    #[error("internal codec error: {0}")]
    InternalError(String),
    /// The compressed data passed is corrupted
    #[error("corrupted packet")]
    InvalidPacket,
    /// Invalid or unsupported request
    #[error("unsupported request")]
    Unimplemented,
    /// Encoder state is invalid or already freed
    #[error("encoder state is invalid")]
    InvalidState,
    /// Memory allocation has failed
    #[error("memory allocation failed")]
    AllocFail,
    /// Anything the codec reports that has no better match
    #[error("codec error: {0}")]
    Other(String),
}

/// Errors raised by the segmenting pipeline
#[derive(Debug, Error)]
pub enum SeamError {
    /// A configuration value was rejected at construction time
    #[error("invalid setting `{field}`: {reason}")]
    InvalidSettings {
        field: &'static str,
        reason: String,
    },

    /// The codec refused a frame or a reconfiguration. Fatal to the encoder.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Reading the source or writing the sink failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Container bytes could not be parsed
    #[error("malformed container: {0}")]
    Container(String),

    /// The encoder was already finalized or poisoned by an earlier error
    #[error("encoder already finished")]
    Finished,
}

impl SeamError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SeamError::InvalidSettings {
            field,
            reason: reason.into(),
        }
    }

    /// true for configuration errors
    pub fn is_config(&self) -> bool {
        matches!(self, SeamError::InvalidSettings { .. })
    }

    /// true for codec rejections
    pub fn is_codec(&self) -> bool {
        matches!(self, SeamError::Codec(_))
    }
}

/// result type for seam stuff
pub type SeamResult<T> = Result<T, SeamError>;
