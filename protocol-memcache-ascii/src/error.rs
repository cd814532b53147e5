//! Error types for Memcache ASCII response decoding.

/// Error type for response decoding.
///
/// None of these are recoverable: once the decoder reports an error the
/// stream has lost frame alignment and the connection should be closed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Unrecognized or structurally invalid line.
    #[error("unexpected line: {0}")]
    MalformedLine(String),

    /// A line starting with a digit that is not a valid integer.
    #[error("invalid numeric reply: {0}")]
    MalformedNumeric(String),

    /// Content found where only the blank line after a value body may appear.
    #[error("unexpected end of data block: {0}")]
    UnexpectedDataBlockTrailer(String),

    /// A line grew past the configured limit without a terminator.
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// A VALUE header announced a body larger than the configured limit.
    #[error("value of {size} bytes exceeds limit of {limit} bytes")]
    ValueTooLarge { size: usize, limit: usize },

    /// The decoder failed earlier and refuses further input.
    #[error("decoder is desynchronized after a previous error")]
    Desynchronized,
}

impl DecodeError {
    pub(crate) fn malformed_line(line: &[u8]) -> Self {
        DecodeError::MalformedLine(String::from_utf8_lossy(line).into_owned())
    }

    pub(crate) fn malformed_numeric(line: &[u8]) -> Self {
        DecodeError::MalformedNumeric(String::from_utf8_lossy(line).into_owned())
    }

    pub(crate) fn unexpected_trailer(line: &[u8]) -> Self {
        DecodeError::UnexpectedDataBlockTrailer(String::from_utf8_lossy(line).into_owned())
    }

    /// The offending line, for the error kinds that carry one.
    pub fn line(&self) -> Option<&str> {
        match self {
            DecodeError::MalformedLine(line)
            | DecodeError::MalformedNumeric(line)
            | DecodeError::UnexpectedDataBlockTrailer(line) => Some(line),
            _ => None,
        }
    }

    /// Returns true if the peer sent bytes that violate the protocol framing,
    /// as opposed to hitting a locally configured limit.
    #[inline]
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            DecodeError::MalformedLine(_)
                | DecodeError::MalformedNumeric(_)
                | DecodeError::UnexpectedDataBlockTrailer(_)
        )
    }
}
