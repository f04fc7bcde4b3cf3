use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// This enum contains all error messages this library can return. Most API
/// functions will generally return a [`WarbandResult`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WarbandError {
    /// You made an invalid request, usually by using wrong parameters for
    /// function calls.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        info: String,
    },
    /// The session has been closed (a follower lost its host). No further
    /// intents can be submitted.
    SessionClosed,
    /// Serialization or deserialization of a wire message failed.
    SerializationError {
        /// A description of what failed to serialize/deserialize.
        context: String,
    },
    /// The transport reported a send failure. The local state mutation that
    /// preceded the send, if any, stands; affected followers stay stale until
    /// the next successful snapshot.
    TransportError {
        /// A description of the transport failure.
        context: String,
    },
}

impl Display for WarbandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarbandError::InvalidRequest { info } => {
                write!(f, "Invalid Request: {}", info)
            },
            WarbandError::SessionClosed => {
                write!(f, "The session is closed; the host is gone.")
            },
            WarbandError::SerializationError { context } => {
                write!(f, "Serialization error: {}", context)
            },
            WarbandError::TransportError { context } => {
                write!(f, "Transport error: {}", context)
            },
        }
    }
}

impl Error for WarbandError {}

/// Result type for most operations in this library.
pub type WarbandResult<T> = Result<T, WarbandError>;

impl From<crate::network::codec::CodecError> for WarbandError {
    fn from(err: crate::network::codec::CodecError) -> Self {
        WarbandError::SerializationError {
            context: err.to_string(),
        }
    }
}

impl From<crate::network::transport::TransportError> for WarbandError {
    fn from(err: crate::network::transport::TransportError) -> Self {
        WarbandError::TransportError {
            context: err.to_string(),
        }
    }
}
