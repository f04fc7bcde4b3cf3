//! Binary codec for wire message serialization.
//!
//! This module provides a centralized interface for encoding and decoding wire
//! messages using bincode. It encapsulates the bincode configuration so that
//! every message in a session round-trips through the same, deterministic
//! encoding: both ends of a connection are assumed to run an identical schema
//! (there is no version negotiation), and a payload that does not decode is
//! dropped by the caller rather than acted on.
//!
//! # Examples
//!
//! ```
//! use warband_sync::network::codec::{decode, encode};
//!
//! let data: u32 = 42;
//! let bytes = encode(&data).expect("encoding should succeed");
//! let (decoded, _bytes_read): (u32, _) = decode(&bytes).expect("decoding should succeed");
//! assert_eq!(data, decoded);
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

// The bincode configuration used throughout Warband Sync.
//
// `standard()` with `fixed_int_encoding()`: fixed-size integers keep message
// layouts deterministic, and the snapshots we exchange are small enough that
// variable-length encoding buys nothing.
fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// Errors that can occur during encoding or decoding.
///
/// Messages are stored as `String` because the underlying bincode error types
/// are opaque: they expose failure reasons only through their `Display`
/// implementations. Codec errors are exceptional (corrupted data, schema
/// mismatch) and never on a hot path, so the allocation is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The encoding operation failed.
    EncodeError {
        /// The underlying bincode error message.
        message: String,
    },
    /// The decoding operation failed.
    DecodeError {
        /// The underlying bincode error message.
        message: String,
    },
}

impl CodecError {
    /// Creates a new encode error with the given message.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::EncodeError {
            message: message.into(),
        }
    }

    /// Creates a new decode error with the given message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeError {
            message: message.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodeError { message } => write!(f, "encoding failed: {message}"),
            Self::DecodeError { message } => write!(f, "decoding failed: {message}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a value into a new `Vec<u8>`.
pub fn encode<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config()).map_err(|e| CodecError::encode(e.to_string()))
}

/// Decodes a value from a byte slice.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<(T, usize)> {
    bincode::serde::decode_from_slice(bytes, config())
        .map_err(|e| CodecError::decode(e.to_string()))
}

/// Decodes a value from a byte slice, ignoring the bytes consumed.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    decode(bytes).map(|(value, _)| value)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::battle::{catalog, BattleState, Boss};
    use crate::network::messages::{Message, MessageBody};
    use crate::ParticipantId;

    #[test]
    fn roundtrip_primitive() {
        let original: u32 = 12345;
        let bytes = encode(&original).unwrap();
        let (decoded, len): (u32, _) = decode(&bytes).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(len, bytes.len());
    }

    #[test]
    fn roundtrip_message_is_byte_exact() {
        let msg = Message::new(MessageBody::PlayerAttack(catalog::heavy_bash()));
        let bytes = encode(&msg).unwrap();
        let decoded: Message = decode_value(&bytes).unwrap();
        assert_eq!(msg, decoded);
        // Re-encoding the decoded message reproduces the exact bytes.
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn roundtrip_snapshot() {
        let boss = Boss::new(
            ParticipantId::from_u128(1),
            "Gravemaw",
            vec![catalog::health_drain()],
        );
        let state = BattleState::new(boss);
        let msg = Message::new(MessageBody::Snapshot(state));
        let bytes = encode(&msg).unwrap();
        let decoded: Message = decode_value(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn decode_invalid_data_fails_closed() {
        let garbage = [0xFF, 0xFF, 0xFF];
        let result: CodecResult<Message> = decode_value(&garbage);
        assert!(result.is_err());
    }

    #[test]
    fn encoding_is_deterministic() {
        let msg = Message::new(MessageBody::PlayerAttack(catalog::simple_strike()));
        assert_eq!(encode(&msg).unwrap(), encode(&msg).unwrap());
    }

    #[test]
    fn codec_error_display() {
        let err = CodecError::encode("boom");
        assert!(err.to_string().contains("encoding failed"));
        let err = CodecError::decode("boom");
        assert!(err.to_string().contains("decoding failed"));
    }
}
