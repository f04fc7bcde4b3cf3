use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;

/// A connectivity or delivery event surfaced by a [`PeerTransport`].
///
/// Events are consumed by a session one at a time, in the order the transport
/// reports them; for a given remote peer that order must match the order in
/// which things actually happened (a `Data` event never precedes the
/// `Connected` event for its sender).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent<A> {
    /// A peer connection was established.
    Connected(A),
    /// A peer connection was lost or closed.
    Disconnected(A),
    /// Raw bytes arrived from a connected peer.
    Data {
        /// The sending peer.
        from: A,
        /// The payload, exactly as handed to `send_to` on the other end.
        bytes: Vec<u8>,
    },
}

/// A failure reported by [`PeerTransport::send_to`].
///
/// Sessions log these and move on: delivery is fire-and-forget, there is no
/// retry, and a state mutation that preceded the send is never rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The destination is not currently connected.
    PeerUnreachable {
        /// A description of the failure.
        detail: String,
    },
    /// The transport failed to hand off the payload.
    SendFailed {
        /// A description of the failure.
        detail: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerUnreachable { detail } => write!(f, "peer unreachable: {detail}"),
            Self::SendFailed { detail } => write!(f, "send failed: {detail}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The abstract peer-session capability this library builds on.
///
/// Implement this trait to plug in a real discovery/connection layer
/// (sockets, Bluetooth, a relay — anything). The contract the sessions rely
/// on:
///
/// - **Reliable, ordered-per-destination delivery.** Bytes handed to
///   [`send_to`] for one destination arrive intact and in order, or the
///   failure is reported. Snapshot replication is last-writer-wins with no
///   ordering token, so followers converge only if this holds.
/// - **No automatic retry.** A reported failure is final from the session's
///   perspective.
/// - **Serialized event delivery.** [`poll_events`] returns everything that
///   happened since the previous call; the session processes the batch one
///   event at a time on the caller's thread.
///
/// [`send_to`]: PeerTransport::send_to
/// [`poll_events`]: PeerTransport::poll_events
pub trait PeerTransport {
    /// Identifies a peer connection. Distinct from [`ParticipantId`]: the
    /// address names a link, not a battle participant.
    ///
    /// [`ParticipantId`]: crate::ParticipantId
    type Address: Clone + PartialEq + Eq + Hash + Debug;

    /// Attempts reliable, ordered delivery of `bytes` to `to`.
    fn send_to(&mut self, bytes: &[u8], to: &Self::Address) -> Result<(), TransportError>;

    /// Returns all connectivity and data events that occurred since the last
    /// call, oldest first.
    fn poll_events(&mut self) -> Vec<TransportEvent<Self::Address>>;
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = TransportError::PeerUnreachable {
            detail: "no route".to_owned(),
        };
        assert!(err.to_string().contains("no route"));
        let err = TransportError::SendFailed {
            detail: "link down".to_owned(),
        };
        assert!(err.to_string().contains("link down"));
    }

    /// Compile-time assertion that `PeerTransport` is object-safe.
    fn _assert_object_safe(_: &dyn PeerTransport<Address = String>) {}
}
