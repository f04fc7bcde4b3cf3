//! # Warband Sync
//!
//! Warband Sync is a host-authoritative turn synchronization library for small
//! peer-to-peer "players vs. boss" battles. One peer hosts the battle and owns
//! the canonical [`BattleState`]; every other peer is a follower that submits
//! intents (join, attack) to the host and adopts full-state snapshots in
//! return. There is no local simulation on followers and no rollback: the host
//! applies one intent at a time and replicates the result.
//!
//! The library is transport-agnostic. Plug in anything that can deliver bytes
//! reliably and in order per destination by implementing [`PeerTransport`];
//! an in-memory [`LoopbackHub`] is provided for tests and single-process use.
//!
//! ```
//! use warband_sync::{BattleSession, LoopbackHub, SessionBuilder};
//!
//! let hub = LoopbackHub::new();
//! let mut host = SessionBuilder::new()
//!     .with_rng_seed(7)
//!     .start_host(hub.attach("host"));
//! let mut follower = SessionBuilder::new()
//!     .with_player_name("Rina")
//!     .start_follower(hub.attach("rina"));
//!
//! hub.connect("host", "rina");
//! follower.poll_peers(); // adopts the host, sends its join intent
//! host.poll_peers(); // admits the player, replicates a snapshot
//! follower.poll_peers(); // adopts the snapshot
//!
//! assert_eq!(host.state().map(|s| s.players().len()), Some(1));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt;

pub use battle::{BattleState, Boss, Card, Move, Player};
pub use error::{WarbandError, WarbandResult};
pub use network::loopback::{LoopbackHub, LoopbackTransport};
pub use network::messages::{Message, MessageBody};
pub use network::transport::{PeerTransport, TransportError, TransportEvent};
pub use sessions::builder::SessionBuilder;
pub use sessions::event_drain::EventDrain;
pub use sessions::follower_session::FollowerSession;
pub use sessions::host_session::HostSession;
pub use sessions::session_trait::BattleSession;

pub mod battle;
#[doc(hidden)]
pub mod error;
/// Internal random number generator module based on PCG32.
///
/// Provides a minimal, high-quality PRNG that replaces the `rand` crate
/// dependency. Drives boss target selection, damage rolls and participant id
/// generation.
pub mod rng;
#[doc(hidden)]
pub mod network {
    /// Binary codec for wire message serialization.
    ///
    /// Centralized encoding and decoding of wire messages using bincode.
    pub mod codec;
    #[doc(hidden)]
    pub mod loopback;
    #[doc(hidden)]
    pub mod messages;
    #[doc(hidden)]
    pub mod transport;
}
#[doc(hidden)]
pub mod sessions {
    #[doc(hidden)]
    pub mod builder;
    #[doc(hidden)]
    pub mod event_drain;
    #[doc(hidden)]
    pub mod follower_session;
    #[doc(hidden)]
    pub mod host_session;
    #[doc(hidden)]
    pub mod peer_registry;
    #[doc(hidden)]
    pub mod session_trait;
}

// #############
// # CONSTANTS #
// #############

/// Health every player starts the battle with.
pub const PLAYER_STARTING_HEALTH: i32 = 20;

/// Health the boss starts the battle with.
pub const BOSS_STARTING_HEALTH: i32 = 100;

/// Lower bound (inclusive) of the boss damage roll.
pub const BOSS_ATTACK_MIN_DAMAGE: i32 = 3;

/// Upper bound (inclusive) of the boss damage roll.
pub const BOSS_ATTACK_MAX_DAMAGE: i32 = 8;

/// A stable identity for a battle participant (a player or the boss).
///
/// Participant ids are 128 random bits, generated once when a participant is
/// created and carried unchanged through join intents and snapshots. They are
/// distinct from transport addresses: a transport address identifies a peer
/// *connection*, while a `ParticipantId` identifies an entity inside the
/// battle. The host maintains the mapping between the two.
///
/// # Examples
///
/// ```
/// use warband_sync::rng::{Pcg32, SeedableRng};
/// use warband_sync::ParticipantId;
///
/// let mut rng = Pcg32::seed_from_u64(1);
/// let a = ParticipantId::generate(&mut rng);
/// let b = ParticipantId::generate(&mut rng);
/// assert_ne!(a, b);
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ParticipantId(u128);

impl ParticipantId {
    /// Creates a `ParticipantId` from a raw 128-bit value.
    #[inline]
    #[must_use]
    pub const fn from_u128(raw: u128) -> Self {
        ParticipantId(raw)
    }

    /// Returns the underlying 128-bit value.
    #[inline]
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Generates a fresh random id from the given RNG.
    #[must_use]
    pub fn generate<R: rng::Rng + ?Sized>(rng: &mut R) -> Self {
        let high = u128::from(rng.next_u64());
        let low = u128::from(rng.next_u64());
        ParticipantId((high << 64) | low)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Notifications a session emits for its presentation layer. Drain them via
/// [`BattleSession::events`] after each [`poll_peers`] call.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new event types may be
/// added in future versions. Always include a wildcard arm when matching.
///
/// [`BattleSession::events`]: crate::BattleSession::events
/// [`poll_peers`]: crate::BattleSession::poll_peers
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEvent<A> {
    /// The locally visible [`BattleState`] changed (the host applied an
    /// action, or a follower adopted a snapshot). Re-read the state.
    StateChanged,
    /// A peer connected at the transport level.
    PeerConnected {
        /// The address of the peer.
        addr: A,
    },
    /// A peer disconnected at the transport level. On the host, any player
    /// mapped to this peer has already been removed from the roster.
    PeerDisconnected {
        /// The address of the peer.
        addr: A,
    },
    /// The follower lost its connection to the host. The session is closed;
    /// there is no reconnection or resume.
    HostDisconnected,
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rng::{Pcg32, SeedableRng};

    #[test]
    fn participant_id_roundtrip_raw() {
        let id = ParticipantId::from_u128(0xDEAD_BEEF);
        assert_eq!(id.as_u128(), 0xDEAD_BEEF);
    }

    #[test]
    fn participant_id_display_is_hex() {
        let id = ParticipantId::from_u128(0xAB);
        let shown = id.to_string();
        assert_eq!(shown.len(), 32);
        assert!(shown.ends_with("ab"));
    }

    #[test]
    fn generated_ids_are_distinct() {
        let mut rng = Pcg32::seed_from_u64(42);
        let a = ParticipantId::generate(&mut rng);
        let b = ParticipantId::generate(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_are_deterministic_per_seed() {
        let mut rng1 = Pcg32::seed_from_u64(7);
        let mut rng2 = Pcg32::seed_from_u64(7);
        assert_eq!(
            ParticipantId::generate(&mut rng1),
            ParticipantId::generate(&mut rng2)
        );
    }

    #[test]
    fn constants_match_reference_rules() {
        assert_eq!(PLAYER_STARTING_HEALTH, 20);
        assert_eq!(BOSS_STARTING_HEALTH, 100);
        assert!(BOSS_ATTACK_MIN_DAMAGE <= BOSS_ATTACK_MAX_DAMAGE);
    }
}
