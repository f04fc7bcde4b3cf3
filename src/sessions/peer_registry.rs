//! Peer registry mapping transport addresses to battle participants.
//!
//! This map exists only on the host. Entries are created when a `PlayerJoin`
//! intent is accepted and removed when the peer disconnects; it is the single
//! source the host consults to resolve which player an inbound intent speaks
//! for.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::ParticipantId;

/// Registry tracking which connected peer controls which player.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry<A>
where
    A: Clone + PartialEq + Eq + Hash + Debug,
{
    players: HashMap<A, ParticipantId>,
}

impl<A> PeerRegistry<A>
where
    A: Clone + PartialEq + Eq + Hash + Debug,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Records that `addr` controls the player with identity `id`.
    pub fn register(&mut self, addr: A, id: ParticipantId) {
        self.players.insert(addr, id);
    }

    /// Removes the mapping for `addr`, returning the player identity it held.
    pub fn unregister(&mut self, addr: &A) -> Option<ParticipantId> {
        self.players.remove(addr)
    }

    /// The player identity mapped to `addr`, if the peer has joined.
    #[must_use]
    pub fn participant_for(&self, addr: &A) -> Option<ParticipantId> {
        self.players.get(addr).copied()
    }

    /// Whether `addr` has a join mapping.
    #[must_use]
    pub fn is_registered(&self, addr: &A) -> bool {
        self.players.contains_key(addr)
    }

    /// Number of mapped peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no peer has joined yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn pid(raw: u128) -> ParticipantId {
        ParticipantId::from_u128(raw)
    }

    #[test]
    fn register_and_lookup() {
        let mut reg: PeerRegistry<String> = PeerRegistry::new();
        reg.register("peer-1".to_owned(), pid(1));
        assert_eq!(reg.participant_for(&"peer-1".to_owned()), Some(pid(1)));
        assert!(reg.is_registered(&"peer-1".to_owned()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_peer_has_no_mapping() {
        let reg: PeerRegistry<String> = PeerRegistry::new();
        assert_eq!(reg.participant_for(&"ghost".to_owned()), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn unregister_returns_identity() {
        let mut reg: PeerRegistry<String> = PeerRegistry::new();
        reg.register("peer-1".to_owned(), pid(1));
        assert_eq!(reg.unregister(&"peer-1".to_owned()), Some(pid(1)));
        assert_eq!(reg.unregister(&"peer-1".to_owned()), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn reregister_overwrites() {
        let mut reg: PeerRegistry<String> = PeerRegistry::new();
        reg.register("peer-1".to_owned(), pid(1));
        reg.register("peer-1".to_owned(), pid(2));
        assert_eq!(reg.participant_for(&"peer-1".to_owned()), Some(pid(2)));
        assert_eq!(reg.len(), 1);
    }
}
