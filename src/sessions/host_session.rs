//! The authoritative end of a battle.

use std::collections::VecDeque;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::battle::{BattleState, Boss};
use crate::error::WarbandResult;
use crate::network::codec;
use crate::network::messages::{Message, MessageBody};
use crate::network::transport::{PeerTransport, TransportEvent};
use crate::rng::Pcg32;
use crate::sessions::event_drain::EventDrain;
use crate::sessions::peer_registry::PeerRegistry;
use crate::sessions::session_trait::BattleSession;
use crate::{ParticipantId, SessionEvent};

/// Maximum number of session events to queue before the oldest are dropped.
///
/// Prevents unbounded growth if the caller stops draining events.
pub(crate) const MAX_EVENT_QUEUE_SIZE: usize = 100;

/// The authoritative session: the single writer of the canonical
/// [`BattleState`].
///
/// A `HostSession` owns the battle outright. Inbound `PlayerJoin` and
/// `PlayerAttack` intents are validated against the peer registry and the
/// current turn, applied to the state one at a time, and the resulting
/// snapshot is replicated to every connected peer. Snapshots *received* from
/// peers are ignored — trust is asymmetric, and a host never adopts state.
///
/// All handling happens inside [`poll_peers`] and [`submit_boss_attack`] on
/// the caller's thread; because both take `&mut self`, every
/// decide-then-replicate sequence is serialized by construction. Two attacks
/// arriving in the same poll are evaluated strictly in order, the second
/// against the state the first left behind, so at most one of a burst of
/// out-of-turn intents ever succeeds.
///
/// [`poll_peers`]: BattleSession::poll_peers
/// [`submit_boss_attack`]: HostSession::submit_boss_attack
#[derive(Debug)]
pub struct HostSession<T>
where
    T: PeerTransport,
{
    /// The transport all replication and intent traffic flows through.
    transport: T,
    /// The canonical battle state. Nothing outside this session mutates it.
    state: BattleState,
    /// peer address → player identity; entries live from accepted join to
    /// disconnect.
    registry: PeerRegistry<T::Address>,
    /// Currently connected peers, in connection order.
    connected: SmallVec<[T::Address; 4]>,
    /// Events pending for the presentation layer.
    event_queue: VecDeque<SessionEvent<T::Address>>,
    /// Drives boss target selection and damage rolls.
    rng: Pcg32,
}

impl<T: PeerTransport> HostSession<T> {
    pub(crate) fn new(transport: T, boss: Boss, rng: Pcg32) -> Self {
        debug!(boss = %boss.id, "hosting a new battle");
        Self {
            transport,
            state: BattleState::new(boss),
            registry: PeerRegistry::new(),
            connected: SmallVec::new(),
            event_queue: VecDeque::new(),
            rng,
        }
    }

    /// Resolves a boss action and replicates the result.
    ///
    /// This is the host's local intent (there is no wire message for it). It
    /// is a no-op when it is not the boss's turn or the battle is over.
    pub fn submit_boss_attack(&mut self) -> WarbandResult<()> {
        if self.state.is_over() {
            trace!("boss attack ignored, the battle is over");
            return Ok(());
        }
        if !self.state.is_boss_turn() {
            trace!(turn = %self.state.current_turn(), "boss attack ignored, not the boss's turn");
            return Ok(());
        }
        self.state.resolve_boss_attack(&mut self.rng);
        self.push_event(SessionEvent::StateChanged);
        self.broadcast_snapshot()
    }

    /// The peers currently connected, in connection order.
    #[must_use]
    pub fn connected_peers(&self) -> &[T::Address] {
        &self.connected
    }

    /// Number of peers that have completed a join.
    #[must_use]
    pub fn joined_player_count(&self) -> usize {
        self.registry.len()
    }

    /// Encodes the canonical state and sends it to every connected peer
    /// (including, harmlessly, whoever triggered the change).
    ///
    /// Per-peer send failures are logged and skipped: the local mutation is
    /// authoritative and stands, and a stale follower catches up on the next
    /// successful snapshot.
    fn broadcast_snapshot(&mut self) -> WarbandResult<()> {
        let message = Message::new(MessageBody::Snapshot(self.state.clone()));
        let bytes = codec::encode(&message)?;
        for addr in &self.connected {
            if let Err(err) = self.transport.send_to(&bytes, addr) {
                warn!(peer = ?addr, %err, "failed to replicate snapshot");
            }
        }
        Ok(())
    }

    fn handle_transport_event(&mut self, event: TransportEvent<T::Address>) {
        match event {
            TransportEvent::Connected(addr) => {
                if !self.connected.contains(&addr) {
                    self.connected.push(addr.clone());
                }
                debug!(peer = ?addr, "peer connected");
                self.push_event(SessionEvent::PeerConnected { addr });
            },
            TransportEvent::Disconnected(addr) => {
                self.connected.retain(|a| *a != addr);
                if let Some(player_id) = self.registry.unregister(&addr) {
                    debug!(peer = ?addr, player = %player_id, "peer disconnected, removing player");
                    self.state.remove_player(player_id);
                    self.push_event(SessionEvent::StateChanged);
                    if let Err(err) = self.broadcast_snapshot() {
                        warn!(%err, "failed to encode snapshot after disconnect");
                    }
                } else {
                    debug!(peer = ?addr, "unjoined peer disconnected");
                }
                self.push_event(SessionEvent::PeerDisconnected { addr });
            },
            TransportEvent::Data { from, bytes } => self.handle_data(from, &bytes),
        }
    }

    fn handle_data(&mut self, from: T::Address, bytes: &[u8]) {
        let message: Message = match codec::decode_value(bytes) {
            Ok(message) => message,
            Err(err) => {
                warn!(peer = ?from, %err, "dropping undecodable message");
                return;
            },
        };
        if !message.is_well_tagged() {
            warn!(peer = ?from, "dropping message with foreign wire tag");
            return;
        }
        match message.into_body() {
            MessageBody::PlayerJoin(player) => {
                if self.registry.is_registered(&from) {
                    trace!(peer = ?from, "dropping duplicate join");
                    return;
                }
                debug!(peer = ?from, player = %player.id, name = %player.name, "admitting player");
                self.registry.register(from, player.id);
                self.state.add_player(player);
                self.push_event(SessionEvent::StateChanged);
                if let Err(err) = self.broadcast_snapshot() {
                    warn!(%err, "failed to encode snapshot after join");
                }
            },
            MessageBody::PlayerAttack(mv) => {
                // The authority gate: the sender must have joined, and its
                // mapped player must hold the turn. Anything else is dropped
                // without a reply; the protocol has no negative-ack channel.
                let Some(player_id) = self.registry.participant_for(&from) else {
                    trace!(peer = ?from, "dropping attack from unmapped peer");
                    return;
                };
                if player_id != self.state.current_turn() {
                    trace!(
                        player = %player_id,
                        turn = %self.state.current_turn(),
                        "dropping out-of-turn attack"
                    );
                    return;
                }
                if self.state.resolve_player_attack(player_id, &mv) {
                    self.push_event(SessionEvent::StateChanged);
                    if let Err(err) = self.broadcast_snapshot() {
                        warn!(%err, "failed to encode snapshot after attack");
                    }
                }
            },
            MessageBody::Snapshot(_) => {
                // A host never adopts state from a follower.
                trace!(peer = ?from, "ignoring snapshot sent to host");
            },
        }
    }

    fn push_event(&mut self, event: SessionEvent<T::Address>) {
        if self.event_queue.len() >= MAX_EVENT_QUEUE_SIZE {
            warn!("session event queue full, dropping oldest event");
            self.event_queue.pop_front();
        }
        self.event_queue.push_back(event);
    }
}

impl<T: PeerTransport> BattleSession<T> for HostSession<T> {
    fn poll_peers(&mut self) {
        for event in self.transport.poll_events() {
            self.handle_transport_event(event);
        }
    }

    fn state(&self) -> Option<&BattleState> {
        Some(&self.state)
    }

    fn is_host(&self) -> bool {
        true
    }

    fn local_id(&self) -> ParticipantId {
        self.state.boss().id
    }

    fn events(&mut self) -> EventDrain<'_, T::Address> {
        EventDrain::from_drain(self.event_queue.drain(..))
    }
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
    use crate::battle::catalog;
    use crate::sessions::builder::SessionBuilder;
    use crate::{LoopbackHub, LoopbackTransport};

    fn host_with_hub() -> (LoopbackHub, HostSession<LoopbackTransport>) {
        let hub = LoopbackHub::new();
        let host = SessionBuilder::new()
            .with_rng_seed(1)
            .start_host(hub.attach("host"));
        (hub, host)
    }

    #[test]
    fn host_always_has_state() {
        let (_hub, host) = host_with_hub();
        assert!(host.is_host());
        assert!(host.state().is_some());
        assert_eq!(host.local_id(), host.state().unwrap().boss().id);
    }

    #[test]
    fn boss_attack_before_any_join_is_noop_damage_wise() {
        let (_hub, mut host) = host_with_hub();
        host.submit_boss_attack().unwrap();
        let state = host.state().unwrap();
        assert!(state.is_boss_turn());
        assert!(state.players().is_empty());
    }

    #[test]
    fn boss_attack_out_of_turn_is_dropped() {
        let (hub, mut host) = host_with_hub();
        let mut raw = hub.attach("p1");
        hub.connect("host", "p1");
        // Hand-roll a join so the first player takes the turn.
        let player = crate::battle::Player::new(
            ParticipantId::from_u128(9),
            "Ada",
            catalog::default_move_set(),
        );
        let join = codec::encode(&Message::new(MessageBody::PlayerJoin(player))).unwrap();
        raw.send_to(&join, &"host".to_owned()).unwrap();
        host.poll_peers();

        let before = host.state().unwrap().clone();
        host.submit_boss_attack().unwrap();
        assert_eq!(host.state().unwrap(), &before);
    }

    #[test]
    fn event_queue_is_bounded() {
        let (hub, mut host) = host_with_hub();
        // Generate far more events than the cap by churning connections.
        for i in 0..(MAX_EVENT_QUEUE_SIZE + 20) {
            let name = format!("p{i}");
            let _t = hub.attach(&name);
            hub.connect("host", &name);
            hub.disconnect("host", &name);
        }
        host.poll_peers();
        assert_eq!(host.events().len(), MAX_EVENT_QUEUE_SIZE);
    }
}
