//! The replica end of a battle.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::battle::{BattleState, Move, Player};
use crate::error::{WarbandError, WarbandResult};
use crate::network::codec;
use crate::network::messages::{Message, MessageBody};
use crate::network::transport::{PeerTransport, TransportEvent};
use crate::sessions::event_drain::EventDrain;
use crate::sessions::host_session::MAX_EVENT_QUEUE_SIZE;
use crate::sessions::session_trait::BattleSession;
use crate::{ParticipantId, SessionEvent};

/// A non-authoritative session holding a replica of the host's battle state.
///
/// A `FollowerSession` never mutates battle state. It adopts the first peer
/// that connects as the host, announces its local player with a `PlayerJoin`,
/// and from then on its view of the battle is whatever whole-state snapshot
/// arrived last. Local attack intents are forwarded to the host only when the
/// replica says it is this player's turn; the host re-validates regardless.
///
/// Losing the host is terminal. The session flips to closed, keeps its last
/// replica for display, and refuses further intents with
/// [`WarbandError::SessionClosed`].
#[derive(Debug)]
pub struct FollowerSession<T>
where
    T: PeerTransport,
{
    transport: T,
    /// The local player as announced in the join. The authoritative copy
    /// lives in the host's state; this one only supplies identity and the
    /// join payload.
    local_player: Player,
    /// The adopted host address, if a peer has connected yet.
    host: Option<T::Address>,
    /// Last snapshot received from the host. `None` until the first arrives.
    replica: Option<BattleState>,
    closed: bool,
    event_queue: VecDeque<SessionEvent<T::Address>>,
}

impl<T: PeerTransport> FollowerSession<T> {
    pub(crate) fn new(transport: T, local_player: Player) -> Self {
        debug!(player = %local_player.id, name = %local_player.name, "joining as follower");
        Self {
            transport,
            local_player,
            host: None,
            replica: None,
            closed: false,
            event_queue: VecDeque::new(),
        }
    }

    /// Forwards a local attack intent to the host.
    ///
    /// The intent is silently dropped (returning `Ok`) when no snapshot has
    /// arrived yet, when the battle is over, or when the replica says it is
    /// not this player's turn — out-of-turn taps never reach the wire. Errors
    /// are reserved for a closed session, a missing host, and transport
    /// failures.
    pub fn submit_player_attack(&mut self, mv: &Move) -> WarbandResult<()> {
        if self.closed {
            return Err(WarbandError::SessionClosed);
        }
        let Some(host) = self.host.clone() else {
            return Err(WarbandError::InvalidRequest {
                info: "no host connected yet".to_owned(),
            });
        };
        let Some(replica) = &self.replica else {
            trace!("attack ignored, no snapshot received yet");
            return Ok(());
        };
        if replica.is_over() {
            trace!("attack ignored, the battle is over");
            return Ok(());
        }
        if replica.current_turn() != self.local_player.id {
            trace!(turn = %replica.current_turn(), "attack ignored, not our turn");
            return Ok(());
        }
        let message = Message::new(MessageBody::PlayerAttack(mv.clone()));
        let bytes = codec::encode(&message)?;
        self.transport.send_to(&bytes, &host)?;
        Ok(())
    }

    /// Whether the host has disconnected and the session is terminal.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The local player announced to the host.
    #[must_use]
    pub fn local_player(&self) -> &Player {
        &self.local_player
    }

    fn handle_transport_event(&mut self, event: TransportEvent<T::Address>) {
        match event {
            TransportEvent::Connected(addr) => {
                if self.host.is_some() {
                    trace!(peer = ?addr, "ignoring extra peer, host already adopted");
                    return;
                }
                debug!(host = ?addr, "adopting host and announcing join");
                self.host = Some(addr.clone());
                let message = Message::new(MessageBody::PlayerJoin(self.local_player.clone()));
                match codec::encode(&message) {
                    Ok(bytes) => {
                        if let Err(err) = self.transport.send_to(&bytes, &addr) {
                            warn!(%err, "failed to send join to host");
                        }
                    },
                    Err(err) => warn!(%err, "failed to encode join"),
                }
                self.push_event(SessionEvent::PeerConnected { addr });
            },
            TransportEvent::Disconnected(addr) => {
                if self.host.as_ref() == Some(&addr) {
                    debug!(host = ?addr, "host disconnected, closing session");
                    self.closed = true;
                    self.push_event(SessionEvent::HostDisconnected);
                }
                self.push_event(SessionEvent::PeerDisconnected { addr });
            },
            TransportEvent::Data { from, bytes } => self.handle_data(from, &bytes),
        }
    }

    fn handle_data(&mut self, from: T::Address, bytes: &[u8]) {
        if self.host.as_ref() != Some(&from) {
            trace!(peer = ?from, "dropping data from non-host peer");
            return;
        }
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
            MessageBody::Snapshot(state) => {
                // Whole-state replacement, never a merge. The host's view
                // wins even if it disagrees with local predictions.
                self.replica = Some(state);
                self.push_event(SessionEvent::StateChanged);
            },
            MessageBody::PlayerJoin(_) | MessageBody::PlayerAttack(_) => {
                trace!(peer = ?from, "ignoring intent message sent to follower");
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

impl<T: PeerTransport> BattleSession<T> for FollowerSession<T> {
    fn poll_peers(&mut self) {
        for event in self.transport.poll_events() {
            self.handle_transport_event(event);
        }
    }

    fn state(&self) -> Option<&BattleState> {
        self.replica.as_ref()
    }

    fn is_host(&self) -> bool {
        false
    }

    fn local_id(&self) -> ParticipantId {
        self.local_player.id
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
    use crate::battle::{catalog, Boss};
    use crate::sessions::builder::SessionBuilder;
    use crate::{LoopbackHub, LoopbackTransport};

    fn follower_with_hub() -> (LoopbackHub, FollowerSession<LoopbackTransport>) {
        let hub = LoopbackHub::new();
        let follower = SessionBuilder::new()
            .with_player_name("Rina")
            .start_follower(hub.attach("rina"));
        (hub, follower)
    }

    #[test]
    fn follower_has_no_state_until_snapshot() {
        let (_hub, follower) = follower_with_hub();
        assert!(!follower.is_host());
        assert!(follower.state().is_none());
        assert_eq!(follower.local_id(), follower.local_player().id);
    }

    #[test]
    fn attack_before_host_connects_is_an_error() {
        let (_hub, mut follower) = follower_with_hub();
        let err = follower
            .submit_player_attack(&catalog::simple_strike())
            .unwrap_err();
        assert!(matches!(err, WarbandError::InvalidRequest { .. }));
    }

    #[test]
    fn first_connected_peer_is_adopted_and_joined() {
        let (hub, mut follower) = follower_with_hub();
        let mut fake_host = hub.attach("host");
        hub.connect("rina", "host");
        follower.poll_peers();

        let events = fake_host.poll_events();
        let payload = events
            .iter()
            .find_map(|e| match e {
                TransportEvent::Data { bytes, .. } => Some(bytes.clone()),
                _ => None,
            })
            .expect("join should have been sent");
        let message: Message = codec::decode_value(&payload).unwrap();
        assert!(
            matches!(message.body(), MessageBody::PlayerJoin(p) if p.name == "Rina")
        );
    }

    #[test]
    fn attack_before_snapshot_is_dropped_locally() {
        let (hub, mut follower) = follower_with_hub();
        let mut fake_host = hub.attach("host");
        hub.connect("rina", "host");
        follower.poll_peers();
        let _ = fake_host.poll_events();

        follower
            .submit_player_attack(&catalog::simple_strike())
            .unwrap();
        assert!(fake_host.poll_events().is_empty());
    }

    #[test]
    fn out_of_turn_attack_never_reaches_the_wire() {
        let (hub, mut follower) = follower_with_hub();
        let mut fake_host = hub.attach("host");
        hub.connect("rina", "host");
        follower.poll_peers();
        let _ = fake_host.poll_events();

        // Snapshot where the boss holds the turn.
        let state = BattleState::new(Boss::new(
            ParticipantId::from_u128(1),
            "The Boss",
            vec![catalog::health_drain()],
        ));
        let snapshot = codec::encode(&Message::new(MessageBody::Snapshot(state))).unwrap();
        fake_host.send_to(&snapshot, &"rina".to_owned()).unwrap();
        follower.poll_peers();
        assert!(follower.state().is_some());

        follower
            .submit_player_attack(&catalog::simple_strike())
            .unwrap();
        assert!(fake_host.poll_events().is_empty());
    }

    #[test]
    fn data_from_non_host_peer_is_dropped() {
        let (hub, mut follower) = follower_with_hub();
        let _host = hub.attach("host");
        let mut stranger = hub.attach("stranger");
        hub.connect("rina", "host");
        hub.connect("rina", "stranger");
        follower.poll_peers();

        let state = BattleState::new(Boss::new(
            ParticipantId::from_u128(1),
            "The Boss",
            Vec::new(),
        ));
        let snapshot = codec::encode(&Message::new(MessageBody::Snapshot(state))).unwrap();
        stranger.send_to(&snapshot, &"rina".to_owned()).unwrap();
        follower.poll_peers();
        assert!(follower.state().is_none());
    }

    #[test]
    fn host_loss_closes_the_session() {
        let (hub, mut follower) = follower_with_hub();
        let _host = hub.attach("host");
        hub.connect("rina", "host");
        follower.poll_peers();
        let _ = follower.events();

        hub.disconnect("rina", "host");
        follower.poll_peers();
        assert!(follower.is_closed());
        let events: Vec<_> = follower.events().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::HostDisconnected)));

        let err = follower
            .submit_player_attack(&catalog::simple_strike())
            .unwrap_err();
        assert!(matches!(err, WarbandError::SessionClosed));
    }
}
