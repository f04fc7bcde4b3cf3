use crate::network::transport::PeerTransport;
use crate::sessions::event_drain::EventDrain;
use crate::{BattleState, ParticipantId};

/// The read surface shared by both session roles.
///
/// [`HostSession`] and [`FollowerSession`] implement this trait so that a
/// presentation layer can render either end of a battle through one API:
/// poll, drain events, read the state. Everything that *mutates* the battle
/// is deliberately absent here — mutation lives on the concrete session types
/// ([`HostSession::submit_boss_attack`] and
/// [`FollowerSession::submit_player_attack`]), so holding a host handle is
/// the only way to touch the canonical state.
///
/// # Example
///
/// ```no_run
/// use warband_sync::{BattleSession, PeerTransport, SessionEvent};
///
/// fn pump<T: PeerTransport>(session: &mut impl BattleSession<T>) {
///     session.poll_peers();
///     for event in session.events() {
///         if let SessionEvent::StateChanged = event {
///             // re-render from session.state()
///         }
///     }
/// }
/// ```
///
/// [`HostSession`]: crate::HostSession
/// [`FollowerSession`]: crate::FollowerSession
/// [`HostSession::submit_boss_attack`]: crate::HostSession::submit_boss_attack
/// [`FollowerSession::submit_player_attack`]: crate::FollowerSession::submit_player_attack
pub trait BattleSession<T: PeerTransport> {
    /// Drains pending transport events and handles them one at a time, in
    /// arrival order. Call this regularly; nothing happens between calls.
    fn poll_peers(&mut self);

    /// The battle state as this session currently sees it.
    ///
    /// Always `Some` on a host. `None` on a follower until the first
    /// snapshot arrives.
    fn state(&self) -> Option<&BattleState>;

    /// Whether this session is the authoritative host.
    fn is_host(&self) -> bool;

    /// The local participant's identity: the boss's id on a host, the local
    /// player's id on a follower.
    fn local_id(&self) -> ParticipantId;

    /// Drains pending session events, oldest first.
    #[must_use = "events should be handled to react to session state changes"]
    fn events(&mut self) -> EventDrain<'_, T::Address>;
}
