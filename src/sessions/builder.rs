//! Configuration-then-start construction for both session roles.

use crate::battle::{catalog, Boss, Card, Move, Player};
use crate::network::transport::PeerTransport;
use crate::rng::{Pcg32, SeedableRng};
use crate::sessions::follower_session::FollowerSession;
use crate::sessions::host_session::HostSession;
use crate::ParticipantId;

/// Builds either end of a battle session.
///
/// The builder carries the battle's configurable pieces: the local player's
/// presentation (name, moves, avatar) for followers, the boss's presentation
/// (name, cards) for hosts, and an optional RNG seed. Whichever `start_*`
/// method is called decides the role; fields irrelevant to that role are
/// simply unused.
///
/// # Examples
///
/// ```
/// use warband_sync::{LoopbackHub, SessionBuilder};
///
/// let hub = LoopbackHub::new();
/// let host = SessionBuilder::new()
///     .with_boss_name("Gravemaw")
///     .with_rng_seed(7)
///     .start_host(hub.attach("host"));
/// let follower = SessionBuilder::new()
///     .with_player_name("Rina")
///     .start_follower(hub.attach("rina"));
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    player_name: String,
    moves: Vec<Move>,
    avatar: Option<Vec<u8>>,
    boss_name: String,
    cards: Vec<Card>,
    seed: Option<u64>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            player_name: "Player".to_owned(),
            moves: catalog::default_move_set(),
            avatar: None,
            boss_name: "The Boss".to_owned(),
            cards: vec![catalog::health_drain()],
            seed: None,
        }
    }
}

impl SessionBuilder {
    /// Creates a builder with the stock catalog and default names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the local player's display name (follower role).
    #[must_use]
    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = name.into();
        self
    }

    /// Replaces the local player's move set (follower role).
    #[must_use]
    pub fn with_moves(mut self, moves: Vec<Move>) -> Self {
        self.moves = moves;
        self
    }

    /// Attaches an opaque avatar payload to the local player (follower role).
    #[must_use]
    pub fn with_avatar(mut self, avatar: Vec<u8>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Sets the boss's display name (host role).
    #[must_use]
    pub fn with_boss_name(mut self, name: impl Into<String>) -> Self {
        self.boss_name = name.into();
        self
    }

    /// Replaces the boss's card set (host role).
    #[must_use]
    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    /// Seeds the session's RNG for reproducible boss rolls and participant
    /// ids. Without a seed, the RNG is seeded from wall-clock timing entropy.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Consumes the builder and starts a host session on `transport`.
    #[must_use]
    pub fn start_host<T: PeerTransport>(self, transport: T) -> HostSession<T> {
        let mut rng = self.make_rng();
        let boss_id = ParticipantId::generate(&mut rng);
        let boss = Boss::new(boss_id, self.boss_name, self.cards);
        HostSession::new(transport, boss, rng)
    }

    /// Consumes the builder and starts a follower session on `transport`.
    #[must_use]
    pub fn start_follower<T: PeerTransport>(self, transport: T) -> FollowerSession<T> {
        let mut rng = self.make_rng();
        let player_id = ParticipantId::generate(&mut rng);
        let mut player = Player::new(player_id, self.player_name, self.moves);
        if let Some(avatar) = self.avatar {
            player = player.with_avatar(avatar);
        }
        FollowerSession::new(transport, player)
    }

    fn make_rng(&self) -> Pcg32 {
        match self.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        }
    }
}
