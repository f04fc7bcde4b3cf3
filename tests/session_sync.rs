//! End-to-end session tests over the loopback transport: join, attack,
//! replication, authority, and disconnect handling.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use warband_sync::battle::catalog;
use warband_sync::network::codec;
use warband_sync::network::transport::PeerTransport;
use warband_sync::{
    BattleSession, FollowerSession, HostSession, LoopbackHub, LoopbackTransport, Message,
    MessageBody, ParticipantId, SessionBuilder, SessionEvent, BOSS_ATTACK_MAX_DAMAGE,
    BOSS_ATTACK_MIN_DAMAGE, BOSS_STARTING_HEALTH, PLAYER_STARTING_HEALTH,
};

type Host = HostSession<LoopbackTransport>;
type Follower = FollowerSession<LoopbackTransport>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn start_host(hub: &LoopbackHub, seed: u64) -> Host {
    init_tracing();
    SessionBuilder::new()
        .with_rng_seed(seed)
        .start_host(hub.attach("host"))
}

fn start_follower(hub: &LoopbackHub, name: &str) -> Follower {
    SessionBuilder::new()
        .with_player_name(name)
        .start_follower(hub.attach(name))
}

/// Connects a follower to the host and pumps both ends through the join
/// handshake, ending with the follower holding a fresh snapshot.
fn join(hub: &LoopbackHub, host: &mut Host, follower: &mut Follower, name: &str) {
    hub.connect("host", name);
    follower.poll_peers();
    host.poll_peers();
    follower.poll_peers();
}

#[test]
fn join_replicates_a_snapshot_to_the_follower() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");

    join(&hub, &mut host, &mut rina, "rina");

    let replica = rina.state().expect("snapshot should have arrived");
    assert_eq!(replica.players().len(), 1);
    assert_eq!(replica.players()[0].name, "rina");
    assert_eq!(replica.players()[0].health, PLAYER_STARTING_HEALTH);
    // The first joiner holds the turn, on both ends.
    assert_eq!(replica.current_turn(), rina.local_id());
    assert_eq!(replica, host.state().unwrap());
    assert_eq!(host.joined_player_count(), 1);
}

#[test]
fn attack_converges_both_ends_on_the_same_state() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    join(&hub, &mut host, &mut rina, "rina");

    rina.submit_player_attack(&catalog::simple_strike()).unwrap();
    host.poll_peers();
    rina.poll_peers();

    let replica = rina.state().unwrap();
    assert_eq!(replica.boss().health, BOSS_STARTING_HEALTH - 5);
    // Sole player attacked; the rotation hands the turn back to the boss.
    assert!(replica.is_boss_turn());
    assert_eq!(replica, host.state().unwrap());
}

#[test]
fn boss_attack_is_replicated_and_rolls_in_range() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 21);
    let mut rina = start_follower(&hub, "rina");
    join(&hub, &mut host, &mut rina, "rina");

    rina.submit_player_attack(&catalog::simple_strike()).unwrap();
    host.poll_peers();
    rina.poll_peers();
    assert!(host.state().unwrap().is_boss_turn());

    host.submit_boss_attack().unwrap();
    rina.poll_peers();

    let replica = rina.state().unwrap();
    let lost = PLAYER_STARTING_HEALTH - replica.players()[0].health;
    assert!((BOSS_ATTACK_MIN_DAMAGE..=BOSS_ATTACK_MAX_DAMAGE).contains(&lost));
    assert_eq!(replica.current_turn(), rina.local_id());
    assert_eq!(replica, host.state().unwrap());
}

#[test]
fn turns_rotate_across_two_followers() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 3);
    let mut rina = start_follower(&hub, "rina");
    let mut brin = start_follower(&hub, "brin");
    join(&hub, &mut host, &mut rina, "rina");
    join(&hub, &mut host, &mut brin, "brin");
    rina.poll_peers(); // rina catches up on brin's join snapshot

    // Rina joined first and still holds the turn.
    rina.submit_player_attack(&catalog::simple_strike()).unwrap();
    host.poll_peers();
    rina.poll_peers();
    brin.poll_peers();
    assert_eq!(host.state().unwrap().current_turn(), brin.local_id());

    brin.submit_player_attack(&catalog::heavy_bash()).unwrap();
    host.poll_peers();
    rina.poll_peers();
    brin.poll_peers();

    let canonical = host.state().unwrap();
    assert_eq!(canonical.boss().health, BOSS_STARTING_HEALTH - 5 - 12);
    assert!(canonical.is_boss_turn());
    assert_eq!(rina.state().unwrap(), canonical);
    assert_eq!(brin.state().unwrap(), canonical);
}

#[test]
fn host_drops_attack_from_unmapped_peer() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    join(&hub, &mut host, &mut rina, "rina");

    // A connected peer that never joined forges an attack.
    let mut lurker = hub.attach("lurker");
    hub.connect("host", "lurker");
    let forged = codec::encode(&Message::new(MessageBody::PlayerAttack(
        catalog::heavy_bash(),
    )))
    .unwrap();
    lurker.send_to(&forged, &"host".to_owned()).unwrap();
    host.poll_peers();

    assert_eq!(host.state().unwrap().boss().health, BOSS_STARTING_HEALTH);
    assert_eq!(host.joined_player_count(), 1);
}

#[test]
fn host_drops_out_of_turn_attack_from_mapped_peer() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    let mut brin = start_follower(&hub, "brin");
    join(&hub, &mut host, &mut rina, "rina");
    join(&hub, &mut host, &mut brin, "brin");

    // Brin is mapped but it is rina's turn; forge the attack directly so the
    // follower's local gate cannot save us.
    let mut raw = hub.attach("forger");
    hub.connect("host", "forger");
    let join_msg = codec::encode(&Message::new(MessageBody::PlayerJoin(
        warband_sync::Player::new(
            ParticipantId::from_u128(0xF0),
            "Forger",
            catalog::default_move_set(),
        ),
    )))
    .unwrap();
    raw.send_to(&join_msg, &"host".to_owned()).unwrap();
    host.poll_peers();
    assert_eq!(host.joined_player_count(), 3);

    let before = host.state().unwrap().clone();
    let forged = codec::encode(&Message::new(MessageBody::PlayerAttack(
        catalog::heavy_bash(),
    )))
    .unwrap();
    raw.send_to(&forged, &"host".to_owned()).unwrap();
    host.poll_peers();

    assert_eq!(host.state().unwrap(), &before);
}

#[test]
fn host_drops_garbage_and_duplicate_joins() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    join(&hub, &mut host, &mut rina, "rina");

    let mut raw = hub.attach("noisy");
    hub.connect("host", "noisy");
    raw.send_to(&[0xFF; 16], &"host".to_owned()).unwrap();
    host.poll_peers();
    assert_eq!(host.joined_player_count(), 1);

    // A second join from rina's address is ignored.
    let dup = codec::encode(&Message::new(MessageBody::PlayerJoin(
        warband_sync::Player::new(
            ParticipantId::from_u128(0xD0),
            "Impostor",
            Vec::new(),
        ),
    )))
    .unwrap();
    let mut rina_wire = hub.attach("rina2");
    hub.connect("host", "rina2");
    rina_wire.send_to(&dup, &"host".to_owned()).unwrap();
    rina_wire.send_to(&dup, &"host".to_owned()).unwrap();
    host.poll_peers();
    assert_eq!(host.joined_player_count(), 2);
    assert_eq!(host.state().unwrap().players().len(), 2);
}

#[test]
fn host_drops_message_with_foreign_wire_tag() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    join(&hub, &mut host, &mut rina, "rina");

    let mut raw = hub.attach("foreign");
    hub.connect("host", "foreign");
    let mut bytes = codec::encode(&Message::new(MessageBody::PlayerJoin(
        warband_sync::Player::new(
            ParticipantId::from_u128(0xFE),
            "Foreign",
            catalog::default_move_set(),
        ),
    )))
    .unwrap();
    // Fixed-int encoding puts the u16 magic in the first two bytes.
    bytes[0] ^= 0xFF;
    raw.send_to(&bytes, &"host".to_owned()).unwrap();
    host.poll_peers();

    assert_eq!(host.joined_player_count(), 1);
    assert_eq!(host.state().unwrap().players().len(), 1);
}

#[test]
fn disconnect_removes_the_player_and_reassigns_the_turn() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    let mut brin = start_follower(&hub, "brin");
    join(&hub, &mut host, &mut rina, "rina");
    join(&hub, &mut host, &mut brin, "brin");

    // Rina holds the turn; her peer vanishes.
    hub.disconnect("host", "rina");
    host.poll_peers();
    brin.poll_peers();

    let canonical = host.state().unwrap();
    assert_eq!(canonical.players().len(), 1);
    assert_eq!(canonical.players()[0].name, "brin");
    // The departed turn holder hands the turn to the boss.
    assert!(canonical.is_boss_turn());
    assert_eq!(host.joined_player_count(), 1);
    // The surviving follower converged on the reconciled state.
    assert_eq!(brin.state().unwrap(), canonical);
}

#[test]
fn unjoined_peer_disconnect_leaves_the_battle_alone() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    join(&hub, &mut host, &mut rina, "rina");

    let _lurker = hub.attach("lurker");
    hub.connect("host", "lurker");
    hub.disconnect("host", "lurker");
    let before = host.state().unwrap().clone();
    host.poll_peers();
    assert_eq!(host.state().unwrap(), &before);
}

#[test]
fn host_loss_closes_followers() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    let mut brin = start_follower(&hub, "brin");
    join(&hub, &mut host, &mut rina, "rina");
    join(&hub, &mut host, &mut brin, "brin");
    rina.poll_peers();
    let _ = rina.events();
    let _ = brin.events();

    hub.drop_endpoint("host");
    rina.poll_peers();
    brin.poll_peers();

    for follower in [&mut rina, &mut brin] {
        assert!(follower.is_closed());
        // The last replica survives for display.
        assert!(follower.state().is_some());
        let events: Vec<_> = follower.events().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::HostDisconnected)));
    }
}

#[test]
fn state_changed_events_fire_on_both_ends() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");

    hub.connect("host", "rina");
    rina.poll_peers();
    host.poll_peers();
    rina.poll_peers();

    let host_events: Vec<_> = host.events().collect();
    assert!(host_events
        .iter()
        .any(|e| matches!(e, SessionEvent::PeerConnected { .. })));
    assert!(host_events
        .iter()
        .any(|e| matches!(e, SessionEvent::StateChanged)));

    let follower_events: Vec<_> = rina.events().collect();
    assert!(follower_events
        .iter()
        .any(|e| matches!(e, SessionEvent::StateChanged)));
}

#[test]
fn winning_blow_terminates_the_battle_everywhere() {
    let hub = LoopbackHub::new();
    let mut host = start_host(&hub, 7);
    let mut rina = start_follower(&hub, "rina");
    // A follower whose single move one-shots the boss.
    let mut solo = SessionBuilder::new()
        .with_player_name("solo")
        .with_moves(vec![warband_sync::Move {
            id: 99,
            name: "Worldbreaker".to_owned(),
            damage: BOSS_STARTING_HEALTH,
            description: String::new(),
        }])
        .start_follower(hub.attach("solo"));
    join(&hub, &mut host, &mut rina, "rina");
    // rina holds the turn; remove her so solo joins into an empty roster.
    hub.disconnect("host", "rina");
    host.poll_peers();
    join(&hub, &mut host, &mut solo, "solo");

    let nuke = solo.local_player().moves[0].clone();
    solo.submit_player_attack(&nuke).unwrap();
    host.poll_peers();
    solo.poll_peers();

    assert!(host.state().unwrap().is_over());
    assert!(solo.state().unwrap().is_over());
    assert_eq!(
        solo.state().unwrap().status_message(),
        "The Boss has been defeated! Players win!"
    );

    // Terminal state is absorbing over the wire too.
    let frozen = host.state().unwrap().clone();
    solo.submit_player_attack(&nuke).unwrap();
    host.submit_boss_attack().unwrap();
    host.poll_peers();
    assert_eq!(host.state().unwrap(), &frozen);
}
