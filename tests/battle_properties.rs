//! Property tests for the battle state machine.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use proptest::prelude::*;

use warband_sync::battle::catalog;
use warband_sync::rng::{Pcg32, SeedableRng};
use warband_sync::{
    BattleState, Boss, Move, ParticipantId, Player, BOSS_ATTACK_MAX_DAMAGE,
    BOSS_ATTACK_MIN_DAMAGE, BOSS_STARTING_HEALTH, PLAYER_STARTING_HEALTH,
};

fn pid(raw: u128) -> ParticipantId {
    ParticipantId::from_u128(raw)
}

fn battle_with_roster(size: usize) -> BattleState {
    let mut state = BattleState::new(Boss::new(pid(0xB055), "Gravemaw", Vec::new()));
    for i in 0..size {
        state.add_player(Player::new(
            pid(i as u128 + 1),
            format!("P{i}"),
            catalog::default_move_set(),
        ));
    }
    state
}

proptest! {
    /// One full rotation always visits every roster slot once and returns the
    /// turn to the boss, for any roster size.
    #[test]
    fn rotation_visits_everyone_then_the_boss(size in 1usize..=5) {
        let mut state = battle_with_roster(size);
        // The first joiner holds the turn; each attack advances one slot.
        let weak = Move {
            id: 7,
            name: "Poke".to_owned(),
            damage: 1,
            description: String::new(),
        };
        for i in 0..size {
            prop_assert_eq!(state.current_turn(), pid(i as u128 + 1));
            prop_assert!(state.resolve_player_attack(state.current_turn(), &weak));
        }
        prop_assert!(state.is_boss_turn());
    }

    /// Player attacks subtract exactly the move's damage from the boss.
    #[test]
    fn player_damage_is_exact(damage in 1i32..BOSS_STARTING_HEALTH) {
        let mut state = battle_with_roster(1);
        let mv = Move {
            id: 7,
            name: "Poke".to_owned(),
            damage,
            description: String::new(),
        };
        prop_assert!(state.resolve_player_attack(pid(1), &mv));
        prop_assert_eq!(state.boss().health, BOSS_STARTING_HEALTH - damage);
    }

    /// Boss rolls always land inside the inclusive damage range, hit exactly
    /// one roster member, and hand the turn to the first player.
    #[test]
    fn boss_roll_stays_in_range(seed in any::<u64>(), size in 1usize..=5) {
        let mut state = battle_with_roster(size);
        // Walk the rotation until the boss holds the turn.
        let weak = Move {
            id: 7,
            name: "Poke".to_owned(),
            damage: 1,
            description: String::new(),
        };
        while !state.is_boss_turn() {
            state.resolve_player_attack(state.current_turn(), &weak);
        }

        let mut rng = Pcg32::seed_from_u64(seed);
        state.resolve_boss_attack(&mut rng);

        let hurt: Vec<i32> = state
            .players()
            .iter()
            .map(|p| PLAYER_STARTING_HEALTH - p.health)
            .filter(|lost| *lost > 0)
            .collect();
        prop_assert_eq!(hurt.len(), 1);
        prop_assert!((BOSS_ATTACK_MIN_DAMAGE..=BOSS_ATTACK_MAX_DAMAGE).contains(&hurt[0]));
        prop_assert_eq!(state.current_turn(), pid(1));
    }

    /// Once the boss is defeated, no sequence of resolve calls changes the
    /// state.
    #[test]
    fn terminal_state_absorbs_everything(seed in any::<u64>(), extra_ops in 1usize..10) {
        let mut state = battle_with_roster(2);
        let nuke = Move {
            id: 7,
            name: "Nuke".to_owned(),
            damage: BOSS_STARTING_HEALTH,
            description: String::new(),
        };
        prop_assert!(state.resolve_player_attack(pid(1), &nuke));
        prop_assert!(state.is_over());
        let frozen = state.clone();

        let mut rng = Pcg32::seed_from_u64(seed);
        for i in 0..extra_ops {
            if i % 2 == 0 {
                prop_assert!(!state.resolve_player_attack(pid(2), &nuke));
            } else {
                state.resolve_boss_attack(&mut rng);
            }
        }
        prop_assert_eq!(&state, &frozen);
    }

    /// Removing any player keeps `current_turn` pointing at a present
    /// participant (a roster member or the boss).
    #[test]
    fn turn_never_dangles_after_removal(size in 1usize..=5, victim in 0usize..5) {
        let mut state = battle_with_roster(size);
        let victim_id = pid((victim % size) as u128 + 1);
        prop_assert!(state.remove_player(victim_id));

        let turn = state.current_turn();
        let present = turn == state.boss().id || state.player(turn).is_some();
        prop_assert!(present);
    }
}
