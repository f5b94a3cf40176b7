//! Performance benchmarks for critical game systems

use bincode::{deserialize, serialize};
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::config::GameConfig;
use server::dispatcher::Dispatcher;
use server::roles::assign_roles;
use server::scoring::{apply_points, compute_round_result};
use shared::{ClientAction, Packet, PlayerId, ServerEvent};
use std::collections::HashMap;
use std::time::Instant;

/// Benchmarks role dealing for a full room
#[test]
fn benchmark_role_assignment() {
    let members: Vec<PlayerId> = vec![1, 2, 3, 4];
    let mut rng = StdRng::seed_from_u64(1);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let assignment = assign_roles(&members, &mut rng);
        assert!(assignment.sipahi_id.is_some());
    }

    let duration = start.elapsed();
    println!(
        "Role assignment: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks round scoring and accumulation
#[test]
fn benchmark_round_scoring() {
    let members: Vec<PlayerId> = vec![1, 2, 3, 4];
    let mut rng = StdRng::seed_from_u64(2);
    let mut scores: HashMap<PlayerId, u32> = HashMap::new();

    let iterations = 50_000;
    let start = Instant::now();

    for round in 0..iterations {
        let assignment = assign_roles(&members, &mut rng);
        let sipahi = assignment.sipahi_id.unwrap();
        let suspect = if round % 2 == 0 {
            assignment.chor_id.unwrap()
        } else {
            *members.iter().find(|id| **id != sipahi).unwrap()
        };
        let result = compute_round_result(round + 1, &members, &assignment, sipahi, suspect);
        apply_points(&mut scores, &result);
    }

    let duration = start.elapsed();
    println!(
        "Round scoring: {} rounds in {:?} ({:.2} μs/round)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(scores.values().map(|s| *s as u64).sum::<u64>(), 3600 * iterations as u64);
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks complete games driven through the dispatcher
#[test]
fn benchmark_full_games() {
    let mut dispatcher =
        Dispatcher::with_rng(GameConfig::default(), StdRng::seed_from_u64(3)).unwrap();

    let games = 500;
    let start = Instant::now();

    for game in 0..games {
        let base = game * 4 + 1;
        let out = dispatcher.handle(
            base,
            ClientAction::CreateRoom {
                name: "Host".to_string(),
                avatar: "👑".to_string(),
                rounds: Some(5),
            },
        );
        let code = match &out[0].event {
            ServerEvent::RoomCreated { room, .. } => room.code.clone(),
            other => panic!("unexpected: {:?}", other),
        };
        for offset in 1..4 {
            dispatcher.handle(
                base + offset,
                ClientAction::JoinRoom {
                    room_code: code.clone(),
                    name: format!("Player{}", offset),
                    avatar: "🙂".to_string(),
                },
            );
        }
        dispatcher.handle(
            base,
            ClientAction::StartGame {
                room_code: code.clone(),
                rounds: None,
            },
        );

        for _ in 0..5 {
            let room = dispatcher.registry().find_room(&code).unwrap();
            let sipahi = room.game.assignment.sipahi_id.unwrap();
            let chor = room.game.assignment.chor_id.unwrap();
            dispatcher.handle(
                sipahi,
                ClientAction::MakeGuess {
                    room_code: code.clone(),
                    suspected_player_id: chor,
                },
            );
            dispatcher.handle(
                base,
                ClientAction::NextRound {
                    room_code: code.clone(),
                },
            );
        }
    }

    let duration = start.elapsed();
    println!(
        "Full games: {} games in {:?} ({:.2} μs/game)",
        games,
        duration,
        duration.as_micros() as f64 / games as f64
    );

    assert_eq!(dispatcher.registry().room_count(), games as usize);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks packet serialization for the largest regular event
#[test]
fn benchmark_packet_serialization() {
    let mut dispatcher =
        Dispatcher::with_rng(GameConfig::default(), StdRng::seed_from_u64(4)).unwrap();
    dispatcher.handle(
        1,
        ClientAction::CreateRoom {
            name: "Alice".to_string(),
            avatar: "🦁".to_string(),
            rounds: None,
        },
    );
    let code = dispatcher.registry().room_of(1).unwrap().to_string();
    for (id, name) in [(2, "Bob"), (3, "Carol"), (4, "Dave")] {
        dispatcher.handle(
            id,
            ClientAction::JoinRoom {
                room_code: code.clone(),
                name: name.to_string(),
                avatar: "🐯".to_string(),
            },
        );
    }
    let room = dispatcher.registry().find_room(&code).unwrap();
    let packet = Packet::Event(ServerEvent::PlayerJoined {
        player: room.members()[3].info(),
        room: room.info(),
    });

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Packet serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(serialize(&packet).unwrap().len() < shared::MAX_PACKET_SIZE);
    assert!(duration.as_millis() < 1000);
}
