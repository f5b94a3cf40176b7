use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_ROUNDS: u32 = 5;
pub const MAX_ROUNDS: u32 = 20;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;
pub const ROOM_CODE_LENGTH: usize = 6;
pub const MAX_NAME_LENGTH: usize = 20;
pub const MAX_AVATAR_LENGTH: usize = 8;
pub const MAX_PACKET_SIZE: usize = 2048;

/// Participant identifier. Equal to the transport connection id.
pub type PlayerId = u32;

/// The four hidden roles handed out each round.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Raja,
    Mantri,
    Chor,
    Sipahi,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Raja, Role::Mantri, Role::Chor, Role::Sipahi];

    /// Base payoff for holding this role in a round.
    pub fn points(self) -> u32 {
        match self {
            Role::Raja => 2000,
            Role::Mantri => 900,
            Role::Chor => 0,
            Role::Sipahi => 700,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Raja => "👑 Raja",
            Role::Mantri => "🧠 Mantri",
            Role::Chor => "🦹 Chor",
            Role::Sipahi => "👮 Sipahi",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Raja => "Raja",
            Role::Mantri => "Mantri",
            Role::Chor => "Chor",
            Role::Sipahi => "Sipahi",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

/// Wire-level classification of a rejected action.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Capacity,
    Conflict,
    InvalidState,
    InsufficientPlayers,
    InvalidInput,
    Internal,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub is_host: bool,
    pub is_ready: bool,
}

/// Public snapshot of a room. Never carries role assignments.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: String,
    pub host_id: PlayerId,
    pub players: Vec<PlayerInfo>,
    pub status: GameStatus,
    pub current_round: u32,
    pub total_rounds: u32,
    pub max_players: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub round: u32,
    pub sipahi_id: PlayerId,
    /// Absent when the Chor left the room before the guess.
    pub chor_id: Option<PlayerId>,
    pub suspected_id: PlayerId,
    pub is_correct: bool,
    /// Points earned this round, one entry per member at resolution time.
    pub points: HashMap<PlayerId, u32>,
}

impl RoundResult {
    pub fn total_points(&self) -> u32 {
        self.points.values().sum()
    }
}

/// Actions a connected client can request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ClientAction {
    CreateRoom {
        name: String,
        avatar: String,
        rounds: Option<u32>,
    },
    JoinRoom {
        room_code: String,
        name: String,
        avatar: String,
    },
    ToggleReady {
        room_code: String,
    },
    StartGame {
        room_code: String,
        rounds: Option<u32>,
    },
    MakeGuess {
        room_code: String,
        suspected_player_id: PlayerId,
    },
    NextRound {
        room_code: String,
    },
    LeaveRoom {
        room_code: String,
    },
    Status,
}

impl ClientAction {
    /// Short verb phrase used in generic failure messages.
    pub fn describe(&self) -> &'static str {
        match self {
            ClientAction::CreateRoom { .. } => "create room",
            ClientAction::JoinRoom { .. } => "join room",
            ClientAction::ToggleReady { .. } => "toggle ready",
            ClientAction::StartGame { .. } => "start game",
            ClientAction::MakeGuess { .. } => "make guess",
            ClientAction::NextRound { .. } => "start next round",
            ClientAction::LeaveRoom { .. } => "leave room",
            ClientAction::Status => "query status",
        }
    }
}

/// Notifications produced by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    RoomCreated {
        player_id: PlayerId,
        room: RoomInfo,
    },
    RoomJoined {
        player_id: PlayerId,
        room: RoomInfo,
    },
    PlayerJoined {
        player: PlayerInfo,
        room: RoomInfo,
    },
    PlayerReady {
        player_id: PlayerId,
        is_ready: bool,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    GameStarted {
        round: u32,
        total_rounds: u32,
        room: RoomInfo,
    },
    CharacterAssigned {
        round: u32,
        role: Role,
        is_sipahi: bool,
    },
    RoundResults {
        result: RoundResult,
        scores: HashMap<PlayerId, u32>,
        roles: HashMap<PlayerId, Role>,
    },
    RoundStarted {
        round: u32,
        total_rounds: u32,
    },
    GameFinished {
        winner: Option<PlayerInfo>,
        scores: HashMap<PlayerId, u32>,
    },
    PlayerLeft {
        player_id: PlayerId,
        name: String,
        room: RoomInfo,
    },
    NewHost {
        host_id: PlayerId,
        name: String,
    },
    RoomLeft {
        room_code: String,
    },
    Status {
        rooms: usize,
        participants: usize,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect { client_version: u32 },
    Heartbeat,
    Disconnect,
    Action(ClientAction),

    Connected { client_id: PlayerId },
    Disconnected { reason: String },
    Event(ServerEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_points() {
        assert_eq!(Role::Raja.points(), 2000);
        assert_eq!(Role::Mantri.points(), 900);
        assert_eq!(Role::Chor.points(), 0);
        assert_eq!(Role::Sipahi.points(), 700);
    }

    #[test]
    fn test_role_catalog_is_complete() {
        let total: u32 = Role::ALL.iter().map(|r| r.points()).sum();
        assert_eq!(total, 3600);

        for (i, a) in Role::ALL.iter().enumerate() {
            for b in &Role::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_role_display_and_label() {
        assert_eq!(Role::Sipahi.to_string(), "Sipahi");
        assert!(Role::Raja.label().ends_with("Raja"));
        assert!(Role::Chor.label().contains("Chor"));
    }

    #[test]
    fn test_round_result_total_points() {
        let mut points = HashMap::new();
        points.insert(1, 700);
        points.insert(2, 0);
        points.insert(3, 2000);

        let result = RoundResult {
            round: 1,
            sipahi_id: 1,
            chor_id: Some(2),
            suspected_id: 2,
            is_correct: true,
            points,
        };

        assert_eq!(result.total_points(), 2700);
    }

    #[test]
    fn test_action_descriptions() {
        let guess = ClientAction::MakeGuess {
            room_code: "ABC123".to_string(),
            suspected_player_id: 2,
        };
        assert_eq!(guess.describe(), "make guess");
        assert_eq!(ClientAction::Status.describe(), "query status");
    }

    #[test]
    fn test_packet_serialization_action() {
        let packet = Packet::Action(ClientAction::JoinRoom {
            room_code: "ABC123".to_string(),
            name: "Bob".to_string(),
            avatar: "🐯".to_string(),
        });

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Action(ClientAction::JoinRoom {
                room_code,
                name,
                avatar,
            }) => {
                assert_eq!(room_code, "ABC123");
                assert_eq!(name, "Bob");
                assert_eq!(avatar, "🐯");
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_round_results() {
        let mut points = HashMap::new();
        points.insert(1, 0);
        points.insert(2, 700);

        let mut roles = HashMap::new();
        roles.insert(1, Role::Sipahi);
        roles.insert(2, Role::Chor);

        let packet = Packet::Event(ServerEvent::RoundResults {
            result: RoundResult {
                round: 3,
                sipahi_id: 1,
                chor_id: Some(2),
                suspected_id: 3,
                is_correct: false,
                points: points.clone(),
            },
            scores: points,
            roles,
        });

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();
        assert_eq!(deserialized, packet);
        assert!(serialized.len() < MAX_PACKET_SIZE);
    }

    /// The fullest room notification must still fit in one datagram
    #[test]
    fn test_largest_room_event_fits_packet() {
        let players: Vec<PlayerInfo> = (1..=MAX_PLAYERS as PlayerId)
            .map(|id| PlayerInfo {
                id,
                name: "𝕏".repeat(MAX_NAME_LENGTH),
                avatar: "👑".repeat(MAX_AVATAR_LENGTH),
                is_host: id == 1,
                is_ready: true,
            })
            .collect();
        let room = RoomInfo {
            code: "Z".repeat(ROOM_CODE_LENGTH),
            host_id: 1,
            players: players.clone(),
            status: GameStatus::Playing,
            current_round: MAX_ROUNDS,
            total_rounds: MAX_ROUNDS,
            max_players: MAX_PLAYERS,
        };

        let events = [
            ServerEvent::PlayerJoined {
                player: players[3].clone(),
                room: room.clone(),
            },
            ServerEvent::PlayerLeft {
                player_id: 4,
                name: players[3].name.clone(),
                room: room.clone(),
            },
            ServerEvent::GameStarted {
                round: 1,
                total_rounds: MAX_ROUNDS,
                room,
            },
        ];
        for event in events {
            let serialized = bincode::serialize(&Packet::Event(event)).unwrap();
            assert!(serialized.len() < MAX_PACKET_SIZE);
        }
    }
}
