//! Session dispatcher
//!
//! Turns one inbound client action into the list of notifications it causes.
//! The dispatcher never talks to the network: every call returns explicit
//! `(recipient, event)` pairs and the transport delivers them. Actions are
//! processed one at a time against the registry it owns.
//!
//! Rejected actions produce a single `ServerEvent::Error` addressed to the
//! caller and leave rooms and registry untouched.

use crate::config::{ConfigError, GameConfig};
use crate::error::{SessionError, SessionResult};
use crate::registry::{LeaveOutcome, RoomRegistry};
use crate::room::{
    validate_avatar, validate_name, Participant, Room, RoomSettings, RoundAdvance,
};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientAction, ErrorKind, PlayerId, ServerEvent};

/// A notification addressed to one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub recipient: PlayerId,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn new(recipient: PlayerId, event: ServerEvent) -> Self {
        Self { recipient, event }
    }
}

pub struct Dispatcher {
    registry: RoomRegistry,
    config: GameConfig,
    rng: StdRng,
}

impl Dispatcher {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Builds a dispatcher with a fixed random source, for reproducible games.
    pub fn with_rng(config: GameConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: RoomRegistry::new(),
            config,
            rng,
        })
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Processes one action from `caller`
    pub fn handle(&mut self, caller: PlayerId, action: ClientAction) -> Vec<Outbound> {
        let description = action.describe();
        debug!("Player {} requested {}", caller, description);

        let result = match action {
            ClientAction::CreateRoom {
                name,
                avatar,
                rounds,
            } => self.create_room(caller, name, avatar, rounds),
            ClientAction::JoinRoom {
                room_code,
                name,
                avatar,
            } => self.join_room(caller, &room_code, name, avatar),
            ClientAction::ToggleReady { room_code } => self.toggle_ready(caller, &room_code),
            ClientAction::StartGame { room_code, rounds } => {
                self.start_game(caller, &room_code, rounds)
            }
            ClientAction::MakeGuess {
                room_code,
                suspected_player_id,
            } => self.make_guess(caller, &room_code, suspected_player_id),
            ClientAction::NextRound { room_code } => self.next_round(caller, &room_code),
            ClientAction::LeaveRoom { room_code } => self.leave_room(caller, &room_code),
            ClientAction::Status => Ok(vec![Outbound::new(caller, self.status())]),
        };

        match result {
            Ok(outbound) => outbound,
            Err(SessionError::Internal(reason)) => {
                error!(
                    "Internal failure while player {} tried to {}: {}",
                    caller, description, reason
                );
                vec![Outbound::new(
                    caller,
                    ServerEvent::Error {
                        kind: ErrorKind::Internal,
                        message: format!("Failed to {}", description),
                    },
                )]
            }
            Err(e) => {
                warn!("Rejected {} from player {}: {}", description, caller, e);
                vec![Outbound::new(
                    caller,
                    ServerEvent::Error {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                )]
            }
        }
    }

    /// Removes a participant from their room, if any. Safe to call repeatedly.
    pub fn disconnect(&mut self, caller: PlayerId) -> Vec<Outbound> {
        match self.registry.leave(caller) {
            Some(outcome) => {
                info!(
                    "Player {} left room {}",
                    outcome.departure.participant.id, outcome.room_code
                );
                self.departure_events(outcome)
            }
            None => Vec::new(),
        }
    }

    pub fn status(&self) -> ServerEvent {
        ServerEvent::Status {
            rooms: self.registry.room_count(),
            participants: self.registry.participant_count(),
        }
    }

    fn create_room(
        &mut self,
        caller: PlayerId,
        name: String,
        avatar: String,
        rounds: Option<u32>,
    ) -> SessionResult<Vec<Outbound>> {
        let name = validate_name(&name)?;
        let avatar = validate_avatar(&avatar)?;
        let settings = RoomSettings::from_config(&self.config, rounds)?;
        let host = Participant::new(caller, name, avatar);

        let room = self.registry.create_room(host, settings, &mut self.rng)?;

        Ok(vec![Outbound::new(
            caller,
            ServerEvent::RoomCreated {
                player_id: caller,
                room: room.info(),
            },
        )])
    }

    fn join_room(
        &mut self,
        caller: PlayerId,
        room_code: &str,
        name: String,
        avatar: String,
    ) -> SessionResult<Vec<Outbound>> {
        let name = validate_name(&name)?;
        let avatar = validate_avatar(&avatar)?;
        let participant = Participant::new(caller, name, avatar);

        let room = self.registry.join_room(room_code, participant)?;
        let info = room.info();
        let player = room.member(caller).map(Participant::info).ok_or_else(|| {
            SessionError::Internal(format!("player {} missing after join", caller))
        })?;

        let mut outbound = vec![Outbound::new(
            caller,
            ServerEvent::RoomJoined {
                player_id: caller,
                room: info.clone(),
            },
        )];
        outbound.extend(broadcast_except(
            room,
            caller,
            ServerEvent::PlayerJoined { player, room: info },
        ));
        Ok(outbound)
    }

    fn toggle_ready(&mut self, caller: PlayerId, room_code: &str) -> SessionResult<Vec<Outbound>> {
        let room = member_room_mut(&mut self.registry, caller, room_code)?;
        let is_ready = room.toggle_ready(caller)?;

        Ok(broadcast(
            room,
            ServerEvent::PlayerReady {
                player_id: caller,
                is_ready,
            },
        ))
    }

    fn start_game(
        &mut self,
        caller: PlayerId,
        room_code: &str,
        rounds: Option<u32>,
    ) -> SessionResult<Vec<Outbound>> {
        let room = member_room_mut(&mut self.registry, caller, room_code)?;
        room.start_game(caller, rounds, &mut self.rng)?;

        let mut outbound = broadcast(
            room,
            ServerEvent::GameStarted {
                round: room.game.current_round,
                total_rounds: room.game.total_rounds,
                room: room.info(),
            },
        );
        outbound.extend(character_assignments(room)?);
        Ok(outbound)
    }

    fn make_guess(
        &mut self,
        caller: PlayerId,
        room_code: &str,
        suspected_id: PlayerId,
    ) -> SessionResult<Vec<Outbound>> {
        let room = member_room_mut(&mut self.registry, caller, room_code)?;
        let result = room.resolve_guess(caller, suspected_id)?.clone();

        let event = ServerEvent::RoundResults {
            result,
            scores: room.game.scores.clone(),
            roles: room.game.assignment.roles.clone(),
        };
        Ok(broadcast(room, event))
    }

    fn next_round(&mut self, caller: PlayerId, room_code: &str) -> SessionResult<Vec<Outbound>> {
        let room = member_room_mut(&mut self.registry, caller, room_code)?;

        match room.advance_round(caller, &mut self.rng)? {
            RoundAdvance::Finished { winner } => {
                let winner = winner.and_then(|id| room.member(id)).map(Participant::info);
                let event = ServerEvent::GameFinished {
                    winner,
                    scores: room.game.scores.clone(),
                };
                Ok(broadcast(room, event))
            }
            RoundAdvance::NextRound { round } => {
                let mut outbound = broadcast(
                    room,
                    ServerEvent::RoundStarted {
                        round,
                        total_rounds: room.game.total_rounds,
                    },
                );
                outbound.extend(character_assignments(room)?);
                Ok(outbound)
            }
        }
    }

    fn leave_room(&mut self, caller: PlayerId, room_code: &str) -> SessionResult<Vec<Outbound>> {
        member_room_mut(&mut self.registry, caller, room_code)?;

        let outcome = self
            .registry
            .leave(caller)
            .ok_or_else(|| SessionError::Internal(format!("player {} vanished", caller)))?;
        let left_code = outcome.room_code.clone();

        let mut outbound = vec![Outbound::new(
            caller,
            ServerEvent::RoomLeft {
                room_code: left_code,
            },
        )];
        outbound.extend(self.departure_events(outcome));
        Ok(outbound)
    }

    fn departure_events(&self, outcome: LeaveOutcome) -> Vec<Outbound> {
        if outcome.room_deleted {
            return Vec::new();
        }
        let Some(room) = self.registry.find_room(&outcome.room_code) else {
            return Vec::new();
        };

        let participant = outcome.departure.participant;
        let mut outbound = broadcast(
            room,
            ServerEvent::PlayerLeft {
                player_id: participant.id,
                name: participant.name,
                room: room.info(),
            },
        );

        if let Some(host) = outcome.departure.new_host.and_then(|id| room.member(id)) {
            outbound.extend(broadcast(
                room,
                ServerEvent::NewHost {
                    host_id: host.id,
                    name: host.name.clone(),
                },
            ));
        }
        outbound
    }
}

/// Looks up a room the caller belongs to
fn member_room_mut<'a>(
    registry: &'a mut RoomRegistry,
    caller: PlayerId,
    room_code: &str,
) -> SessionResult<&'a mut Room> {
    let room = registry
        .find_room_mut(room_code)
        .ok_or_else(|| SessionError::RoomNotFound(room_code.to_string()))?;
    if !room.is_member(caller) {
        return Err(SessionError::NotMember);
    }
    Ok(room)
}

fn broadcast(room: &Room, event: ServerEvent) -> Vec<Outbound> {
    room.members()
        .iter()
        .map(|p| Outbound::new(p.id, event.clone()))
        .collect()
}

fn broadcast_except(room: &Room, excluded: PlayerId, event: ServerEvent) -> Vec<Outbound> {
    room.members()
        .iter()
        .filter(|p| p.id != excluded)
        .map(|p| Outbound::new(p.id, event.clone()))
        .collect()
}

/// One private role notice per member
fn character_assignments(room: &Room) -> SessionResult<Vec<Outbound>> {
    room.members()
        .iter()
        .map(|p| {
            let role = room.game.role_of(p.id).ok_or_else(|| {
                SessionError::Internal(format!("player {} has no role in room {}", p.id, room.code))
            })?;
            Ok(Outbound::new(
                p.id,
                ServerEvent::CharacterAssigned {
                    round: room.game.current_round,
                    role,
                    is_sipahi: room.game.assignment.sipahi_id == Some(p.id),
                },
            ))
        })
        .collect()
}
