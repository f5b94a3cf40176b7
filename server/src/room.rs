//! Room membership and the per-room game state machine
//!
//! A room moves through `Waiting -> Playing -> Finished`. Inside `Playing`
//! every round deals fresh roles, accepts exactly one guess from the Sipahi,
//! and is then advanced by the host. All operations validate completely
//! before touching any state, so a rejected call leaves the room unchanged.

use crate::config::GameConfig;
use crate::error::{SessionError, SessionResult};
use crate::roles::{assign_roles, RoleAssignment};
use crate::scoring::{apply_points, compute_round_result};
use log::{debug, info};
use rand::Rng;
use shared::{
    GameStatus, PlayerId, PlayerInfo, Role, RoomInfo, RoundResult, MAX_AVATAR_LENGTH,
    MAX_NAME_LENGTH, MAX_ROUNDS, MIN_PLAYERS,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub is_host: bool,
    pub is_ready: bool,
}

impl Participant {
    pub fn new(id: PlayerId, name: String, avatar: String) -> Self {
        Self {
            id,
            name,
            avatar,
            is_host: false,
            is_ready: false,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            is_host: self.is_host,
            is_ready: self.is_ready,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    pub rounds: u32,
    pub max_players: usize,
}

impl RoomSettings {
    pub fn from_config(config: &GameConfig, rounds: Option<u32>) -> SessionResult<Self> {
        Ok(Self {
            rounds: validate_rounds(rounds.unwrap_or(config.default_rounds))?,
            max_players: config.max_players,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub status: GameStatus,
    /// 1-based while playing, 0 before the first game starts. Stays at
    /// `total_rounds` once the game is finished.
    pub current_round: u32,
    pub total_rounds: u32,
    pub assignment: RoleAssignment,
    pub scores: HashMap<PlayerId, u32>,
    pub last_result: Option<RoundResult>,
}

impl GameState {
    pub fn new(total_rounds: u32) -> Self {
        Self {
            status: GameStatus::Waiting,
            current_round: 0,
            total_rounds,
            assignment: RoleAssignment::empty(),
            scores: HashMap::new(),
            last_result: None,
        }
    }

    pub fn role_of(&self, player_id: PlayerId) -> Option<Role> {
        self.assignment.roles.get(&player_id).copied()
    }

    /// True once the current round's guess has been resolved
    pub fn round_resolved(&self) -> bool {
        self.last_result
            .as_ref()
            .is_some_and(|result| result.round == self.current_round)
    }
}

/// Outcome of the host advancing a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAdvance {
    NextRound { round: u32 },
    Finished { winner: Option<PlayerId> },
}

/// What changed when a member left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub participant: Participant,
    pub new_host: Option<PlayerId>,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub host_id: PlayerId,
    /// Members in join order
    members: Vec<Participant>,
    pub settings: RoomSettings,
    pub game: GameState,
}

impl Room {
    pub fn new(code: String, mut host: Participant, settings: RoomSettings) -> Self {
        host.is_host = true;
        Self {
            code,
            host_id: host.id,
            members: vec![host],
            game: GameState::new(settings.rounds),
            settings,
        }
    }

    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|p| p.id).collect()
    }

    pub fn member(&self, player_id: PlayerId) -> Option<&Participant> {
        self.members.iter().find(|p| p.id == player_id)
    }

    pub fn is_member(&self, player_id: PlayerId) -> bool {
        self.member(player_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.settings.max_players
    }

    pub fn host(&self) -> Option<&Participant> {
        self.member(self.host_id)
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            host_id: self.host_id,
            players: self.members.iter().map(Participant::info).collect(),
            status: self.game.status,
            current_round: self.game.current_round,
            total_rounds: self.game.total_rounds,
            max_players: self.settings.max_players,
        }
    }

    pub fn add_member(&mut self, participant: Participant) -> SessionResult<()> {
        if self.game.status != GameStatus::Waiting {
            return Err(SessionError::InvalidState("Game already in progress"));
        }
        if self.is_full() {
            return Err(SessionError::RoomFull {
                max: self.settings.max_players,
            });
        }
        if self.members.iter().any(|p| p.name == participant.name) {
            return Err(SessionError::NameTaken(participant.name));
        }

        debug!("Player {} joined room {}", participant.id, self.code);
        self.members.push(Participant {
            is_host: false,
            ..participant
        });
        Ok(())
    }

    pub fn toggle_ready(&mut self, player_id: PlayerId) -> SessionResult<bool> {
        let member = self
            .members
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(SessionError::NotMember)?;
        member.is_ready = !member.is_ready;
        Ok(member.is_ready)
    }

    pub fn start_game<R: Rng + ?Sized>(
        &mut self,
        caller: PlayerId,
        rounds: Option<u32>,
        rng: &mut R,
    ) -> SessionResult<()> {
        if caller != self.host_id {
            return Err(SessionError::NotHost("start the game"));
        }
        if self.game.status != GameStatus::Waiting {
            return Err(SessionError::InvalidState("Game has already started"));
        }
        if self.members.len() < MIN_PLAYERS {
            return Err(SessionError::InsufficientPlayers {
                required: MIN_PLAYERS,
                actual: self.members.len(),
            });
        }
        let total_rounds = match rounds {
            Some(rounds) => validate_rounds(rounds)?,
            None => self.settings.rounds,
        };
        let assignment = self.deal(rng)?;

        self.settings.rounds = total_rounds;
        self.game.status = GameStatus::Playing;
        self.game.current_round = 1;
        self.game.total_rounds = total_rounds;
        self.game.scores = self.members.iter().map(|p| (p.id, 0)).collect();
        self.game.last_result = None;
        self.game.assignment = assignment;

        info!(
            "Room {} started a {}-round game with {} players",
            self.code,
            total_rounds,
            self.members.len()
        );
        Ok(())
    }

    pub fn resolve_guess(
        &mut self,
        caller: PlayerId,
        suspected_id: PlayerId,
    ) -> SessionResult<&RoundResult> {
        if self.game.status != GameStatus::Playing {
            return Err(SessionError::InvalidState("No game in progress"));
        }
        if self.game.assignment.sipahi_id != Some(caller) {
            return Err(SessionError::NotSipahi);
        }
        if self.game.round_resolved() {
            return Err(SessionError::AlreadyGuessed);
        }
        if !self.is_member(suspected_id) {
            return Err(SessionError::PlayerNotFound(suspected_id));
        }

        let result = compute_round_result(
            self.game.current_round,
            &self.member_ids(),
            &self.game.assignment,
            caller,
            suspected_id,
        );
        apply_points(&mut self.game.scores, &result);

        debug!(
            "Room {} round {}: Sipahi {} suspected {} ({})",
            self.code,
            result.round,
            caller,
            suspected_id,
            if result.is_correct { "correct" } else { "wrong" }
        );
        let result = self.game.last_result.insert(result);
        Ok(&*result)
    }

    pub fn advance_round<R: Rng + ?Sized>(
        &mut self,
        caller: PlayerId,
        rng: &mut R,
    ) -> SessionResult<RoundAdvance> {
        if caller != self.host_id {
            return Err(SessionError::NotHost("start the next round"));
        }
        if self.game.status != GameStatus::Playing {
            return Err(SessionError::InvalidState("No game in progress"));
        }

        if self.game.current_round >= self.game.total_rounds {
            self.game.status = GameStatus::Finished;
            self.game.assignment = RoleAssignment::empty();
            let winner = self.winner();
            info!("Room {} finished, winner: {:?}", self.code, winner);
            return Ok(RoundAdvance::Finished { winner });
        }

        let assignment = self.deal(rng)?;
        self.game.current_round += 1;
        self.game.assignment = assignment;
        Ok(RoundAdvance::NextRound {
            round: self.game.current_round,
        })
    }

    /// Deals a round without installing it. Fails if some member would be
    /// left without a role.
    fn deal<R: Rng + ?Sized>(&self, rng: &mut R) -> SessionResult<RoleAssignment> {
        let assignment = assign_roles(&self.member_ids(), rng);
        if assignment.roles.len() != self.members.len() {
            return Err(SessionError::Internal(format!(
                "room {} has {} members but only {} roles",
                self.code,
                self.members.len(),
                assignment.roles.len()
            )));
        }
        Ok(assignment)
    }

    /// Highest cumulative score; ties go to whoever joined first.
    pub fn winner(&self) -> Option<PlayerId> {
        let mut best: Option<(PlayerId, u32)> = None;
        for member in &self.members {
            let score = self.game.scores.get(&member.id).copied().unwrap_or(0);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((member.id, score)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Removes a member, pruning their score and role and handing off the host
    /// role if needed. Returns None if they were not a member.
    pub fn remove_member(&mut self, player_id: PlayerId) -> Option<Departure> {
        let index = self.members.iter().position(|p| p.id == player_id)?;
        let participant = self.members.remove(index);

        self.game.scores.remove(&player_id);
        self.game.assignment.remove(player_id);

        let mut new_host = None;
        if participant.id == self.host_id {
            if let Some(next) = self.members.first_mut() {
                next.is_host = true;
                self.host_id = next.id;
                new_host = Some(next.id);
                info!("Room {}: host passed to player {}", self.code, next.id);
            }
        }

        Some(Departure {
            participant,
            new_host,
        })
    }
}

pub fn validate_name(name: &str) -> SessionResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(SessionError::InvalidName);
    }
    Ok(trimmed.to_string())
}

pub fn validate_avatar(avatar: &str) -> SessionResult<String> {
    if avatar.chars().count() > MAX_AVATAR_LENGTH {
        return Err(SessionError::InvalidAvatar);
    }
    Ok(avatar.to_string())
}

pub fn validate_rounds(rounds: u32) -> SessionResult<u32> {
    if (1..=MAX_ROUNDS).contains(&rounds) {
        Ok(rounds)
    } else {
        Err(SessionError::InvalidRounds(rounds))
    }
}
