//! Errors raised while validating and applying client actions.

use shared::{ErrorKind, PlayerId, MAX_AVATAR_LENGTH, MAX_NAME_LENGTH, MAX_ROUNDS};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Room {0} not found")]
    RoomNotFound(String),
    #[error("Player {0} is not in this room")]
    PlayerNotFound(PlayerId),
    #[error("You are not a member of this room")]
    NotMember,
    #[error("Only the host can {0}")]
    NotHost(&'static str),
    #[error("Only the Sipahi can make a guess")]
    NotSipahi,
    #[error("Room is full ({max} players max)")]
    RoomFull { max: usize },
    #[error("Name {0:?} is already taken in this room")]
    NameTaken(String),
    #[error("Already in room {0}")]
    AlreadyInRoom(String),
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("A guess was already made this round")]
    AlreadyGuessed,
    #[error("Need at least {required} players to start (have {actual})")]
    InsufficientPlayers { required: usize, actual: usize },
    #[error("Name must be 1-{} characters", MAX_NAME_LENGTH)]
    InvalidName,
    #[error("Avatar must be at most {} characters", MAX_AVATAR_LENGTH)]
    InvalidAvatar,
    #[error("Rounds must be between 1 and {}", MAX_ROUNDS)]
    InvalidRounds(u32),
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::RoomNotFound(_) | SessionError::PlayerNotFound(_) => ErrorKind::NotFound,
            SessionError::NotMember | SessionError::NotHost(_) | SessionError::NotSipahi => {
                ErrorKind::Unauthorized
            }
            SessionError::RoomFull { .. } => ErrorKind::Capacity,
            SessionError::NameTaken(_) => ErrorKind::Conflict,
            SessionError::AlreadyInRoom(_)
            | SessionError::InvalidState(_)
            | SessionError::AlreadyGuessed => ErrorKind::InvalidState,
            SessionError::InsufficientPlayers { .. } => ErrorKind::InsufficientPlayers,
            SessionError::InvalidName
            | SessionError::InvalidAvatar
            | SessionError::InvalidRounds(_) => ErrorKind::InvalidInput,
            SessionError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
