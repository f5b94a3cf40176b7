//! Process-wide room registry
//!
//! Owns every live room keyed by its code, plus an index from participant
//! to the room they belong to. A participant is in at most one room, and a
//! room is dropped from the registry the moment its last member leaves.

use crate::error::{SessionError, SessionResult};
use crate::room::{Departure, Participant, Room, RoomSettings};
use log::info;
use rand::Rng;
use shared::{PlayerId, ROOM_CODE_LENGTH};
use std::collections::HashMap;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Result of removing a participant from their room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub room_code: String,
    pub departure: Departure,
    pub room_deleted: bool,
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    memberships: HashMap<PlayerId, String>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room with `host` as its only member.
    ///
    /// The code is sampled and inserted within this call, so no other
    /// creation can observe the same code as free.
    pub fn create_room<R: Rng + ?Sized>(
        &mut self,
        host: Participant,
        settings: RoomSettings,
        rng: &mut R,
    ) -> SessionResult<&Room> {
        if let Some(code) = self.memberships.get(&host.id) {
            return Err(SessionError::AlreadyInRoom(code.clone()));
        }

        let code = self.generate_unique_code(rng);
        let host_id = host.id;
        let room = Room::new(code.clone(), host, settings);

        info!("Room {} created by player {}", code, host_id);
        self.memberships.insert(host_id, code.clone());
        Ok(&*self.rooms.entry(code).or_insert(room))
    }

    pub fn join_room(&mut self, code: &str, participant: Participant) -> SessionResult<&Room> {
        if let Some(current) = self.memberships.get(&participant.id) {
            return Err(SessionError::AlreadyInRoom(current.clone()));
        }

        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| SessionError::RoomNotFound(code.to_string()))?;

        let player_id = participant.id;
        room.add_member(participant)?;
        self.memberships.insert(player_id, room.code.clone());
        Ok(&*room)
    }

    pub fn find_room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn find_room_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Code of the room the participant currently belongs to
    pub fn room_of(&self, player_id: PlayerId) -> Option<&str> {
        self.memberships.get(&player_id).map(String::as_str)
    }

    /// Removes the participant from whatever room they are in.
    /// Returns None for participants that are not in any room.
    pub fn leave(&mut self, player_id: PlayerId) -> Option<LeaveOutcome> {
        let room_code = self.memberships.remove(&player_id)?;
        let room = self.rooms.get_mut(&room_code)?;
        let departure = room.remove_member(player_id)?;

        let room_deleted = room.is_empty();
        if room_deleted {
            self.delete_room(&room_code);
        }

        Some(LeaveOutcome {
            room_code,
            departure,
            room_deleted,
        })
    }

    /// Removes a room and its membership entries. Unknown codes are ignored.
    pub fn delete_room(&mut self, code: &str) -> Option<Room> {
        let room = self.rooms.remove(code)?;
        for id in room.member_ids() {
            self.memberships.remove(&id);
        }
        info!("Room {} deleted", code);
        Some(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.rooms.values().map(Room::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn generate_unique_code<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        loop {
            let code = generate_room_code(rng);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}
