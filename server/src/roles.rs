//! Per-round secret role assignment

use rand::Rng;
use shared::{PlayerId, Role};
use std::collections::HashMap;

/// Roles in the order they are handed out when a room has fewer than four
/// members. Sipahi and Chor come first so every round has a guesser and a target.
pub const ROLE_PRIORITY: [Role; 4] = [Role::Sipahi, Role::Chor, Role::Raja, Role::Mantri];

/// Result of dealing roles for one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub roles: HashMap<PlayerId, Role>,
    pub sipahi_id: Option<PlayerId>,
    pub chor_id: Option<PlayerId>,
}

impl RoleAssignment {
    pub fn empty() -> Self {
        Self {
            roles: HashMap::new(),
            sipahi_id: None,
            chor_id: None,
        }
    }

    pub fn holder_of(&self, role: Role) -> Option<PlayerId> {
        self.roles
            .iter()
            .find(|(_, r)| **r == role)
            .map(|(id, _)| *id)
    }

    /// Drops a departed member and clears the cached Sipahi/Chor pointers if they left.
    pub fn remove(&mut self, player_id: PlayerId) {
        self.roles.remove(&player_id);
        if self.sipahi_id == Some(player_id) {
            self.sipahi_id = None;
        }
        if self.chor_id == Some(player_id) {
            self.chor_id = None;
        }
    }
}

/// Fisher-Yates: walk i from the end down to 1, swap with a uniform j in [0, i].
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Deals one role to each member, in member order.
///
/// At most four members receive a role. With fewer than four members the
/// lowest-priority roles (Mantri, then Raja) are left out of the deal.
pub fn assign_roles<R: Rng + ?Sized>(members: &[PlayerId], rng: &mut R) -> RoleAssignment {
    let count = members.len().min(ROLE_PRIORITY.len());
    let mut deck: Vec<Role> = ROLE_PRIORITY[..count].to_vec();
    shuffle(&mut deck, rng);

    let roles: HashMap<PlayerId, Role> = members.iter().copied().zip(deck).collect();

    let mut assignment = RoleAssignment {
        roles,
        sipahi_id: None,
        chor_id: None,
    };
    assignment.sipahi_id = assignment.holder_of(Role::Sipahi);
    assignment.chor_id = assignment.holder_of(Role::Chor);
    assignment
}
