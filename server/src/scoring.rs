//! Round result computation.
//!
//! Raja and Mantri always collect their base value. A correct guess leaves
//! Sipahi and Chor with their own base values; a wrong guess swaps them, so
//! the Sipahi walks away with nothing and the Chor takes the Sipahi's 700.

use crate::roles::RoleAssignment;
use shared::{PlayerId, Role, RoundResult};
use std::collections::HashMap;

pub fn compute_round_result(
    round: u32,
    members: &[PlayerId],
    assignment: &RoleAssignment,
    sipahi_id: PlayerId,
    suspected_id: PlayerId,
) -> RoundResult {
    let chor_id = assignment.chor_id;
    let is_correct = chor_id == Some(suspected_id);

    let mut points: HashMap<PlayerId, u32> = members.iter().map(|id| (*id, 0)).collect();

    for id in members {
        if let Some(role @ (Role::Raja | Role::Mantri)) = assignment.roles.get(id) {
            points.insert(*id, role.points());
        }
    }

    let (sipahi_points, chor_points) = if is_correct {
        (Role::Sipahi.points(), Role::Chor.points())
    } else {
        (Role::Chor.points(), Role::Sipahi.points())
    };

    points.insert(sipahi_id, sipahi_points);
    if let Some(chor_id) = chor_id {
        points.insert(chor_id, chor_points);
    }

    RoundResult {
        round,
        sipahi_id,
        chor_id,
        suspected_id,
        is_correct,
        points,
    }
}

/// Adds a round's points onto the running totals.
pub fn apply_points(scores: &mut HashMap<PlayerId, u32>, result: &RoundResult) {
    for (id, points) in &result.points {
        *scores.entry(*id).or_insert(0) += points;
    }
}
