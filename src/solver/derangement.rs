use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Assignment, ExclusionRuleSet, ParticipantId};

/// How many shuffled candidates are tried before falling back to the repair pass.
pub const MAX_ATTEMPTS: usize = 100;

/// With two participants the only derangement is a swap, which a single
/// mutual rule already forbids.
pub const MIN_PARTICIPANTS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("At least {MIN_PARTICIPANTS} participants are required, got {count}")]
    InsufficientParticipants { count: usize },
    #[error("Participant {0:?} is listed more than once")]
    DuplicateParticipant(ParticipantId),
    #[error("Could not satisfy the exclusion rules after {attempts} attempts")]
    ExclusionUnsatisfiable { attempts: usize },
}

/// Assigns every participant a receiver so that nobody draws themselves and no
/// exclusion rule is broken.
///
/// The participant list is never reordered: candidate `i` is the receiver of
/// `participants[i]`. The first valid shuffle wins. If none of them is valid,
/// the last one gets its self-gifts swapped away and is checked once more.
pub fn draw<R: Rng + ?Sized>(
    participants: &[ParticipantId],
    rules: &ExclusionRuleSet,
    rng: &mut R,
) -> Result<Assignment, DrawError> {
    if participants.len() < MIN_PARTICIPANTS {
        return Err(DrawError::InsufficientParticipants {
            count: participants.len(),
        });
    }

    let mut seen = HashSet::with_capacity(participants.len());
    if let Some(duplicate) = participants.iter().find(|&&p| !seen.insert(p)) {
        return Err(DrawError::DuplicateParticipant(*duplicate));
    }

    // Shuffled on every attempt, the participant list itself stays put.
    let mut candidate = participants.to_vec();
    for attempt in 1..=MAX_ATTEMPTS {
        candidate.shuffle(rng);

        if is_valid(participants, &candidate, rules) {
            debug!("Found a valid assignment on attempt {attempt}");
            return Ok(Assignment::zip(participants, &candidate));
        }
    }

    repair_self_gifts(participants, &mut candidate);
    if is_valid(participants, &candidate, rules) {
        debug!("Repaired the last candidate after {MAX_ATTEMPTS} attempts");
        return Ok(Assignment::zip(participants, &candidate));
    }

    warn!(
        "No valid assignment for {} participants after {MAX_ATTEMPTS} attempts",
        participants.len()
    );
    Err(DrawError::ExclusionUnsatisfiable {
        attempts: MAX_ATTEMPTS,
    })
}

fn is_valid(
    participants: &[ParticipantId],
    candidate: &[ParticipantId],
    rules: &ExclusionRuleSet,
) -> bool {
    participants
        .iter()
        .zip(candidate)
        .all(|(&giver, &receiver)| giver != receiver && !rules.forbids(giver, receiver))
}

/// One left-to-right pass: a self-gift at `i` trades receivers with `i + 1`
/// (wrapping). Exclusion rules are not considered here.
fn repair_self_gifts(participants: &[ParticipantId], candidate: &mut [ParticipantId]) {
    let n = candidate.len();
    for i in 0..n {
        if participants[i] == candidate[i] {
            candidate.swap(i, (i + 1) % n);
        }
    }
}
