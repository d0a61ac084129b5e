use std::collections::HashSet;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::{event::EventId, participant::ParticipantId, types::UtcDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExclusionRuleId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RuleKind {
    /// Neither may draw the other.
    Mutual,
    /// Only `user_a` may not draw `user_b`.
    Directional,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExclusionRule {
    pub id: ExclusionRuleId,
    pub event_id: EventId,
    pub user_a: ParticipantId,
    pub user_b: ParticipantId,
    pub kind: RuleKind,
    pub reason: Option<String>,
    pub created_at: UtcDateTime,
}

#[derive(Debug)]
pub struct NewExclusionRule {
    pub event_id: EventId,
    pub user_a: ParticipantId,
    pub user_b: ParticipantId,
    pub kind: RuleKind,
    pub reason: Option<String>,
}

/// Forbidden `(giver, receiver)` pairs of a single draw.
#[derive(Clone, Debug, Default)]
pub struct ExclusionRuleSet {
    forbidden: HashSet<(ParticipantId, ParticipantId)>,
}

impl ExclusionRuleSet {
    pub fn new() -> ExclusionRuleSet {
        ExclusionRuleSet::default()
    }

    pub fn from_rules(rules: &[ExclusionRule]) -> ExclusionRuleSet {
        let mut set = ExclusionRuleSet::new();
        for rule in rules {
            set.insert(rule.user_a, rule.user_b, rule.kind);
        }
        set
    }

    pub fn insert(&mut self, user_a: ParticipantId, user_b: ParticipantId, kind: RuleKind) {
        self.forbidden.insert((user_a, user_b));
        if kind == RuleKind::Mutual {
            self.forbidden.insert((user_b, user_a));
        }
    }

    pub fn forbids(&self, giver: ParticipantId, receiver: ParticipantId) -> bool {
        self.forbidden.contains(&(giver, receiver))
    }
}
