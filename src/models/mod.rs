mod assignment;
mod event;
mod exclusion;
mod participant;
mod reminder;

pub mod types;

pub use assignment::{AssignedPair, AssignedPairId, Assignment};
pub use event::{Event, EventAction, EventId, EventStatus, GroupId, NewEvent};
pub use exclusion::{ExclusionRule, ExclusionRuleId, ExclusionRuleSet, NewExclusionRule, RuleKind};
pub use participant::{Participant, ParticipantId};
pub use reminder::{PlannedReminder, ReminderJob, ReminderJobId, ReminderKind};
