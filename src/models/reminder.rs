use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::{event::EventId, types::UtcDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReminderJobId(pub u64);

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ReminderKind {
    /// The day before the exchange starts.
    StartReminder,
    /// A week before the exchange ends.
    WeekReminder,
    /// The morning of the last day.
    FinalReminder,
}

/// A reminder that has not been persisted yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedReminder {
    pub kind: ReminderKind,
    pub fire_at: UtcDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderJob {
    pub id: ReminderJobId,
    pub event_id: EventId,
    pub kind: ReminderKind,
    pub fire_at: UtcDateTime,
    pub fired_at: Option<UtcDateTime>,
}
