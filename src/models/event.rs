use poise::serenity_prelude::GuildId;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::types::UtcDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// The group an event belongs to. Every Discord guild is a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub u64);

impl From<GuildId> for GroupId {
    fn from(value: GuildId) -> Self {
        GroupId(value.get())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub group: GroupId,
    pub slug: String,
    pub display_name: String,
    pub price_limit: Option<String>,
    pub status: EventStatus,
    pub start_date: Option<UtcDateTime>,
    pub end_date: Option<UtcDateTime>,
    pub created_at: UtcDateTime,
}

impl Event {
    /// Both dates, once the admins have set them.
    pub fn dates(&self) -> Option<(UtcDateTime, UtcDateTime)> {
        Some((self.start_date?, self.end_date?))
    }
}

#[derive(Debug)]
pub struct NewEvent {
    pub group: GroupId,
    pub slug: String,
    pub display_name: String,
    pub price_limit: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventStatus {
    Waiting,
    Active,
    Finished,
    Cancelled,
}

/// Something an admin (or the draw) does to an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum EventAction {
    Draw,
    #[strum(to_string = "re-draw")]
    Redraw,
    #[strum(to_string = "date change")]
    EditDates,
    #[strum(to_string = "exclusion rule change")]
    EditExclusions,
    Cancel,
    Finish,
}

impl EventStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, EventStatus::Finished | EventStatus::Cancelled)
    }

    /// The status after applying `action`, or `None` if the action is not allowed.
    pub fn transition(self, action: EventAction) -> Option<EventStatus> {
        use EventAction::*;
        use EventStatus::*;

        match (self, action) {
            (Waiting, Draw | Redraw) => Some(Active),
            (Active, Redraw) => Some(Active),
            (Waiting | Active, EditDates | EditExclusions) => Some(self),
            (Waiting | Active, Cancel) => Some(Cancelled),
            (Active, Finish) => Some(Finished),
            _ => None,
        }
    }
}
