use poise::serenity_prelude::UserId;

use super::{event::GroupId, types::UtcDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u64);

/// A member of a group. The handle is where their DMs go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub group: GroupId,
    pub handle: UserId,
    pub joined_at: UtcDateTime,
}
