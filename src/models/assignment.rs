use super::{event::EventId, participant::ParticipantId, types::UtcDateTime};

/// A validated giver to receiver mapping produced by a draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pairs: Vec<(ParticipantId, ParticipantId)>,
}

impl Assignment {
    /// Zips givers with their receivers positionally.
    pub(crate) fn zip(givers: &[ParticipantId], receivers: &[ParticipantId]) -> Assignment {
        Assignment {
            pairs: givers
                .iter()
                .copied()
                .zip(receivers.iter().copied())
                .collect(),
        }
    }

    pub fn pairs(&self) -> &[(ParticipantId, ParticipantId)] {
        &self.pairs
    }

    pub fn recipient_of(&self, giver: ParticipantId) -> Option<ParticipantId> {
        self.pairs
            .iter()
            .find(|(g, _)| *g == giver)
            .map(|(_, receiver)| *receiver)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssignedPairId(pub u64);

/// A persisted pair together with its gift tracking flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignedPair {
    pub id: AssignedPairId,
    pub event_id: EventId,
    pub giver: ParticipantId,
    pub receiver: ParticipantId,
    pub notified: bool,
    pub gift_sent: bool,
    pub gift_delivered: bool,
    pub gift_confirmed: bool,
    pub created_at: UtcDateTime,
}
