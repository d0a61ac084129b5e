use std::{collections::HashMap, sync::Arc};

use poise::serenity_prelude::{Mentionable, UserId};
use thiserror::Error;
use time::UtcOffset;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::{
    models::{
        types::{DateOutOfRange, UtcDateTime},
        AssignedPair, AssignedPairId, Assignment, Event, EventAction, EventId, EventStatus,
        ExclusionRule, ExclusionRuleSet, GroupId, NewEvent, NewExclusionRule, Participant,
        ParticipantId, PlannedReminder, ReminderJob, RuleKind,
    },
    notifier::{deliver_batch, DeliveryPacing, DeliveryReport, Notifier},
    reminders::{assignment_message, plan_reminders},
    repository::{
        AssignmentRepository, EventRepository, ExclusionRepository, MemberRepository,
        ReminderRepository,
    },
    solver::{draw, DrawError},
};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("No such event")]
    NotFound,
    #[error("An event with slug `{0}` already exists")]
    SlugTaken(String),
    #[error("Cannot do a {action} while the event is {status}")]
    InvalidEventState {
        status: EventStatus,
        action: EventAction,
    },
    #[error("The end date must be after the start date")]
    InvalidDateRange,
    #[error("The event dates are not set yet")]
    DatesNotSet,
    #[error(transparent)]
    DateOutOfRange(#[from] DateOutOfRange),
    #[error("This exclusion rule already exists")]
    DuplicateExclusionRule,
    #[error("A participant cannot be excluded from themselves")]
    SelfExclusion,
    #[error("{} has not joined the Secret Santa", .0.mention())]
    NotAMember(UserId),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// Only allowed before the first successful draw.
    Fresh,
    /// Throws away the current assignment of an active event.
    Redraw,
}

impl From<DrawMode> for EventAction {
    fn from(value: DrawMode) -> Self {
        match value {
            DrawMode::Fresh => EventAction::Draw,
            DrawMode::Redraw => EventAction::Redraw,
        }
    }
}

#[derive(Debug)]
pub struct EventOverview {
    pub event: Event,
    pub member_count: usize,
    pub rule_count: usize,
    pub pairs: Vec<AssignedPair>,
    pub reminders: Vec<ReminderJob>,
}

#[derive(Debug)]
pub struct DrawOutcome {
    pub assignment: Assignment,
    pub reminders: Vec<PlannedReminder>,
    pub announcement: DeliveryReport,
}

/// Owns every state change of an event. Changes to one event are serialized.
pub struct EventService {
    event_repository: Arc<EventRepository>,
    member_repository: Arc<MemberRepository>,
    exclusion_repository: Arc<ExclusionRepository>,
    assignment_repository: Arc<AssignmentRepository>,
    reminder_repository: Arc<ReminderRepository>,
    notifier: Arc<dyn Notifier>,
    zone: UtcOffset,
    pacing: DeliveryPacing,
    event_locks: Mutex<HashMap<EventId, Arc<Mutex<()>>>>,
}

impl EventService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_repository: Arc<EventRepository>,
        member_repository: Arc<MemberRepository>,
        exclusion_repository: Arc<ExclusionRepository>,
        assignment_repository: Arc<AssignmentRepository>,
        reminder_repository: Arc<ReminderRepository>,
        notifier: Arc<dyn Notifier>,
        zone: UtcOffset,
        pacing: DeliveryPacing,
    ) -> EventService {
        EventService {
            event_repository,
            member_repository,
            exclusion_repository,
            assignment_repository,
            reminder_repository,
            notifier,
            zone,
            pacing,
            event_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn zone(&self) -> UtcOffset {
        self.zone
    }

    async fn lock_event(&self, id: EventId) -> OwnedMutexGuard<()> {
        let lock = self.event_locks.lock().await.entry(id).or_default().clone();

        lock.lock_owned().await
    }

    async fn load_event(&self, id: EventId) -> Result<Event, EventError> {
        self.event_repository
            .get_event(id)
            .await?
            .ok_or(EventError::NotFound)
    }

    fn check_action(event: &Event, action: EventAction) -> Result<EventStatus, EventError> {
        event
            .status
            .transition(action)
            .ok_or(EventError::InvalidEventState {
                status: event.status,
                action,
            })
    }

    async fn require_member(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Participant, EventError> {
        self.member_repository
            .find_member(group, user)
            .await?
            .ok_or(EventError::NotAMember(user))
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_event(
        &self,
        group: GroupId,
        slug: &str,
        display_name: &str,
        price_limit: Option<String>,
    ) -> Result<Event, EventError> {
        if self
            .event_repository
            .find_event_by_slug(group, slug)
            .await?
            .is_some()
        {
            return Err(EventError::SlugTaken(slug.to_string()));
        }

        let event = self
            .event_repository
            .create_event(&NewEvent {
                group,
                slug: slug.to_string(),
                display_name: display_name.to_string(),
                price_limit,
            })
            .await?;

        info!("Created event {} ({:?})", event.slug, event.id);

        Ok(event)
    }

    pub async fn find_event(&self, group: GroupId, slug: &str) -> Result<Event, EventError> {
        self.event_repository
            .find_event_by_slug(group, slug)
            .await?
            .ok_or(EventError::NotFound)
    }

    pub async fn list_events(&self, group: GroupId) -> Result<Vec<Event>, EventError> {
        Ok(self.event_repository.list_group_events(group).await?)
    }

    pub async fn overview(&self, id: EventId) -> Result<EventOverview, EventError> {
        let event = self.load_event(id).await?;

        let member_count = self
            .member_repository
            .list_group_members(event.group)
            .await?
            .len();
        let rule_count = self.exclusion_repository.list_rules(id).await?.len();
        let pairs = self.assignment_repository.list_pairs(id).await?;
        let reminders = self.reminder_repository.list_event_jobs(id).await?;

        Ok(EventOverview {
            event,
            member_count,
            rule_count,
            pairs,
            reminders,
        })
    }

    /// Sets the event dates. An active event gets its reminder jobs replaced
    /// together with the dates; the returned reminders are the ones now scheduled.
    #[tracing::instrument(skip(self))]
    pub async fn set_dates(
        &self,
        id: EventId,
        start: UtcDateTime,
        end: UtcDateTime,
    ) -> Result<Vec<PlannedReminder>, EventError> {
        let _guard = self.lock_event(id).await;
        let event = self.load_event(id).await?;

        Self::check_action(&event, EventAction::EditDates)?;

        if end <= start {
            return Err(EventError::InvalidDateRange);
        }

        let reminders = plan_reminders(start, end, self.zone, UtcDateTime::now())?;

        if event.status != EventStatus::Active {
            self.event_repository
                .update_dates(id, start, end, None)
                .await?;
            return Ok(Vec::new());
        }

        self.event_repository
            .update_dates(id, start, end, Some(&reminders))
            .await?;
        self.reminder_repository.notify_updated();

        Ok(reminders)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_exclusion_rule(
        &self,
        id: EventId,
        user_a: UserId,
        user_b: UserId,
        kind: RuleKind,
        reason: Option<String>,
    ) -> Result<ExclusionRule, EventError> {
        if user_a == user_b {
            return Err(EventError::SelfExclusion);
        }

        let _guard = self.lock_event(id).await;
        let event = self.load_event(id).await?;

        Self::check_action(&event, EventAction::EditExclusions)?;

        let member_a = self.require_member(event.group, user_a).await?;
        let member_b = self.require_member(event.group, user_b).await?;

        if self
            .exclusion_repository
            .find_rule(id, member_a.id, member_b.id)
            .await?
            .is_some()
        {
            return Err(EventError::DuplicateExclusionRule);
        }

        let rule = self
            .exclusion_repository
            .add_rule(&NewExclusionRule {
                event_id: id,
                user_a: member_a.id,
                user_b: member_b.id,
                kind,
                reason,
            })
            .await?;

        Ok(rule)
    }

    pub async fn list_exclusion_rules(
        &self,
        id: EventId,
    ) -> Result<Vec<ExclusionRule>, EventError> {
        Ok(self.exclusion_repository.list_rules(id).await?)
    }

    /// Draws the event, persists the assignment together with the status change
    /// and the reminder jobs, then tells every giver who they are buying for.
    ///
    /// Any failure before the commit leaves the event exactly as it was.
    #[tracing::instrument(skip(self))]
    pub async fn draw(&self, id: EventId, mode: DrawMode) -> Result<DrawOutcome, EventError> {
        let guard = self.lock_event(id).await;
        let event = self.load_event(id).await?;

        Self::check_action(&event, mode.into())?;

        let (start, end) = event.dates().ok_or(EventError::DatesNotSet)?;

        let members = self
            .member_repository
            .list_group_members(event.group)
            .await?;
        let rules = self.exclusion_repository.list_rules(id).await?;

        let participant_ids: Vec<_> = members.iter().map(|member| member.id).collect();
        let rule_set = ExclusionRuleSet::from_rules(&rules);

        let assignment = {
            let mut rng = rand::thread_rng();
            draw(&participant_ids, &rule_set, &mut rng)?
        };

        let reminders = plan_reminders(start, end, self.zone, UtcDateTime::now())?;

        let pair_ids = self
            .assignment_repository
            .commit_draw(id, event.status, &assignment, &reminders)
            .await?;
        self.reminder_repository.notify_updated();

        drop(guard);

        info!(
            "Drew {} pairs for event {} with {} reminders",
            assignment.len(),
            event.slug,
            reminders.len()
        );

        let announcement = self
            .announce(&event, &members, &assignment, &pair_ids)
            .await;

        Ok(DrawOutcome {
            assignment,
            reminders,
            announcement,
        })
    }

    async fn announce(
        &self,
        event: &Event,
        members: &[Participant],
        assignment: &Assignment,
        pair_ids: &HashMap<ParticipantId, AssignedPairId>,
    ) -> DeliveryReport {
        let messages: Vec<_> = {
            let by_id: HashMap<ParticipantId, &Participant> =
                members.iter().map(|member| (member.id, member)).collect();

            assignment
                .pairs()
                .iter()
                .filter_map(|(giver, receiver)| {
                    let giver = by_id.get(giver)?;
                    let receiver = by_id.get(receiver)?;
                    let message = assignment_message(
                        event,
                        &receiver.handle.mention().to_string(),
                        self.zone,
                    );
                    Some(((*giver).clone(), message))
                })
                .collect()
        };

        let report = deliver_batch(self.notifier.as_ref(), messages, self.pacing).await;

        let notified_pairs: Vec<_> = report
            .delivered
            .iter()
            .filter_map(|giver| pair_ids.get(giver).copied())
            .collect();

        if let Err(err) = self
            .assignment_repository
            .mark_notified(&notified_pairs)
            .await
        {
            warn!(
                "Could not mark givers of event {} as notified: {err}",
                event.slug
            );
        }

        report
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: EventId) -> Result<Event, EventError> {
        self.change_status(id, EventAction::Cancel).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn finish(&self, id: EventId) -> Result<Event, EventError> {
        self.change_status(id, EventAction::Finish).await
    }

    async fn change_status(&self, id: EventId, action: EventAction) -> Result<Event, EventError> {
        let _guard = self.lock_event(id).await;
        let mut event = self.load_event(id).await?;

        let status = Self::check_action(&event, action)?;

        self.event_repository
            .update_status(id, event.status, status)
            .await?;
        self.reminder_repository.notify_updated();

        info!("Event {} is now {status}", event.slug);

        event.status = status;
        Ok(event)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&self, id: EventId) -> Result<(), EventError> {
        let guard = self.lock_event(id).await;

        if !self.event_repository.delete_event(id).await? {
            return Err(EventError::NotFound);
        }
        self.reminder_repository.notify_updated();

        drop(guard);
        self.event_locks.lock().await.remove(&id);

        Ok(())
    }

    /// The member `user` is buying a gift for in this event, if drawn.
    pub async fn recipient_of(
        &self,
        id: EventId,
        user: UserId,
    ) -> Result<Option<Participant>, EventError> {
        let event = self.load_event(id).await?;
        let giver = self.require_member(event.group, user).await?;

        let Some(receiver) = self
            .assignment_repository
            .find_recipient(id, giver.id)
            .await?
        else {
            return Ok(None);
        };

        Ok(self.member_repository.get_member(receiver).await?)
    }
}
