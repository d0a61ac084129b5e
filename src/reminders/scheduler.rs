use std::sync::Arc;

use time::{Duration, OffsetDateTime, UtcOffset};
use tokio::{
    select,
    sync::{broadcast::error::RecvError, Notify},
    task::JoinHandle,
};
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    models::{types::UtcDateTime, ReminderJob, ReminderKind},
    notifier::{deliver_batch, DeliveryPacing, Notifier},
    repository::{EventRepository, MemberRepository, ReminderRepository, ReminderStorageEvent},
};

use super::reminder_message;

const DEFAULT_SLEEP_DURATION: Duration = Duration::seconds(60 * 60 /* One hour */);
const MISSED_REMINDER_THRESHOLD: Duration = Duration::seconds(60 * 60 /* One hour */);

/// Fires persisted reminder jobs when their time comes.
pub struct ReminderService {
    event_repository: Arc<EventRepository>,
    member_repository: Arc<MemberRepository>,
    reminder_repository: Arc<ReminderRepository>,
    notifier: Arc<dyn Notifier>,
    zone: UtcOffset,
    pacing: DeliveryPacing,
}

impl ReminderService {
    pub fn new(
        event_repository: Arc<EventRepository>,
        member_repository: Arc<MemberRepository>,
        reminder_repository: Arc<ReminderRepository>,
        notifier: Arc<dyn Notifier>,
        zone: UtcOffset,
        pacing: DeliveryPacing,
    ) -> ReminderService {
        ReminderService {
            event_repository,
            member_repository,
            reminder_repository,
            notifier,
            zone,
            pacing,
        }
    }

    pub fn start(self: Arc<Self>, shutdown: Arc<Notify>) -> JoinHandle<()> {
        tokio::spawn(
            async move {
                let mut next_fire_time = Some(OffsetDateTime::now_utc());

                let mut job_events = self.reminder_repository.subscribe();

                let shutdown_signal = shutdown.notified();
                tokio::pin!(shutdown_signal);

                loop {
                    let sleep_duration = {
                        let duration = next_fire_time
                            .map(|time| {
                                Duration::max(Duration::ZERO, time - OffsetDateTime::now_utc())
                            })
                            .unwrap_or(DEFAULT_SLEEP_DURATION)
                            .min(DEFAULT_SLEEP_DURATION);

                        std::time::Duration::from_millis(duration.whole_milliseconds() as _)
                    };

                    info!(
                        "Next reminder check scheduled at {:?} (in {:?})",
                        OffsetDateTime::now_utc() + sleep_duration,
                        sleep_duration
                    );

                    select! {
                        _ = &mut shutdown_signal => {
                            info!("Reminder service is shutting down");
                            break;
                        }

                        _ = tokio::time::sleep(sleep_duration) => {
                            if let Err(err) = self.fire_due_jobs(UtcDateTime::now()).await {
                                error!("Could not fire due reminders: {err}");
                            }

                            next_fire_time = self.reschedule().await;
                        }

                        evt = job_events.recv() => {
                            match evt {
                                Ok(ReminderStorageEvent::JobsUpdated) | Err(RecvError::Lagged(_)) => {
                                    next_fire_time = self.reschedule().await;
                                }
                                Err(RecvError::Closed) => {
                                    error!("Reminder job events channel closed");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            .instrument(info_span!("reminder_loop")),
        )
    }

    /// Claims every due job and fires the claimed ones, each in its own task.
    ///
    /// A job that was replaced or already fired cannot be claimed and is skipped.
    #[tracing::instrument(skip(self))]
    pub async fn fire_due_jobs(
        self: &Arc<Self>,
        now: UtcDateTime,
    ) -> Result<Vec<JoinHandle<()>>, anyhow::Error> {
        let due_jobs = self.reminder_repository.get_due_jobs(now).await?;
        let mut handles = Vec::with_capacity(due_jobs.len());

        for job in due_jobs {
            if !self.reminder_repository.claim_job(job.id, now).await? {
                info!("Reminder job {:?} is no longer current, skipping", job.id);
                continue;
            }

            let late_period = now - job.fire_at;
            if job.kind != ReminderKind::FinalReminder && late_period > MISSED_REMINDER_THRESHOLD {
                warn!(
                    "Reminder {} of event {:?} was missed by {late_period}, not sending it",
                    job.kind, job.event_id
                );
                continue;
            }

            let service = self.clone();
            handles.push(tokio::spawn(
                async move { service.fire_job(job).await }.instrument(info_span!("reminder_job")),
            ));
        }

        Ok(handles)
    }

    async fn fire_job(&self, job: ReminderJob) {
        let event = match self.event_repository.get_event(job.event_id).await {
            Ok(Some(event)) if event.status.is_terminal() => {
                info!(
                    "Event {} is {}, dropping {}",
                    event.slug, event.status, job.kind
                );
                return;
            }
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!("Event {:?} of reminder {} is gone", job.event_id, job.kind);
                return;
            }
            Err(err) => {
                error!(
                    "Could not load event {:?} for reminder {}: {err}",
                    job.event_id, job.kind
                );
                return;
            }
        };

        // Membership is read now, not when the job was scheduled.
        let members = match self.member_repository.list_group_members(event.group).await {
            Ok(members) => members,
            Err(err) => {
                error!("Could not list members of event {:?}: {err}", event.id);
                return;
            }
        };

        let message = reminder_message(job.kind, &event, self.zone);
        let report = deliver_batch(
            self.notifier.as_ref(),
            members.into_iter().map(|member| (member, message.clone())),
            self.pacing,
        )
        .await;

        info!(
            "Sent {} for event {} to {} members ({} failed)",
            job.kind,
            event.slug,
            report.delivered.len(),
            report.failed.len()
        );
    }

    async fn reschedule(&self) -> Option<OffsetDateTime> {
        match self.reminder_repository.get_closest_pending_fire_at().await {
            Ok(time) => time.map(OffsetDateTime::from),
            Err(err) => {
                error!("Could not reschedule reminders: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration as StdDuration};

    use poise::serenity_prelude::UserId;
    use time::{Duration, UtcOffset};

    use crate::{
        models::{types::UtcDateTime, GroupId, NewEvent, PlannedReminder, ReminderKind},
        notifier::{testing::RecordingNotifier, DeliveryPacing},
        repository::{test_pool, EventRepository, MemberRepository, ReminderRepository},
    };

    use super::ReminderService;

    struct Fixture {
        service: Arc<ReminderService>,
        notifier: Arc<RecordingNotifier>,
        events: Arc<EventRepository>,
        members: Arc<MemberRepository>,
        reminders: Arc<ReminderRepository>,
    }

    async fn fixture(notifier: RecordingNotifier) -> Fixture {
        let pool = test_pool().await;
        let events = Arc::new(EventRepository::new(pool.clone()));
        let members = Arc::new(MemberRepository::new(pool.clone()));
        let reminders = Arc::new(ReminderRepository::new(pool));
        let notifier = Arc::new(notifier);

        let service = Arc::new(ReminderService::new(
            events.clone(),
            members.clone(),
            reminders.clone(),
            notifier.clone(),
            UtcOffset::UTC,
            DeliveryPacing {
                delay: StdDuration::ZERO,
                timeout: StdDuration::from_millis(50),
            },
        ));

        Fixture {
            service,
            notifier,
            events,
            members,
            reminders,
        }
    }

    async fn event_with_members(fixture: &Fixture, users: &[u64]) -> crate::models::Event {
        let event = fixture
            .events
            .create_event(&NewEvent {
                group: GroupId(1),
                slug: "Office".to_string(),
                display_name: "Office".to_string(),
                price_limit: None,
            })
            .await
            .unwrap();
        let start = UtcDateTime::now() - Duration::days(5);
        fixture
            .events
            .update_dates(event.id, start, start + Duration::days(10), None)
            .await
            .unwrap();
        for user in users {
            fixture
                .members
                .join(GroupId(1), UserId::new(*user))
                .await
                .unwrap();
        }
        event
    }

    async fn fire(fixture: &Fixture, now: UtcDateTime) -> usize {
        let handles = fixture.service.fire_due_jobs(now).await.unwrap();
        let count = handles.len();
        for handle in handles {
            handle.await.unwrap();
        }
        count
    }

    #[test_log::test(tokio::test)]
    async fn due_job_fires_once_for_every_member() {
        let fixture = fixture(RecordingNotifier::default()).await;
        let event = event_with_members(&fixture, &[1, 2, 3]).await;
        fixture
            .reminders
            .replace_jobs(
                event.id,
                &[PlannedReminder {
                    kind: ReminderKind::WeekReminder,
                    fire_at: UtcDateTime::now() - Duration::minutes(1),
                }],
            )
            .await
            .unwrap();

        assert_eq!(fire(&fixture, UtcDateTime::now()).await, 1);
        assert_eq!(fire(&fixture, UtcDateTime::now()).await, 0);

        let recipients: Vec<_> = fixture
            .notifier
            .sent()
            .into_iter()
            .map(|(to, _)| to.get())
            .collect();
        assert_eq!(recipients, vec![1, 2, 3]);
    }

    #[test_log::test(tokio::test)]
    async fn unreachable_member_is_skipped_and_job_stays_fired() {
        let fixture = fixture(RecordingNotifier {
            unreachable: [UserId::new(2)].into_iter().collect(),
            ..Default::default()
        })
        .await;
        let event = event_with_members(&fixture, &[1, 2, 3]).await;
        fixture
            .reminders
            .replace_jobs(
                event.id,
                &[PlannedReminder {
                    kind: ReminderKind::FinalReminder,
                    fire_at: UtcDateTime::now() - Duration::minutes(1),
                }],
            )
            .await
            .unwrap();

        assert_eq!(fire(&fixture, UtcDateTime::now()).await, 1);

        let recipients: Vec<_> = fixture
            .notifier
            .sent()
            .into_iter()
            .map(|(to, _)| to.get())
            .collect();
        assert_eq!(recipients, vec![1, 3]);
        let jobs = fixture.reminders.list_event_jobs(event.id).await.unwrap();
        assert!(jobs[0].fired_at.is_some());
    }

    #[test_log::test(tokio::test)]
    async fn members_are_read_at_fire_time() {
        let fixture = fixture(RecordingNotifier::default()).await;
        let event = event_with_members(&fixture, &[1, 2, 3]).await;
        fixture
            .reminders
            .replace_jobs(
                event.id,
                &[PlannedReminder {
                    kind: ReminderKind::FinalReminder,
                    fire_at: UtcDateTime::now() - Duration::minutes(1),
                }],
            )
            .await
            .unwrap();

        fixture
            .members
            .leave(GroupId(1), UserId::new(1))
            .await
            .unwrap();
        fixture
            .members
            .join(GroupId(1), UserId::new(4))
            .await
            .unwrap();
        fire(&fixture, UtcDateTime::now()).await;

        let recipients: Vec<_> = fixture
            .notifier
            .sent()
            .into_iter()
            .map(|(to, _)| to.get())
            .collect();
        assert_eq!(recipients, vec![2, 3, 4]);
    }

    #[test_log::test(tokio::test)]
    async fn late_reminders_are_dropped_but_final_is_sent() {
        let fixture = fixture(RecordingNotifier::default()).await;
        let event = event_with_members(&fixture, &[1]).await;
        let long_ago = UtcDateTime::now() - Duration::days(2);
        fixture
            .reminders
            .replace_jobs(
                event.id,
                &[
                    PlannedReminder {
                        kind: ReminderKind::StartReminder,
                        fire_at: long_ago,
                    },
                    PlannedReminder {
                        kind: ReminderKind::FinalReminder,
                        fire_at: long_ago,
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(fire(&fixture, UtcDateTime::now()).await, 1);
        assert_eq!(fixture.notifier.sent().len(), 1);
        assert!(fixture.notifier.sent()[0].1.contains("Last day"));
        assert!(fixture
            .reminders
            .get_due_jobs(UtcDateTime::now())
            .await
            .unwrap()
            .is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn future_jobs_are_left_alone() {
        let fixture = fixture(RecordingNotifier::default()).await;
        let event = event_with_members(&fixture, &[1]).await;
        fixture
            .reminders
            .replace_jobs(
                event.id,
                &[PlannedReminder {
                    kind: ReminderKind::FinalReminder,
                    fire_at: UtcDateTime::now() + Duration::days(1),
                }],
            )
            .await
            .unwrap();

        assert_eq!(fire(&fixture, UtcDateTime::now()).await, 0);
        assert!(fixture.notifier.sent().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn loop_fires_pending_job_and_stops_on_shutdown() {
        let fixture = fixture(RecordingNotifier::default()).await;
        let event = event_with_members(&fixture, &[7]).await;
        let shutdown = Arc::new(tokio::sync::Notify::new());
        let handle = fixture.service.clone().start(shutdown.clone());

        fixture
            .reminders
            .replace_jobs(
                event.id,
                &[PlannedReminder {
                    kind: ReminderKind::FinalReminder,
                    fire_at: UtcDateTime::now(),
                }],
            )
            .await
            .unwrap();

        for _ in 0..100 {
            if !fixture.notifier.sent().is_empty() {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
        assert_eq!(fixture.notifier.sent().len(), 1);

        shutdown.notify_waiters();
        tokio::time::timeout(StdDuration::from_secs(2), handle)
            .await
            .expect("Loop should stop")
            .unwrap();
    }
}
