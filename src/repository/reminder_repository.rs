use sqlx::{query, query_as, query_scalar, FromRow, Pool, Sqlite, SqliteConnection};
use tokio::sync::broadcast::{Receiver, Sender};

use crate::models::{
    types::UtcDateTime, EventId, PlannedReminder, ReminderJob, ReminderJobId, ReminderKind,
};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

#[derive(Debug)]
pub struct ReminderRepository {
    pool: Pool<Sqlite>,
    events: Sender<ReminderStorageEvent>,
}

#[derive(Clone, Copy, Debug)]
pub enum ReminderStorageEvent {
    JobsUpdated,
}

impl ReminderRepository {
    pub fn new(pool: Pool<Sqlite>) -> ReminderRepository {
        ReminderRepository {
            pool,
            events: tokio::sync::broadcast::channel(128).0,
        }
    }

    /// Replaces every reminder job of the event with `reminders`.
    #[cfg(test)]
    pub async fn replace_jobs(
        &self,
        event_id: EventId,
        reminders: &[PlannedReminder],
    ) -> Result<Vec<ReminderJob>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;
        replace_jobs_in(&mut transaction, event_id, reminders).await?;
        transaction.commit().await?;

        self.notify_updated();

        self.list_event_jobs(event_id).await
    }

    pub async fn list_event_jobs(
        &self,
        event_id: EventId,
    ) -> Result<Vec<ReminderJob>, anyhow::Error> {
        let jobs = query_as::<_, SqlReminderJob>(
            r#"
                SELECT id, event_id, kind, fire_at, fired_at FROM reminder_jobs
                WHERE event_id = $1
                ORDER BY fire_at, id
            "#,
        )
        .bind(event_id.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs
            .iter()
            .map(ReminderJob::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Unfired jobs whose time has come.
    pub async fn get_due_jobs(&self, now: UtcDateTime) -> Result<Vec<ReminderJob>, anyhow::Error> {
        let jobs = query_as::<_, SqlReminderJob>(
            r#"
                SELECT id, event_id, kind, fire_at, fired_at FROM reminder_jobs
                WHERE fired_at IS NULL AND fire_at <= $1
                ORDER BY fire_at, id
            "#,
        )
        .bind(now.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs
            .iter()
            .map(ReminderJob::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn get_closest_pending_fire_at(&self) -> Result<Option<UtcDateTime>, anyhow::Error> {
        let fire_at: Option<i64> =
            query_scalar(r#"SELECT MIN(fire_at) FROM reminder_jobs WHERE fired_at IS NULL"#)
                .fetch_one(&self.pool)
                .await?;

        Ok(fire_at.as_ref().map(UtcDateTime::from_db).transpose()?)
    }

    /// Marks the job as fired. Returns `false` if it was already fired or no
    /// longer exists, in which case it must not be delivered.
    pub async fn claim_job(
        &self,
        id: ReminderJobId,
        now: UtcDateTime,
    ) -> Result<bool, anyhow::Error> {
        let result =
            query(r#"UPDATE reminder_jobs SET fired_at = $1 WHERE id = $2 AND fired_at IS NULL"#)
                .bind(now.to_db()?)
                .bind(id.to_db()?)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Wakes up the scheduler so it picks up changed jobs.
    pub fn notify_updated(&self) {
        let _ = self.events.send(ReminderStorageEvent::JobsUpdated); // Nobody may be listening yet
    }

    pub fn subscribe(&self) -> Receiver<ReminderStorageEvent> {
        self.events.subscribe()
    }
}

pub(super) async fn replace_jobs_in(
    connection: &mut SqliteConnection,
    event_id: EventId,
    reminders: &[PlannedReminder],
) -> Result<(), anyhow::Error> {
    delete_jobs_in(connection, event_id).await?;

    let event_id = event_id.to_db()?;
    for reminder in reminders {
        query(r#"INSERT INTO reminder_jobs (event_id, kind, fire_at) VALUES ($1, $2, $3)"#)
            .bind(event_id)
            .bind(reminder.kind.to_db()?)
            .bind(reminder.fire_at.to_db()?)
            .execute(&mut *connection)
            .await?;
    }

    Ok(())
}

pub(super) async fn delete_jobs_in(
    connection: &mut SqliteConnection,
    event_id: EventId,
) -> Result<(), anyhow::Error> {
    query(r#"DELETE FROM reminder_jobs WHERE event_id = $1"#)
        .bind(event_id.to_db()?)
        .execute(&mut *connection)
        .await?;

    Ok(())
}

#[derive(Debug, FromRow)]
pub struct SqlReminderJob {
    id: i64,
    event_id: i64,
    kind: String,
    fire_at: i64,
    fired_at: Option<i64>,
}

impl DBConvertible for ReminderJob {
    type DBType = SqlReminderJob;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlReminderJob {
            id: self.id.to_db()?,
            event_id: self.event_id.to_db()?,
            kind: self.kind.to_db()?,
            fire_at: self.fire_at.to_db()?,
            fired_at: self.fired_at.map(|d| d.to_db()).transpose()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(ReminderJob {
            id: ReminderJobId::from_db(&value.id)?,
            event_id: EventId::from_db(&value.event_id)?,
            kind: ReminderKind::from_db(&value.kind)?,
            fire_at: UtcDateTime::from_db(&value.fire_at)?,
            fired_at: value
                .fired_at
                .as_ref()
                .map(UtcDateTime::from_db)
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use crate::{
        models::{types::UtcDateTime, EventId, PlannedReminder, ReminderKind},
        repository::{test_pool, ReminderRepository},
    };

    fn plan(base: UtcDateTime) -> Vec<PlannedReminder> {
        vec![
            PlannedReminder {
                kind: ReminderKind::StartReminder,
                fire_at: base + Duration::days(1),
            },
            PlannedReminder {
                kind: ReminderKind::WeekReminder,
                fire_at: base + Duration::days(8),
            },
            PlannedReminder {
                kind: ReminderKind::FinalReminder,
                fire_at: base + Duration::days(15),
            },
        ]
    }

    #[tokio::test]
    async fn replacing_twice_keeps_one_set() {
        let repository = ReminderRepository::new(test_pool().await);
        let base = UtcDateTime::now();

        let first = repository
            .replace_jobs(EventId(1), &plan(base))
            .await
            .unwrap();
        let second = repository
            .replace_jobs(EventId(1), &plan(base))
            .await
            .unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        for job in &first {
            assert!(second.iter().all(|j| j.id != job.id), "old job survived");
        }
        let kinds: Vec<_> = second.iter().map(|j| j.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReminderKind::StartReminder,
                ReminderKind::WeekReminder,
                ReminderKind::FinalReminder
            ]
        );
    }

    #[tokio::test]
    async fn replacing_leaves_other_events_alone() {
        let repository = ReminderRepository::new(test_pool().await);
        let base = UtcDateTime::now();

        repository
            .replace_jobs(EventId(1), &plan(base))
            .await
            .unwrap();
        repository
            .replace_jobs(EventId(2), &plan(base))
            .await
            .unwrap();
        repository.replace_jobs(EventId(1), &[]).await.unwrap();

        assert!(repository
            .list_event_jobs(EventId(1))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repository.list_event_jobs(EventId(2)).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn due_jobs_and_claims() {
        let repository = ReminderRepository::new(test_pool().await);
        let base = UtcDateTime::now() - Duration::days(2);
        repository
            .replace_jobs(EventId(1), &plan(base))
            .await
            .unwrap();

        let now = UtcDateTime::now();
        let due = repository.get_due_jobs(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, ReminderKind::StartReminder);

        assert!(repository.claim_job(due[0].id, now).await.unwrap());
        assert!(!repository.claim_job(due[0].id, now).await.unwrap());
        assert!(repository.get_due_jobs(now).await.unwrap().is_empty());

        assert_eq!(
            repository.get_closest_pending_fire_at().await.unwrap(),
            Some(base + Duration::days(8))
        );
    }

    #[tokio::test]
    async fn replaced_job_cannot_be_claimed() {
        let repository = ReminderRepository::new(test_pool().await);
        let base = UtcDateTime::now() - Duration::days(2);
        repository
            .replace_jobs(EventId(1), &plan(base))
            .await
            .unwrap();
        let stale = repository.get_due_jobs(UtcDateTime::now()).await.unwrap();

        repository
            .replace_jobs(EventId(1), &plan(base))
            .await
            .unwrap();

        assert!(!repository
            .claim_job(stale[0].id, UtcDateTime::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn no_pending_jobs() {
        let repository = ReminderRepository::new(test_pool().await);
        assert_eq!(
            repository.get_closest_pending_fire_at().await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn replace_wakes_subscribers() {
        let repository = ReminderRepository::new(test_pool().await);
        let mut events = repository.subscribe();

        repository
            .replace_jobs(EventId(1), &plan(UtcDateTime::now()))
            .await
            .unwrap();

        assert!(events.try_recv().is_ok());
    }
}
