use std::collections::HashMap;

use anyhow::bail;
use sqlx::{query, query_as, query_scalar, FromRow, Pool, Sqlite};

use crate::models::{
    types::UtcDateTime, AssignedPair, AssignedPairId, Assignment, EventId, EventStatus,
    ParticipantId, PlannedReminder,
};

use super::{
    conversion::{DBConvertible, DBFromConversionError, DBToConversionError},
    reminder_repository::replace_jobs_in,
};

pub struct AssignmentRepository {
    pool: Pool<Sqlite>,
}

impl AssignmentRepository {
    pub fn new(pool: Pool<Sqlite>) -> AssignmentRepository {
        AssignmentRepository { pool }
    }

    /// Persists the outcome of a draw as one unit: the previous pairs are
    /// replaced, the event moves from `from` to active and its reminder jobs are
    /// replaced with `reminders`.
    ///
    /// Nothing is written if the event has left `from` in the meantime.
    /// Returns the stored pair id of every giver.
    pub async fn commit_draw(
        &self,
        event_id: EventId,
        from: EventStatus,
        assignment: &Assignment,
        reminders: &[PlannedReminder],
    ) -> Result<HashMap<ParticipantId, AssignedPairId>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let db_event_id = event_id.to_db()?;

        let result = query(r#"UPDATE events SET status = $1 WHERE id = $2 AND status = $3"#)
            .bind(EventStatus::Active.to_db()?)
            .bind(db_event_id)
            .bind(from.to_db()?)
            .execute(&mut *transaction)
            .await?;

        if result.rows_affected() != 1 {
            bail!("Event {event_id:?} is not {from} anymore");
        }

        query(r#"DELETE FROM draw_results WHERE event_id = $1"#)
            .bind(db_event_id)
            .execute(&mut *transaction)
            .await?;

        let created_at = UtcDateTime::now().to_db()?;
        let mut pair_ids = HashMap::with_capacity(assignment.len());
        for (giver, receiver) in assignment.pairs() {
            let pair_id: i64 = query_scalar(
                r#"
                    INSERT INTO draw_results (event_id, giver, receiver, created_at)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id
                "#,
            )
            .bind(db_event_id)
            .bind(giver.to_db()?)
            .bind(receiver.to_db()?)
            .bind(created_at)
            .fetch_one(&mut *transaction)
            .await?;

            pair_ids.insert(*giver, AssignedPairId::from_db(&pair_id)?);
        }

        replace_jobs_in(&mut transaction, event_id, reminders).await?;

        transaction.commit().await?;

        Ok(pair_ids)
    }

    pub async fn list_pairs(&self, event_id: EventId) -> Result<Vec<AssignedPair>, anyhow::Error> {
        let pairs = query_as::<_, SqlAssignedPair>(
            r#"
                SELECT id, event_id, giver, receiver, notified, gift_sent, gift_delivered,
                    gift_confirmed, created_at
                FROM draw_results
                WHERE event_id = $1
                ORDER BY id
            "#,
        )
        .bind(event_id.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(pairs
            .iter()
            .map(AssignedPair::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn find_recipient(
        &self,
        event_id: EventId,
        giver: ParticipantId,
    ) -> Result<Option<ParticipantId>, anyhow::Error> {
        let receiver: Option<i64> =
            query_scalar(r#"SELECT receiver FROM draw_results WHERE event_id = $1 AND giver = $2"#)
                .bind(event_id.to_db()?)
                .bind(giver.to_db()?)
                .fetch_optional(&self.pool)
                .await?;

        Ok(receiver.as_ref().map(ParticipantId::from_db).transpose()?)
    }

    /// Flags the given pairs as announced. Pairs replaced by a later draw are
    /// gone and stay untouched.
    pub async fn mark_notified(&self, pairs: &[AssignedPairId]) -> Result<(), anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        for pair in pairs {
            query(r#"UPDATE draw_results SET notified = TRUE WHERE id = $1"#)
                .bind(pair.to_db()?)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
pub struct SqlAssignedPair {
    id: i64,
    event_id: i64,
    giver: i64,
    receiver: i64,
    notified: bool,
    gift_sent: bool,
    gift_delivered: bool,
    gift_confirmed: bool,
    created_at: i64,
}

impl DBConvertible for AssignedPair {
    type DBType = SqlAssignedPair;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlAssignedPair {
            id: self.id.to_db()?,
            event_id: self.event_id.to_db()?,
            giver: self.giver.to_db()?,
            receiver: self.receiver.to_db()?,
            notified: self.notified,
            gift_sent: self.gift_sent,
            gift_delivered: self.gift_delivered,
            gift_confirmed: self.gift_confirmed,
            created_at: self.created_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(AssignedPair {
            id: AssignedPairId::from_db(&value.id)?,
            event_id: EventId::from_db(&value.event_id)?,
            giver: ParticipantId::from_db(&value.giver)?,
            receiver: ParticipantId::from_db(&value.receiver)?,
            notified: value.notified,
            gift_sent: value.gift_sent,
            gift_delivered: value.gift_delivered,
            gift_confirmed: value.gift_confirmed,
            created_at: UtcDateTime::from_db(&value.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use time::Duration;

    use crate::{
        models::{
            types::UtcDateTime, Assignment, EventStatus, ExclusionRuleSet, GroupId, NewEvent,
            ParticipantId, PlannedReminder, ReminderKind,
        },
        repository::{test_pool, AssignmentRepository, EventRepository, ReminderRepository},
        solver,
    };

    fn assignment(seed: u64) -> Assignment {
        let participants: Vec<_> = (1..=5).map(ParticipantId).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        solver::draw(&participants, &ExclusionRuleSet::new(), &mut rng).unwrap()
    }

    fn reminders() -> Vec<PlannedReminder> {
        vec![PlannedReminder {
            kind: ReminderKind::FinalReminder,
            fire_at: UtcDateTime::now() + Duration::days(3),
        }]
    }

    #[tokio::test]
    async fn commit_replaces_previous_draw() {
        let pool = test_pool().await;
        let events = EventRepository::new(pool.clone());
        let assignments = AssignmentRepository::new(pool.clone());
        let jobs = ReminderRepository::new(pool);

        let event = events
            .create_event(&NewEvent {
                group: GroupId(1),
                slug: "Family".to_string(),
                display_name: "Family".to_string(),
                price_limit: None,
            })
            .await
            .unwrap();

        let first_ids = assignments
            .commit_draw(event.id, EventStatus::Waiting, &assignment(1), &reminders())
            .await
            .unwrap();
        assignments
            .mark_notified(&[first_ids[&ParticipantId(1)]])
            .await
            .unwrap();

        let second = assignment(2);
        assignments
            .commit_draw(event.id, EventStatus::Active, &second, &reminders())
            .await
            .unwrap();

        let pairs = assignments.list_pairs(event.id).await.unwrap();
        assert_eq!(pairs.len(), 5);
        for pair in &pairs {
            assert_eq!(second.recipient_of(pair.giver), Some(pair.receiver));
            assert!(!pair.notified);
        }
        assert_eq!(jobs.list_event_jobs(event.id).await.unwrap().len(), 1);

        let stored = events.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Active);
        assert_eq!(
            assignments
                .find_recipient(event.id, ParticipantId(3))
                .await
                .unwrap(),
            second.recipient_of(ParticipantId(3))
        );
    }

    #[tokio::test]
    async fn late_announcement_does_not_flag_newer_pairs() {
        let pool = test_pool().await;
        let events = EventRepository::new(pool.clone());
        let assignments = AssignmentRepository::new(pool);

        let event = events
            .create_event(&NewEvent {
                group: GroupId(1),
                slug: "Family".to_string(),
                display_name: "Family".to_string(),
                price_limit: None,
            })
            .await
            .unwrap();

        let first_ids = assignments
            .commit_draw(event.id, EventStatus::Waiting, &assignment(1), &reminders())
            .await
            .unwrap();
        let second_ids = assignments
            .commit_draw(event.id, EventStatus::Active, &assignment(2), &reminders())
            .await
            .unwrap();

        let stale: Vec<_> = first_ids.values().copied().collect();
        assignments.mark_notified(&stale).await.unwrap();
        assert!(assignments
            .list_pairs(event.id)
            .await
            .unwrap()
            .iter()
            .all(|pair| !pair.notified));

        assignments
            .mark_notified(&[second_ids[&ParticipantId(4)]])
            .await
            .unwrap();
        let notified: Vec<_> = assignments
            .list_pairs(event.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|pair| pair.notified)
            .map(|pair| (pair.id, pair.giver))
            .collect();
        assert_eq!(
            notified,
            vec![(second_ids[&ParticipantId(4)], ParticipantId(4))]
        );
    }

    #[tokio::test]
    async fn stale_status_writes_nothing() {
        let pool = test_pool().await;
        let events = EventRepository::new(pool.clone());
        let assignments = AssignmentRepository::new(pool);

        let event = events
            .create_event(&NewEvent {
                group: GroupId(1),
                slug: "Family".to_string(),
                display_name: "Family".to_string(),
                price_limit: None,
            })
            .await
            .unwrap();

        assert!(assignments
            .commit_draw(event.id, EventStatus::Active, &assignment(1), &reminders())
            .await
            .is_err());

        assert!(assignments.list_pairs(event.id).await.unwrap().is_empty());
        let stored = events.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Waiting);
    }
}
