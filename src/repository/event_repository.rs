use anyhow::bail;
use sqlx::{query, query_as, FromRow, Pool, Sqlite};
use tracing::warn;

use crate::models::{
    types::UtcDateTime, Event, EventId, EventStatus, GroupId, NewEvent, PlannedReminder,
};

use super::{
    conversion::{DBConvertible, DBFromConversionError, DBToConversionError},
    reminder_repository::{delete_jobs_in, replace_jobs_in},
};

const EVENT_COLUMNS: &str = r#"
    id, group_id, slug, display_name, price_limit, status, start_date, end_date, created_at
"#;

#[derive(Debug)]
pub struct EventRepository {
    pool: Pool<Sqlite>,
}

impl EventRepository {
    pub fn new(pool: Pool<Sqlite>) -> EventRepository {
        EventRepository { pool }
    }

    pub async fn create_event(&self, new_event: &NewEvent) -> Result<Event, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let event = query_as::<_, SqlEvent>(&format!(
            r#"
                INSERT INTO events (group_id, slug, display_name, price_limit, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(new_event.group.to_db()?)
        .bind(&new_event.slug)
        .bind(&new_event.display_name)
        .bind(&new_event.price_limit)
        .bind(EventStatus::Waiting.to_db()?)
        .bind(UtcDateTime::now().to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(Event::from_db(&event)?)
    }

    pub async fn get_event(&self, id: EventId) -> Result<Option<Event>, anyhow::Error> {
        let event =
            query_as::<_, SqlEvent>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id.to_db()?)
                .fetch_optional(&self.pool)
                .await?;

        match event {
            Some(event) => Ok(Some(Event::from_db(&event)?)),
            None => Ok(None),
        }
    }

    pub async fn find_event_by_slug(
        &self,
        group: GroupId,
        slug: &str,
    ) -> Result<Option<Event>, anyhow::Error> {
        let event = query_as::<_, SqlEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE group_id = $1 AND slug = $2"
        ))
        .bind(group.to_db()?)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        match event {
            Some(event) => Ok(Some(Event::from_db(&event)?)),
            None => Ok(None),
        }
    }

    pub async fn list_group_events(&self, group: GroupId) -> Result<Vec<Event>, anyhow::Error> {
        let events = query_as::<_, SqlEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE group_id = $1 ORDER BY created_at, id"
        ))
        .bind(group.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(events
            .iter()
            .map(Event::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Stores the new dates. With `reminders` the event's reminder jobs are
    /// replaced in the same transaction.
    pub async fn update_dates(
        &self,
        id: EventId,
        start: UtcDateTime,
        end: UtcDateTime,
        reminders: Option<&[PlannedReminder]>,
    ) -> Result<(), anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let result = query(r#"UPDATE events SET start_date = $1, end_date = $2 WHERE id = $3"#)
            .bind(start.to_db()?)
            .bind(end.to_db()?)
            .bind(id.to_db()?)
            .execute(&mut *transaction)
            .await?;

        if result.rows_affected() != 1 {
            bail!("Event {id:?} does not exist");
        }

        if let Some(reminders) = reminders {
            replace_jobs_in(&mut transaction, id, reminders).await?;
        }

        transaction.commit().await?;

        Ok(())
    }

    /// Moves the event from `from` to `to` and drops its pending reminder jobs.
    ///
    /// Fails without changes if the event is no longer in `from`.
    pub async fn update_status(
        &self,
        id: EventId,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<(), anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let result = query(r#"UPDATE events SET status = $1 WHERE id = $2 AND status = $3"#)
            .bind(to.to_db()?)
            .bind(id.to_db()?)
            .bind(from.to_db()?)
            .execute(&mut *transaction)
            .await?;

        if result.rows_affected() != 1 {
            bail!("Event {id:?} is not {from} anymore");
        }

        delete_jobs_in(&mut transaction, id).await?;

        transaction.commit().await?;

        Ok(())
    }

    /// Deletes the event together with everything it owns.
    pub async fn delete_event(&self, id: EventId) -> Result<bool, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let db_id = id.to_db()?;
        for table in ["draw_results", "exclusion_rules"] {
            query(&format!("DELETE FROM {table} WHERE event_id = $1"))
                .bind(db_id)
                .execute(&mut *transaction)
                .await?;
        }
        delete_jobs_in(&mut transaction, id).await?;

        let result = query(r#"DELETE FROM events WHERE id = $1"#)
            .bind(db_id)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        let events_deleted = result.rows_affected();
        if events_deleted > 1 {
            warn!("Deleted more than one event with id {id:?}");
        }

        Ok(events_deleted > 0)
    }
}

#[derive(Debug, FromRow)]
pub struct SqlEvent {
    id: i64,
    group_id: i64,
    slug: String,
    display_name: String,
    price_limit: Option<String>,
    status: String,
    start_date: Option<i64>,
    end_date: Option<i64>,
    created_at: i64,
}

impl DBConvertible for Event {
    type DBType = SqlEvent;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlEvent {
            id: self.id.to_db()?,
            group_id: self.group.to_db()?,
            slug: self.slug.clone(),
            display_name: self.display_name.clone(),
            price_limit: self.price_limit.clone(),
            status: self.status.to_db()?,
            start_date: self.start_date.map(|d| d.to_db()).transpose()?,
            end_date: self.end_date.map(|d| d.to_db()).transpose()?,
            created_at: self.created_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Event {
            id: EventId::from_db(&value.id)?,
            group: GroupId::from_db(&value.group_id)?,
            slug: value.slug.clone(),
            display_name: value.display_name.clone(),
            price_limit: value.price_limit.clone(),
            status: EventStatus::from_db(&value.status)?,
            start_date: value
                .start_date
                .as_ref()
                .map(UtcDateTime::from_db)
                .transpose()?,
            end_date: value
                .end_date
                .as_ref()
                .map(UtcDateTime::from_db)
                .transpose()?,
            created_at: UtcDateTime::from_db(&value.created_at)?,
        })
    }
}
