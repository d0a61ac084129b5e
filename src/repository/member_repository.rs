use poise::serenity_prelude::UserId;
use sqlx::{query, query_as, FromRow, Pool, Sqlite};

use crate::models::{types::UtcDateTime, GroupId, Participant, ParticipantId};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

pub struct MemberRepository {
    pool: Pool<Sqlite>,
}

impl MemberRepository {
    pub fn new(pool: Pool<Sqlite>) -> MemberRepository {
        MemberRepository { pool }
    }

    /// Adds the user to the group. Joining twice returns the existing membership.
    pub async fn join(&self, group: GroupId, user: UserId) -> Result<Participant, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let group = group.to_db()?;
        let user = user.to_db()?;

        query(
            r#"
                INSERT INTO group_members (group_id, user_id, joined_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group)
        .bind(user)
        .bind(UtcDateTime::now().to_db()?)
        .execute(&mut *transaction)
        .await?;

        let member = query_as::<_, SqlMember>(
            r#"
                SELECT id, group_id, user_id, joined_at FROM group_members
                WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group)
        .bind(user)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(Participant::from_db(&member)?)
    }

    /// Removes the user from the group along with exclusion rules mentioning them.
    pub async fn leave(&self, group: GroupId, user: UserId) -> Result<bool, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let member: Option<i64> = sqlx::query_scalar(
            r#"SELECT id FROM group_members WHERE group_id = $1 AND user_id = $2"#,
        )
        .bind(group.to_db()?)
        .bind(user.to_db()?)
        .fetch_optional(&mut *transaction)
        .await?;

        let Some(member) = member else {
            return Ok(false);
        };

        query(r#"DELETE FROM exclusion_rules WHERE user_a = $1 OR user_b = $1"#)
            .bind(member)
            .execute(&mut *transaction)
            .await?;
        query(r#"DELETE FROM group_members WHERE id = $1"#)
            .bind(member)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(true)
    }

    /// Members in the order they joined.
    pub async fn list_group_members(
        &self,
        group: GroupId,
    ) -> Result<Vec<Participant>, anyhow::Error> {
        let members = query_as::<_, SqlMember>(
            r#"
                SELECT id, group_id, user_id, joined_at FROM group_members
                WHERE group_id = $1
                ORDER BY joined_at, id
            "#,
        )
        .bind(group.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(members
            .iter()
            .map(Participant::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn find_member(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Option<Participant>, anyhow::Error> {
        let member = query_as::<_, SqlMember>(
            r#"
                SELECT id, group_id, user_id, joined_at FROM group_members
                WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group.to_db()?)
        .bind(user.to_db()?)
        .fetch_optional(&self.pool)
        .await?;

        match member {
            Some(member) => Ok(Some(Participant::from_db(&member)?)),
            None => Ok(None),
        }
    }

    pub async fn get_member(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, anyhow::Error> {
        let member = query_as::<_, SqlMember>(
            r#"SELECT id, group_id, user_id, joined_at FROM group_members WHERE id = $1"#,
        )
        .bind(id.to_db()?)
        .fetch_optional(&self.pool)
        .await?;

        match member {
            Some(member) => Ok(Some(Participant::from_db(&member)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct SqlMember {
    id: i64,
    group_id: i64,
    user_id: i64,
    joined_at: i64,
}

impl DBConvertible for Participant {
    type DBType = SqlMember;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlMember {
            id: self.id.to_db()?,
            group_id: self.group.to_db()?,
            user_id: self.handle.to_db()?,
            joined_at: self.joined_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Participant {
            id: ParticipantId::from_db(&value.id)?,
            group: GroupId::from_db(&value.group_id)?,
            handle: UserId::from_db(&value.user_id)?,
            joined_at: UtcDateTime::from_db(&value.joined_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::UserId;

    use crate::{
        models::{EventId, GroupId, NewExclusionRule, RuleKind},
        repository::{test_pool, ExclusionRepository, MemberRepository},
    };

    #[tokio::test]
    async fn join_is_idempotent() {
        let repository = MemberRepository::new(test_pool().await);

        let first = repository.join(GroupId(1), UserId::new(100)).await.unwrap();
        let second = repository.join(GroupId(1), UserId::new(100)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            repository
                .list_group_members(GroupId(1))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn members_are_listed_in_join_order() {
        let repository = MemberRepository::new(test_pool().await);

        for user in [300, 100, 200] {
            repository
                .join(GroupId(1), UserId::new(user))
                .await
                .unwrap();
        }
        repository.join(GroupId(2), UserId::new(400)).await.unwrap();

        let handles: Vec<_> = repository
            .list_group_members(GroupId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.handle.get())
            .collect();
        assert_eq!(handles, vec![300, 100, 200]);
    }

    #[tokio::test]
    async fn leave_drops_exclusion_rules() {
        let pool = test_pool().await;
        let members = MemberRepository::new(pool.clone());
        let exclusions = ExclusionRepository::new(pool);

        let alice = members.join(GroupId(1), UserId::new(1)).await.unwrap();
        let bob = members.join(GroupId(1), UserId::new(2)).await.unwrap();
        exclusions
            .add_rule(&NewExclusionRule {
                event_id: EventId(1),
                user_a: alice.id,
                user_b: bob.id,
                kind: RuleKind::Mutual,
                reason: None,
            })
            .await
            .unwrap();

        assert!(members.leave(GroupId(1), UserId::new(2)).await.unwrap());
        assert!(!members.leave(GroupId(1), UserId::new(2)).await.unwrap());

        assert!(exclusions.list_rules(EventId(1)).await.unwrap().is_empty());
        assert_eq!(
            members
                .find_member(GroupId(1), UserId::new(2))
                .await
                .unwrap(),
            None
        );
        assert_eq!(members.get_member(alice.id).await.unwrap(), Some(alice));
    }
}
