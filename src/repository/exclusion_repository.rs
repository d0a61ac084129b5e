use sqlx::{query_as, FromRow, Pool, Sqlite};

use crate::models::{
    types::UtcDateTime, EventId, ExclusionRule, ExclusionRuleId, NewExclusionRule, ParticipantId,
    RuleKind,
};

use super::conversion::{DBConvertible, DBFromConversionError, DBToConversionError};

pub struct ExclusionRepository {
    pool: Pool<Sqlite>,
}

impl ExclusionRepository {
    pub fn new(pool: Pool<Sqlite>) -> ExclusionRepository {
        ExclusionRepository { pool }
    }

    pub async fn add_rule(&self, rule: &NewExclusionRule) -> Result<ExclusionRule, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let added_rule = query_as::<_, SqlExclusionRule>(
            r#"
                INSERT INTO exclusion_rules (event_id, user_a, user_b, kind, reason, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, event_id, user_a, user_b, kind, reason, created_at
            "#,
        )
        .bind(rule.event_id.to_db()?)
        .bind(rule.user_a.to_db()?)
        .bind(rule.user_b.to_db()?)
        .bind(rule.kind.to_db()?)
        .bind(&rule.reason)
        .bind(UtcDateTime::now().to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(ExclusionRule::from_db(&added_rule)?)
    }

    pub async fn find_rule(
        &self,
        event_id: EventId,
        user_a: ParticipantId,
        user_b: ParticipantId,
    ) -> Result<Option<ExclusionRule>, anyhow::Error> {
        let rule = query_as::<_, SqlExclusionRule>(
            r#"
                SELECT id, event_id, user_a, user_b, kind, reason, created_at FROM exclusion_rules
                WHERE event_id = $1 AND user_a = $2 AND user_b = $3
            "#,
        )
        .bind(event_id.to_db()?)
        .bind(user_a.to_db()?)
        .bind(user_b.to_db()?)
        .fetch_optional(&self.pool)
        .await?;

        match rule {
            Some(rule) => Ok(Some(ExclusionRule::from_db(&rule)?)),
            None => Ok(None),
        }
    }

    pub async fn list_rules(&self, event_id: EventId) -> Result<Vec<ExclusionRule>, anyhow::Error> {
        let rules = query_as::<_, SqlExclusionRule>(
            r#"
                SELECT id, event_id, user_a, user_b, kind, reason, created_at FROM exclusion_rules
                WHERE event_id = $1
                ORDER BY id
            "#,
        )
        .bind(event_id.to_db()?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rules
            .iter()
            .map(ExclusionRule::from_db)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[derive(Debug, FromRow)]
pub struct SqlExclusionRule {
    id: i64,
    event_id: i64,
    user_a: i64,
    user_b: i64,
    kind: String,
    reason: Option<String>,
    created_at: i64,
}

impl DBConvertible for ExclusionRule {
    type DBType = SqlExclusionRule;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlExclusionRule {
            id: self.id.to_db()?,
            event_id: self.event_id.to_db()?,
            user_a: self.user_a.to_db()?,
            user_b: self.user_b.to_db()?,
            kind: self.kind.to_db()?,
            reason: self.reason.clone(),
            created_at: self.created_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(ExclusionRule {
            id: ExclusionRuleId::from_db(&value.id)?,
            event_id: EventId::from_db(&value.event_id)?,
            user_a: ParticipantId::from_db(&value.user_a)?,
            user_b: ParticipantId::from_db(&value.user_b)?,
            kind: RuleKind::from_db(&value.kind)?,
            reason: value.reason.clone(),
            created_at: UtcDateTime::from_db(&value.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        models::{EventId, NewExclusionRule, ParticipantId, RuleKind},
        repository::{test_pool, ExclusionRepository},
    };

    fn rule(user_a: u64, user_b: u64, kind: RuleKind) -> NewExclusionRule {
        NewExclusionRule {
            event_id: EventId(1),
            user_a: ParticipantId(user_a),
            user_b: ParticipantId(user_b),
            kind,
            reason: Some("Couple".to_string()),
        }
    }

    #[tokio::test]
    async fn add_and_list() {
        let repository = ExclusionRepository::new(test_pool().await);

        let added = repository
            .add_rule(&rule(1, 2, RuleKind::Mutual))
            .await
            .unwrap();
        repository
            .add_rule(&rule(2, 1, RuleKind::Directional))
            .await
            .unwrap();

        let rules = repository.list_rules(EventId(1)).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], added);
        assert_eq!(rules[0].reason.as_deref(), Some("Couple"));
        assert_eq!(rules[1].kind, RuleKind::Directional);
        assert!(repository.list_rules(EventId(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_rule_is_rejected_by_the_schema() {
        let repository = ExclusionRepository::new(test_pool().await);

        repository
            .add_rule(&rule(1, 2, RuleKind::Mutual))
            .await
            .unwrap();
        assert!(repository
            .add_rule(&rule(1, 2, RuleKind::Directional))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn self_exclusion_is_rejected_by_the_schema() {
        let repository = ExclusionRepository::new(test_pool().await);
        assert!(repository
            .add_rule(&rule(3, 3, RuleKind::Mutual))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn find_is_directional() {
        let repository = ExclusionRepository::new(test_pool().await);
        repository
            .add_rule(&rule(1, 2, RuleKind::Mutual))
            .await
            .unwrap();

        let find = |a, b| repository.find_rule(EventId(1), ParticipantId(a), ParticipantId(b));
        assert!(find(1, 2).await.unwrap().is_some());
        assert!(find(2, 1).await.unwrap().is_none());
    }
}
