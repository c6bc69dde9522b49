//! `SQLite` implementation of [`RuleRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use farmhub_app::ports::RuleRepository;
use farmhub_domain::error::FarmHubError;
use farmhub_domain::rule::{ActionType, Operator, Rule};

use crate::error::StorageError;

struct Wrapper(Rule);

fn decode_err(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let operator: String = row.try_get("condition_operator")?;
        let operator: Operator = operator.parse().map_err(decode_err)?;
        let action: String = row.try_get("action_type")?;
        let action: ActionType = action.parse().map_err(decode_err)?;
        let duration: Option<i64> = row.try_get("action_duration")?;

        let mut builder = Rule::builder()
            .id(row.try_get::<i64, _>("id")?)
            .farm_id(row.try_get::<i64, _>("farm_id")?)
            .name(row.try_get::<String, _>("name")?)
            .enabled(row.try_get("enabled")?)
            .condition(
                row.try_get::<String, _>("condition_metric")?,
                operator,
                row.try_get("condition_value")?,
            )
            .action(action)
            .sensor_device_id(row.try_get::<i64, _>("sensor_device_id")?)
            .actuator_device_id(row.try_get::<i64, _>("actuator_device_id")?);
        if let Some(minutes) = duration.and_then(|d| u32::try_from(d).ok()) {
            builder = builder.action_duration_minutes(minutes);
        }

        builder.build().map(Self).map_err(decode_err)
    }
}

const SELECT_ENABLED: &str = r"
    SELECT * FROM rules
    WHERE enabled = 1
    ORDER BY farm_id ASC, id ASC
";

/// `SQLite`-backed read-only rule repository.
pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RuleRepository for SqliteRuleRepository {
    async fn list_enabled(&self) -> Result<Vec<Rule>, FarmHubError> {
        let rows = sqlx::query(SELECT_ENABLED)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in &rows {
            match Wrapper::from_row(row) {
                Ok(Wrapper(rule)) => rules.push(rule),
                Err(err) => {
                    let rule_id: Option<i64> = row.try_get("id").ok();
                    tracing::warn!(?rule_id, error = %err, "skipping unreadable rule");
                }
            }
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use farmhub_domain::id::{DeviceId, FarmId, RuleId};

    use super::*;
    use crate::pool::Config;

    async fn setup() -> (SqliteRuleRepository, SqlitePool) {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        let pool = db.pool().clone();
        (SqliteRuleRepository::new(pool.clone()), pool)
    }

    async fn insert_rule(
        pool: &SqlitePool,
        id: i64,
        enabled: bool,
        operator: &str,
        action: &str,
        duration: Option<i64>,
    ) {
        sqlx::query(
            "INSERT INTO rules (id, farm_id, name, enabled, condition_metric, condition_operator, \
             condition_value, action_type, action_duration, sensor_device_id, actuator_device_id) \
             VALUES (?, 7, ?, ?, 'temperature', ?, 40.0, ?, ?, 10, 20)",
        )
        .bind(id)
        .bind(format!("rule {id}"))
        .bind(enabled)
        .bind(operator)
        .bind(action)
        .bind(duration)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn should_list_only_enabled_rules() {
        let (repo, pool) = setup().await;
        insert_rule(&pool, 1, true, ">", "TURN_ON", None).await;
        insert_rule(&pool, 2, false, "<", "TURN_OFF", None).await;

        let rules = repo.list_enabled().await.unwrap();

        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.id, RuleId::new(1));
        assert_eq!(rule.farm_id, FarmId::new(7));
        assert_eq!(rule.condition.operator, Operator::GreaterThan);
        assert_eq!(rule.action, ActionType::TurnOn);
        assert_eq!(rule.sensor_device_id, DeviceId::new(10));
        assert_eq!(rule.actuator_device_id, DeviceId::new(20));
        assert!(rule.action_duration_minutes.is_none());
    }

    #[tokio::test]
    async fn should_read_action_duration_and_lowercase_action() {
        let (repo, pool) = setup().await;
        insert_rule(&pool, 1, true, ">=", "turn_off", Some(15)).await;

        let rules = repo.list_enabled().await.unwrap();

        assert_eq!(rules[0].action, ActionType::TurnOff);
        assert_eq!(rules[0].action_duration_minutes, Some(15));
    }

    #[tokio::test]
    async fn should_skip_rows_that_cannot_be_parsed() {
        let (repo, pool) = setup().await;
        insert_rule(&pool, 1, true, "!=", "TURN_ON", None).await;
        insert_rule(&pool, 2, true, ">", "OPEN", None).await;
        insert_rule(&pool, 3, true, "<", "TURN_ON", None).await;

        let rules = repo.list_enabled().await.unwrap();

        let ids: Vec<RuleId> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RuleId::new(3)]);
    }

    #[tokio::test]
    async fn should_return_empty_list_when_no_rules() {
        let (repo, _pool) = setup().await;
        assert!(repo.list_enabled().await.unwrap().is_empty());
    }
}
