use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use hindsight_core::team::{SlackTeam, TeamSettingsPatch};

use super::{RepositoryError, TeamRepository};
use crate::DbPool;

/// SQLite-backed team repository. Every operation is one transaction.
#[derive(Clone)]
pub struct SqlTeamRepository {
    pool: DbPool,
}

impl SqlTeamRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_team(row: &SqliteRow) -> Result<SlackTeam, RepositoryError> {
    let namespace_raw: String = row.get("namespace_uuid");
    let namespace_uuid = Uuid::parse_str(&namespace_raw).map_err(|err| {
        RepositoryError::Decode(format!("invalid namespace_uuid `{namespace_raw}`: {err}"))
    })?;
    Ok(SlackTeam {
        id: row.get("id"),
        team_id: row.get("team_id"),
        bot_id: row.get("bot_id"),
        namespace_uuid,
        model: row.get("model"),
        temperature: row.get("temperature"),
        context: row.get("context"),
        timezone_offset: row.get("timezone_offset"),
    })
}

const SELECT_TEAM: &str = "SELECT id, team_id, bot_id, namespace_uuid, model, temperature, \
     context, timezone_offset FROM slack_teams WHERE team_id = ?";

#[async_trait]
impl TeamRepository for SqlTeamRepository {
    async fn get(&self, team_id: &str) -> Result<SlackTeam, RepositoryError> {
        let row = sqlx::query(SELECT_TEAM).bind(team_id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => decode_team(&row),
            None => Err(RepositoryError::NotFound(team_id.to_string())),
        }
    }

    async fn get_or_create(
        &self,
        team_id: &str,
        bot_id: &str,
    ) -> Result<SlackTeam, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(row) =
            sqlx::query(SELECT_TEAM).bind(team_id).fetch_optional(&mut *tx).await?
        {
            tx.commit().await?;
            return decode_team(&row);
        }

        let mut team = SlackTeam::new(team_id, bot_id);
        let result = sqlx::query(
            "INSERT INTO slack_teams \
             (team_id, bot_id, namespace_uuid, model, temperature, context, timezone_offset) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&team.team_id)
        .bind(&team.bot_id)
        .bind(team.namespace_uuid.to_string())
        .bind(&team.model)
        .bind(team.temperature)
        .bind(&team.context)
        .bind(&team.timezone_offset)
        .execute(&mut *tx)
        .await?;
        team.id = result.last_insert_rowid();

        tx.commit().await?;
        Ok(team)
    }

    async fn update(
        &self,
        team_id: &str,
        patch: &TeamSettingsPatch,
    ) -> Result<SlackTeam, RepositoryError> {
        patch.validate()?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(SELECT_TEAM).bind(team_id).fetch_optional(&mut *tx).await?;
        let mut team = match row {
            Some(row) => decode_team(&row)?,
            None => return Err(RepositoryError::NotFound(team_id.to_string())),
        };
        team.apply(patch)?;

        sqlx::query(
            "UPDATE slack_teams SET model = ?, temperature = ?, context = ?, \
             timezone_offset = ?, updated_at = datetime('now') WHERE team_id = ?",
        )
        .bind(&team.model)
        .bind(team.temperature)
        .bind(&team.context)
        .bind(&team.timezone_offset)
        .bind(team_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(team)
    }

    async fn delete(&self, team_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM slack_teams WHERE team_id = ?")
            .bind(team_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hindsight_core::team::{ConfigValidationError, DEFAULT_CONTEXT};

    use super::*;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;

    async fn repository() -> SqlTeamRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        SqlTeamRepository::new(pool)
    }

    #[tokio::test]
    async fn get_missing_team_is_not_found() {
        let repo = repository().await;
        assert!(matches!(
            repo.get("T404").await,
            Err(RepositoryError::NotFound(team)) if team == "T404"
        ));
    }

    #[tokio::test]
    async fn get_or_create_inserts_defaults_once() {
        let repo = repository().await;

        let created = repo.get_or_create("T1", "B1").await.expect("create");
        assert_eq!(created.model, "gpt-3.5-turbo");
        assert_eq!(created.temperature, 1.0);
        assert_eq!(created.context, DEFAULT_CONTEXT);
        assert_eq!(created.timezone_offset, "+00:00");

        let again = repo.get_or_create("T1", "B1").await.expect("fetch");
        assert_eq!(again.namespace_uuid, created.namespace_uuid);
        assert_eq!(again.id, created.id);
    }

    #[tokio::test]
    async fn update_applies_patch_atomically() {
        let repo = repository().await;
        repo.get_or_create("T1", "B1").await.expect("create");

        let updated = repo
            .update(
                "T1",
                &TeamSettingsPatch {
                    temperature: Some(0.3),
                    timezone_offset: Some("+09:00".into()),
                    ..TeamSettingsPatch::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.temperature, 0.3);
        assert_eq!(updated.timezone_offset, "+09:00");

        let err = repo
            .update(
                "T1",
                &TeamSettingsPatch {
                    context: Some("ok".into()),
                    temperature: Some(9.9),
                    ..TeamSettingsPatch::default()
                },
            )
            .await
            .expect_err("invalid temperature");
        assert!(matches!(
            err,
            RepositoryError::Validation(ConfigValidationError::TemperatureRange(_))
        ));

        // nothing from the failed patch stuck
        let current = repo.get("T1").await.expect("get");
        assert_eq!(current.temperature, 0.3);
        assert_eq!(current.context, DEFAULT_CONTEXT);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let repo = repository().await;
        repo.get_or_create("T1", "B1").await.expect("create");

        repo.delete("T1").await.expect("delete");
        repo.delete("T1").await.expect("delete again");
        assert!(matches!(repo.get("T1").await, Err(RepositoryError::NotFound(_))));
    }
}
