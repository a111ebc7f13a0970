use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use hindsight_core::team::{SlackTeam, TeamSettingsPatch};

use super::{RepositoryError, TeamRepository};

/// Map-backed repository for handler and orchestrator tests.
#[derive(Default)]
pub struct InMemoryTeamRepository {
    teams: Mutex<HashMap<String, SlackTeam>>,
    next_id: AtomicI64,
}

impl InMemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team(team: SlackTeam) -> Self {
        let repo = Self::new();
        repo.next_id.fetch_max(team.id, Ordering::SeqCst);
        repo.teams.lock().expect("lock").insert(team.team_id.clone(), team);
        repo
    }
}

#[async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn get(&self, team_id: &str) -> Result<SlackTeam, RepositoryError> {
        self.teams
            .lock()
            .expect("lock")
            .get(team_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(team_id.to_string()))
    }

    async fn get_or_create(
        &self,
        team_id: &str,
        bot_id: &str,
    ) -> Result<SlackTeam, RepositoryError> {
        let mut teams = self.teams.lock().expect("lock");
        Ok(teams
            .entry(team_id.to_string())
            .or_insert_with(|| {
                let mut team = SlackTeam::new(team_id, bot_id);
                team.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                team
            })
            .clone())
    }

    async fn update(
        &self,
        team_id: &str,
        patch: &TeamSettingsPatch,
    ) -> Result<SlackTeam, RepositoryError> {
        let mut teams = self.teams.lock().expect("lock");
        let team = teams
            .get_mut(team_id)
            .ok_or_else(|| RepositoryError::NotFound(team_id.to_string()))?;
        team.apply(patch)?;
        Ok(team.clone())
    }

    async fn delete(&self, team_id: &str) -> Result<(), RepositoryError> {
        self.teams.lock().expect("lock").remove(team_id);
        Ok(())
    }
}
