use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use hindsight_agent::{AppMentionHandler, ChatModelError, OpenAiChatModel};
use hindsight_core::config::{AppConfig, ConfigError, LoadOptions};
use hindsight_db::{connect_with_settings, migrations, DbPool, SqlTeamRepository, TeamRepository};
use hindsight_index::{IndexError, VectorIndexEngine, WeaviateEngine};
use hindsight_slack::handlers::{
    AppUninstalledHandler, ChannelDeletedHandler, FileDeletedHandler, FileSharedHandler,
    MessageHandler,
};
use hindsight_slack::{EventDispatcher, HttpSlackClient, SlackApi, SlackApiError, TaskGroup};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub dispatcher: Arc<EventDispatcher>,
    pub tasks: Arc<TaskGroup>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("slack client initialization failed: {0}")]
    Slack(#[source] SlackApiError),
    #[error("vector index client initialization failed: {0}")]
    Index(#[source] IndexError),
    #[error("chat model client initialization failed: {0}")]
    ChatModel(#[source] ChatModelError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!("starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!("database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!("database migrations applied");

    let slack: Arc<dyn SlackApi> = Arc::new(
        HttpSlackClient::new(config.slack.bot_token.clone()).map_err(BootstrapError::Slack)?,
    );
    let engine: Arc<dyn VectorIndexEngine> = Arc::new(
        WeaviateEngine::new(&config.vector.url, config.vector.timeout_secs)
            .map_err(BootstrapError::Index)?,
    );
    let model = Arc::new(
        OpenAiChatModel::new(config.openai.api_key.clone(), config.openai.timeout_secs)
            .map_err(BootstrapError::ChatModel)?,
    );
    let teams: Arc<dyn TeamRepository> = Arc::new(SqlTeamRepository::new(db_pool.clone()));

    let tasks = Arc::new(TaskGroup::new());
    let mut dispatcher = EventDispatcher::new(tasks.clone());
    dispatcher.register(MessageHandler::new(slack.clone(), teams.clone(), engine.clone()));
    dispatcher.register(FileSharedHandler::new(slack.clone(), teams.clone(), engine.clone()));
    dispatcher.register(FileDeletedHandler::new(teams.clone(), engine.clone()));
    dispatcher.register(ChannelDeletedHandler::new(teams.clone(), engine.clone()));
    dispatcher.register(AppUninstalledHandler::new(teams.clone(), engine.clone()));
    dispatcher.register(AppMentionHandler::new(slack, teams, engine, model));
    info!(handlers = dispatcher.handler_count(), "event handlers registered");

    Ok(Application { config, db_pool, dispatcher: Arc::new(dispatcher), tasks })
}
