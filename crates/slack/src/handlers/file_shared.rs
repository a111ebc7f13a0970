use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use hindsight_core::budget::TextBudgeter;
use hindsight_core::classify::is_pdf_file;
use hindsight_core::normalize::{pdf_documents, plain_text_documents};
use hindsight_core::payload::FileShareContext;
use hindsight_db::repositories::TeamRepository;
use hindsight_index::{IndexGateway, VectorIndexEngine};

use crate::client::SlackApi;
use crate::dispatch::{EventHandler, EventHandlerError};
use crate::events::{EventCallback, SlackEvent, SlackEventType};

/// Ingests shared files as paged documents.
///
/// Plain-text content comes inline from `files.info`; PDFs are downloaded
/// and text-extracted. Unsupported filetypes produce no documents and no
/// download.
pub struct FileSharedHandler {
    slack: Arc<dyn SlackApi>,
    teams: Arc<dyn TeamRepository>,
    engine: Arc<dyn VectorIndexEngine>,
}

impl FileSharedHandler {
    pub fn new(
        slack: Arc<dyn SlackApi>,
        teams: Arc<dyn TeamRepository>,
        engine: Arc<dyn VectorIndexEngine>,
    ) -> Self {
        Self { slack, teams, engine }
    }
}

#[async_trait]
impl EventHandler for FileSharedHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::FileShared
    }

    async fn handle(&self, callback: &EventCallback) -> Result<(), EventHandlerError> {
        let SlackEvent::FileShared(event) = &callback.event else {
            return Ok(());
        };

        let team = self.teams.get_or_create(&callback.team_id, &callback.bot_id).await?;
        let info = self.slack.files_info(&event.file_id).await?;
        let channel = self.slack.conversations_info(&event.channel_id).await?;

        let budgeter = TextBudgeter::new(&team.model)?;
        let gateway = IndexGateway::new(self.engine.clone(), &team.team_id, team.namespace_uuid);
        gateway.ensure_index().await?;

        let ctx = FileShareContext {
            team_id: callback.team_id.clone(),
            user_id: event.user_id.clone(),
            channel_id: event.channel_id.clone(),
            channel_type: channel.channel_type,
            event_ts: event.event_ts.clone(),
            event_time: callback.event_time,
        };

        let mut documents = Vec::new();
        if is_pdf_file(&info.file.filetype) {
            let bytes = self.slack.download_file(&info.file.url_private).await?;
            documents.extend(pdf_documents(&budgeter, &ctx, &info.file, &bytes)?);
        }
        documents.extend(plain_text_documents(
            &budgeter,
            &ctx,
            &info.file,
            info.content.as_deref().unwrap_or_default(),
        )?);

        gateway.add_documents(&documents).await?;
        info!(
            team_id = %team.team_id,
            file_id = %event.file_id,
            pages = documents.len(),
            "ingested shared file"
        );
        Ok(())
    }
}
