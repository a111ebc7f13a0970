use thiserror::Error;

use hindsight_core::budget::BudgetError;
use hindsight_core::document::TimestampError;
use hindsight_core::team::ConfigValidationError;
use hindsight_db::RepositoryError;
use hindsight_index::IndexError;
use hindsight_slack::{replies, SlackApiError};

use crate::llm::ChatModelError;

/// Everything that can go wrong while answering a mention.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Chat(#[from] ChatModelError),
    #[error(transparent)]
    Config(#[from] ConfigValidationError),
    #[error(transparent)]
    Slack(#[from] SlackApiError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// The apology posted into the thread for each failure category. The text
/// tells the member what they can fix; everything else stays generic.
pub fn apology_for(error: &AgentError) -> String {
    match error {
        AgentError::Config(ConfigValidationError::TemperatureRange(_)) => {
            replies::temperature_apology()
        }
        AgentError::Config(ConfigValidationError::TimezoneOffsetSelect(_)) => {
            replies::timezone_apology()
        }
        AgentError::Chat(ChatModelError::InvalidRequest(_)) => replies::TOO_LARGE_APOLOGY.into(),
        AgentError::Chat(_) => replies::OPENAI_APOLOGY.into(),
        AgentError::Slack(_) => replies::PERMISSIONS_APOLOGY.into(),
        _ => replies::GENERIC_APOLOGY.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_category_gets_its_own_apology() {
        let temperature = AgentError::Config(ConfigValidationError::TemperatureRange("5".into()));
        assert!(apology_for(&temperature).contains(":thermometer:"));

        let timezone =
            AgentError::Config(ConfigValidationError::TimezoneOffsetSelect("+99:00".into()));
        assert!(apology_for(&timezone).contains(":round_pushpin:"));

        let too_large = AgentError::Chat(ChatModelError::InvalidRequest("too long".into()));
        assert!(apology_for(&too_large).contains("too large"));

        let quota = AgentError::Chat(ChatModelError::Quota("quota".into()));
        assert!(apology_for(&quota).contains("OpenAI API key"));

        let slack = AgentError::Slack(SlackApiError::Download(403));
        assert!(apology_for(&slack).contains("permissions"));

        let other = AgentError::Config(ConfigValidationError::ContextLength(999));
        assert_eq!(apology_for(&other), replies::GENERIC_APOLOGY);
    }
}
