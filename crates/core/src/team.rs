//! Per-workspace configuration.
//!
//! One `SlackTeam` row exists per installed workspace, created lazily on the
//! first event. Every field is validated on write; writes are all-or-nothing.

use thiserror::Error;
use uuid::Uuid;

/// Chat models a workspace may select.
pub const MODELS: &[&str] = &["gpt-3.5-turbo"];

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_TIMEZONE_OFFSET: &str = "+00:00";

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MAX_CONTEXT_LENGTH: usize = 256;

pub const DEFAULT_CONTEXT: &str = "Assistant is designed to be able to assist with a wide \
range of tasks, from answering simple questions to providing in-depth explanations and \
discussions on a wide range of topics.";

/// UTC offsets selectable as a workspace timezone, whole and half hours.
pub const TIMEZONE_OFFSETS: &[&str] = &[
    "-11:00", "-10:00", "-09:30", "-09:00", "-08:00", "-07:00", "-06:00", "-05:00", "-04:00",
    "-03:30", "-03:00", "-02:00", "-01:00", "+00:00", "+01:00", "+02:00", "+03:00", "+03:30",
    "+04:00", "+04:30", "+05:00", "+05:30", "+06:00", "+06:30", "+07:00", "+08:00", "+09:00",
    "+09:30", "+10:00", "+10:30", "+11:00", "+12:00", "+13:00", "+14:00",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("model `{0}` is not available")]
    ModelSelect(String),
    #[error("temperature {0} is out of range {MIN_TEMPERATURE} - {MAX_TEMPERATURE}")]
    TemperatureRange(String),
    #[error("timezone offset `{0}` is not available")]
    TimezoneOffsetSelect(String),
    #[error("context is {0} characters, maximum is {MAX_CONTEXT_LENGTH}")]
    ContextLength(usize),
}

/// Stored configuration for one Slack workspace.
#[derive(Clone, Debug, PartialEq)]
pub struct SlackTeam {
    pub id: i64,
    pub team_id: String,
    pub bot_id: String,
    /// Stable namespace for the team's deterministic document ids.
    pub namespace_uuid: Uuid,
    pub model: String,
    pub temperature: f64,
    pub context: String,
    pub timezone_offset: String,
}

impl SlackTeam {
    /// A fresh team with defaults and a random, thereafter stable namespace.
    pub fn new(team_id: &str, bot_id: &str) -> Self {
        Self {
            id: 0,
            team_id: team_id.to_string(),
            bot_id: bot_id.to_string(),
            namespace_uuid: Uuid::new_v4(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            context: DEFAULT_CONTEXT.to_string(),
            timezone_offset: DEFAULT_TIMEZONE_OFFSET.to_string(),
        }
    }

    /// The team's index collection name.
    pub fn index_name(&self) -> String {
        format!("Message{}", self.team_id)
    }

    /// Validates the whole patch, then applies it. Nothing changes on error.
    pub fn apply(&mut self, patch: &TeamSettingsPatch) -> Result<(), ConfigValidationError> {
        patch.validate()?;
        if let Some(model) = &patch.model {
            self.model = model.clone();
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = temperature;
        }
        if let Some(context) = &patch.context {
            self.context = context.clone();
        }
        if let Some(timezone_offset) = &patch.timezone_offset {
            self.timezone_offset = timezone_offset.clone();
        }
        Ok(())
    }
}

/// A partial settings update; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TeamSettingsPatch {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub context: Option<String>,
    pub timezone_offset: Option<String>,
}

impl TeamSettingsPatch {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(model) = &self.model {
            validate_model(model)?;
        }
        if let Some(temperature) = self.temperature {
            validate_temperature(temperature)?;
        }
        if let Some(context) = &self.context {
            validate_context(context)?;
        }
        if let Some(timezone_offset) = &self.timezone_offset {
            validate_timezone_offset(timezone_offset)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn validate_model(model: &str) -> Result<(), ConfigValidationError> {
    if MODELS.contains(&model) {
        Ok(())
    } else {
        Err(ConfigValidationError::ModelSelect(model.to_string()))
    }
}

pub fn validate_temperature(temperature: f64) -> Result<(), ConfigValidationError> {
    if (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        Ok(())
    } else {
        Err(ConfigValidationError::TemperatureRange(
            temperature.to_string(),
        ))
    }
}

pub fn validate_context(context: &str) -> Result<(), ConfigValidationError> {
    let length = context.chars().count();
    if length <= MAX_CONTEXT_LENGTH {
        Ok(())
    } else {
        Err(ConfigValidationError::ContextLength(length))
    }
}

pub fn validate_timezone_offset(offset: &str) -> Result<(), ConfigValidationError> {
    if TIMEZONE_OFFSETS.contains(&offset) {
        Ok(())
    } else {
        Err(ConfigValidationError::TimezoneOffsetSelect(
            offset.to_string(),
        ))
    }
}
