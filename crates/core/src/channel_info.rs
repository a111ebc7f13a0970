//! Per-channel configuration overrides.
//!
//! Members tune the bot per channel by writing emoji-tagged lines into the
//! channel topic or description, e.g. `:thermometer: 0.2`. The topic wins
//! over the description; a missing tag falls back to the stored team value.

use std::sync::OnceLock;

use regex::Regex;

use crate::team::{validate_temperature, validate_timezone_offset, ConfigValidationError};

pub const TEMPERATURE_EMOJI: &str = ":thermometer:";
pub const TIMEZONE_EMOJI: &str = ":round_pushpin:";
pub const CONTEXT_EMOJI: &str = ":speech_balloon:";

/// Overrides parsed from one channel's topic and description.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelOverrides {
    pub temperature: Option<f64>,
    pub timezone_offset: Option<String>,
    pub context: Option<String>,
}

/// Parses topic/description text into validated overrides.
pub struct ChannelInfoParser<'a> {
    topic: &'a str,
    description: &'a str,
}

impl<'a> ChannelInfoParser<'a> {
    pub fn new(topic: &'a str, description: &'a str) -> Self {
        Self { topic, description }
    }

    pub fn parse(&self) -> Result<ChannelOverrides, ConfigValidationError> {
        Ok(ChannelOverrides {
            temperature: self.parse_temperature()?,
            timezone_offset: self.parse_timezone_offset()?,
            context: self.tagged_text(CONTEXT_EMOJI),
        })
    }

    fn parse_temperature(&self) -> Result<Option<f64>, ConfigValidationError> {
        let Some(raw) = self.tagged_text(TEMPERATURE_EMOJI) else {
            return Ok(None);
        };
        let temperature = raw
            .parse::<f64>()
            .map_err(|_| ConfigValidationError::TemperatureRange(raw))?;
        validate_temperature(temperature)?;
        Ok(Some(temperature))
    }

    fn parse_timezone_offset(&self) -> Result<Option<String>, ConfigValidationError> {
        let Some(raw) = self.tagged_text(TIMEZONE_EMOJI) else {
            return Ok(None);
        };
        validate_timezone_offset(&raw)?;
        Ok(Some(raw))
    }

    /// Text following `emoji` at a line start, up to the next tagged line.
    /// The topic is consulted first, then the description.
    fn tagged_text(&self, emoji: &str) -> Option<String> {
        extract_tagged_text(self.topic, emoji)
            .or_else(|| extract_tagged_text(self.description, emoji))
    }
}

fn extract_tagged_text(text: &str, emoji: &str) -> Option<String> {
    let start = if let Some(rest) = text.strip_prefix(emoji) {
        Some(rest)
    } else {
        text.find(&format!("\n{emoji}"))
            .map(|at| &text[at + 1 + emoji.len()..])
    }?;
    let end = next_tag_pattern()
        .find(start)
        .map_or(start.len(), |m| m.start());
    let extracted = start[..end].trim();
    if extracted.is_empty() {
        None
    } else {
        Some(extracted.to_string())
    }
}

fn next_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n:[^\s:]+:").expect("valid pattern"))
}
