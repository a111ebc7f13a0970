//! Canned user-facing replies.

use hindsight_core::team::{MAX_TEMPERATURE, MIN_TEMPERATURE, TIMEZONE_OFFSETS};

pub const CONFIGURATION_SET: &str = "Configuration is set for this channel.";

pub const GENERIC_APOLOGY: &str = "I'm sorry, something went wrong.";

pub const PERMISSIONS_APOLOGY: &str =
    "I'm sorry, something went wrong. Please ensure the bot has the correct permissions.";

pub const TOO_LARGE_APOLOGY: &str = "I'm sorry, something went wrong. Your message might be \
    too large. Please try reducing the size and send it again.";

pub const OPENAI_APOLOGY: &str = "I'm sorry, something went wrong. Please ensure that your \
    OpenAI API key is valid and you have enough quota.";

pub fn temperature_apology() -> String {
    format!(
        "I'm sorry, something went wrong. Please ensure the AI temperature \
         :thermometer:  of this channel is in range {MIN_TEMPERATURE} - {MAX_TEMPERATURE}."
    )
}

pub fn timezone_apology() -> String {
    format!(
        "I'm sorry, something went wrong. Please ensure the timezone offset \
         :round_pushpin:  of this channel is one of {}.",
        TIMEZONE_OFFSETS.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_apology_names_the_range() {
        let apology = temperature_apology();
        assert!(apology.contains(":thermometer:"));
        assert!(apology.contains("0 - 2"));
    }

    #[test]
    fn timezone_apology_lists_every_offset() {
        let apology = timezone_apology();
        assert!(apology.contains("+00:00"));
        assert!(apology.contains("-11:00"));
        assert!(apology.contains("+14:00"));
    }
}
