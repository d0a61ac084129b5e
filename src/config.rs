use std::time::Duration;

use serde::Deserialize;
use time::UtcOffset;

use crate::{notifier::DeliveryPacing, utils::formatting::parse_offset};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub discord_bot_token: String,
    pub database_url: String,
    pub register_commands_globally: Option<bool>,
    pub register_commands_in_guilds: Option<Vec<u64>>,
    /// Offset of the event wall clock, like `+03:00`. UTC if not set.
    pub event_utc_offset: Option<String>,
    pub reminder_delivery_delay_ms: Option<u64>,
    pub reminder_delivery_timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn event_zone(&self) -> Result<UtcOffset, anyhow::Error> {
        match &self.event_utc_offset {
            Some(offset) => parse_offset(offset.trim())
                .map_err(|err| anyhow::anyhow!("Invalid EVENT_UTC_OFFSET `{offset}`: {err}")),
            None => Ok(UtcOffset::UTC),
        }
    }

    pub fn delivery_pacing(&self) -> DeliveryPacing {
        let defaults = DeliveryPacing::default();

        DeliveryPacing {
            delay: self
                .reminder_delivery_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
            timeout: self
                .reminder_delivery_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}
