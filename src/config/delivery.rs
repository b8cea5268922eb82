//! Side-effect delivery and background maintenance configuration.

use serde::Deserialize;

use super::limits::DEFAULT_CHANNEL_CAPACITY;

/// How best-effort side effects are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Written before the triggering call returns; failures are logged.
    #[default]
    Inline,
    /// Queued to a worker task; a full queue drops the item.
    Background,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub delivery: Delivery,
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            delivery: Delivery::Inline,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub delivery: Delivery,
    pub channel_capacity: usize,
    /// Salt prepended to every origin before hashing.
    pub origin_salt: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            delivery: Delivery::Inline,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            origin_salt: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub enabled: bool,
    /// Seconds between full sweeps.
    pub interval_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}
