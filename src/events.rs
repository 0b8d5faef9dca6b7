use crate::date_key::DateKey;
use crate::models::{DailyData, TimerConfig, TimerMode};

/// Emitted once per natural completion of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionComplete {
    pub duration_minutes: u32,
    pub mode: TimerMode,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub current_date: DateKey,
    pub daily: DailyData,
    pub config: TimerConfig,
}

/// Where the application state announces re-render points.
pub trait EventSink: Send + Sync {
    fn state_updated(&self, payload: &StatePayload);
}

#[derive(Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn state_updated(&self, _payload: &StatePayload) {}
}
