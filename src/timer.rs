use crate::events::SessionComplete;
use crate::models::{TimerConfig, TimerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub status: TimerStatus,
    pub remaining_secs: u32,
    pub total_secs: u32,
}

impl TimerSnapshot {
    /// `MM:SS`; minutes are not wrapped at 60.
    pub fn remaining_display(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }

    /// Elapsed share of the armed countdown, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        f64::from(self.total_secs - self.remaining_secs.min(self.total_secs))
            / f64::from(self.total_secs)
    }
}

/// Countdown state machine. Knows nothing about wall-clock time; one call to
/// [`TimerEngine::tick`] is one elapsed second.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    config: TimerConfig,
    mode: TimerMode,
    status: TimerStatus,
    remaining_secs: u32,
    // Length the current countdown was armed with.
    armed_minutes: u32,
}

impl TimerEngine {
    pub fn new(config: TimerConfig) -> Self {
        let mut engine = Self {
            config,
            mode: TimerMode::Work,
            status: TimerStatus::Paused,
            remaining_secs: 0,
            armed_minutes: 0,
        };
        engine.arm();
        engine
    }

    fn arm(&mut self) {
        self.armed_minutes = self.config.minutes(self.mode);
        self.remaining_secs = self.armed_minutes.saturating_mul(60);
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            status: self.status,
            remaining_secs: self.remaining_secs,
            total_secs: self.armed_minutes.saturating_mul(60),
        }
    }

    /// Returns false when already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() || self.remaining_secs == 0 {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    pub fn reset(&mut self) {
        self.status = TimerStatus::Paused;
        self.arm();
    }

    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.reset();
    }

    /// A running countdown keeps its length; a paused one is re-armed.
    pub fn set_config(&mut self, config: TimerConfig) {
        self.config = config;
        if !self.is_running() {
            self.arm();
        }
    }

    pub fn tick(&mut self) -> Option<SessionComplete> {
        if !self.is_running() {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return None;
        }
        let event = SessionComplete {
            duration_minutes: self.armed_minutes,
            mode: self.mode,
        };
        self.status = TimerStatus::Paused;
        self.arm();
        log::info!(
            "timer completed mode={} minutes={}",
            event.mode,
            event.duration_minutes
        );
        Some(event)
    }
}
