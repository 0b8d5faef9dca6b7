use serde::{Deserialize, Deserializer, Serialize};

use crate::date_key::DateKey;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Manual,
    /// Produced only by the session integrator.
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: String,
    /// `HH:mm`, local wall-clock. Not required to precede `end_time`.
    pub start_time: String,
    pub end_time: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ScheduleKind,
}

impl ScheduleItem {
    pub fn manual(start_time: &str, end_time: &str, title: &str) -> Self {
        Self {
            id: new_id(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            title: title.to_string(),
            kind: ScheduleKind::Manual,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

impl TodoItem {
    pub fn new(text: &str) -> Self {
        Self {
            id: new_id(),
            text: text.to_string(),
            completed: false,
        }
    }
}

/// Stable partition: incomplete items keep their relative order ahead of completed ones.
pub fn sort_todos(todos: &mut [TodoItem]) {
    todos.sort_by_key(|todo| todo.completed);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyData {
    pub date: DateKey,
    // Records written before the timeline and todo list existed lack these,
    // or carry them as null.
    #[serde(default, deserialize_with = "null_as_default")]
    pub schedule: Vec<ScheduleItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub todos: Vec<TodoItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub focus_minutes: u32,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl DailyData {
    pub fn empty(date: DateKey) -> Self {
        Self {
            date,
            schedule: Vec::new(),
            todos: Vec::new(),
            focus_minutes: 0,
        }
    }

    /// Whether the calendar should mark this day.
    pub fn has_content(&self) -> bool {
        self.focus_minutes > 0 || !self.schedule.is_empty() || !self.todos.is_empty()
    }

    pub fn pending_todos(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.completed).count()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimerMode {
    #[serde(rename = "work")]
    Work,
    #[serde(rename = "short")]
    ShortBreak,
    #[serde(rename = "long")]
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [TimerMode::Work, TimerMode::ShortBreak, TimerMode::LongBreak];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::ShortBreak => "short",
            TimerMode::LongBreak => "long",
        }
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "work" => Ok(TimerMode::Work),
            "short" => Ok(TimerMode::ShortBreak),
            "long" => Ok(TimerMode::LongBreak),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

/// Durations in whole minutes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerConfig {
    pub work: u32,
    pub short: u32,
    pub long: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work: 25,
            short: 5,
            long: 15,
        }
    }
}

impl TimerConfig {
    pub fn minutes(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work,
            TimerMode::ShortBreak => self.short,
            TimerMode::LongBreak => self.long,
        }
    }

    pub fn set_minutes(&mut self, mode: TimerMode, minutes: u32) {
        match mode {
            TimerMode::Work => self.work = minutes,
            TimerMode::ShortBreak => self.short = minutes,
            TimerMode::LongBreak => self.long = minutes,
        }
    }

    pub fn is_valid(&self) -> bool {
        TimerMode::ALL.iter().all(|mode| self.minutes(*mode) > 0)
    }
}
