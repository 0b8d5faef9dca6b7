use std::sync::{Arc, Mutex};

use crate::date_key::{is_valid_hhmm, Clock, DateKey};
use crate::events::{EventSink, NoopSink, SessionComplete, StatePayload};
use crate::integrator::{integrate, Integration};
use crate::models::{sort_todos, DailyData, ScheduleItem, TimerConfig, TodoItem};
use crate::records::DailyRecordStore;
use crate::settings::SettingsStore;
use crate::stats::{daily_summary, weekly_overview, DailySummary, DayFocus};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("{0} is read-only, only today can be edited")]
    ReadOnly(DateKey),
    #[error("text must not be empty")]
    EmptyText,
    #[error("invalid time {0:?}, expected HH:mm")]
    InvalidTime(String),
    #[error("no item with id {0}")]
    NotFound(String),
}

/// Default slot offered when the user picks an hour on the timeline.
pub fn hour_slot(hour: u32) -> (String, String) {
    let hour = hour.min(23);
    // The last slot ends at 24:00 in the timeline; keep it a valid HH:mm.
    let end = if hour == 23 {
        "23:59".to_string()
    } else {
        format!("{:02}:00", hour + 1)
    };
    (format!("{hour:02}:00"), end)
}

/// The displayed day and timer config, backed by the injected stores.
///
/// Every accepted mutation is persisted immediately and announced through
/// the [`EventSink`].
pub struct AppState<S, C> {
    records: DailyRecordStore<S>,
    settings: SettingsStore<S>,
    clock: C,
    sink: Arc<dyn EventSink>,
    inner: Mutex<AppData>,
}

#[derive(Debug)]
struct AppData {
    daily: DailyData,
    config: TimerConfig,
}

impl<S: KeyValueStore, C: Clock> AppState<S, C> {
    pub fn new(store: Arc<S>, clock: C) -> Self {
        let records = DailyRecordStore::new(store.clone());
        let settings = SettingsStore::new(store);
        let daily = records.load(&clock.today());
        let config = settings.load();
        Self {
            records,
            settings,
            clock,
            sink: Arc::new(NoopSink),
            inner: Mutex::new(AppData { daily, config }),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn records(&self) -> &DailyRecordStore<S> {
        &self.records
    }

    pub fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    pub fn current_date(&self) -> DateKey {
        self.inner.lock().expect("state poisoned").daily.date
    }

    pub fn daily(&self) -> DailyData {
        self.inner.lock().expect("state poisoned").daily.clone()
    }

    pub fn config(&self) -> TimerConfig {
        self.inner.lock().expect("state poisoned").config
    }

    pub fn is_read_only(&self) -> bool {
        self.current_date() != self.clock.today()
    }

    pub fn payload(&self) -> StatePayload {
        let guard = self.inner.lock().expect("state poisoned");
        StatePayload {
            current_date: guard.daily.date,
            daily: guard.daily.clone(),
            config: guard.config,
        }
    }

    fn publish(&self) {
        self.sink.state_updated(&self.payload());
    }

    pub fn select_date(&self, date: DateKey) {
        let daily = self.records.load(&date);
        self.inner.lock().expect("state poisoned").daily = daily;
        self.publish();
    }

    pub fn shift_date(&self, days: i64) -> DateKey {
        let next = self.current_date().add_days(days);
        self.select_date(next);
        next
    }

    pub fn go_to_today(&self) -> DateKey {
        let today = self.clock.today();
        self.select_date(today);
        today
    }

    /// Re-reads the displayed day and the timer config, e.g. after an import.
    pub fn reload(&self) {
        let date = self.current_date();
        let daily = self.records.load(&date);
        let config = self.settings.load();
        {
            let mut guard = self.inner.lock().expect("state poisoned");
            guard.daily = daily;
            guard.config = config;
        }
        log::info!("state reloaded date={date}");
        self.publish();
    }

    fn edit<T>(&self, apply: impl FnOnce(&mut DailyData) -> Result<T, EditError>) -> Result<T, EditError> {
        let today = self.clock.today();
        let snapshot = {
            let mut guard = self.inner.lock().expect("state poisoned");
            if guard.daily.date != today {
                return Err(EditError::ReadOnly(guard.daily.date));
            }
            let value = apply(&mut guard.daily)?;
            (value, guard.daily.clone())
        };
        self.records.save(&snapshot.1);
        self.publish();
        Ok(snapshot.0)
    }

    pub fn add_schedule_item(
        &self,
        start_time: &str,
        end_time: &str,
        title: &str,
    ) -> Result<ScheduleItem, EditError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EditError::EmptyText);
        }
        for time in [start_time, end_time] {
            if !is_valid_hhmm(time) {
                return Err(EditError::InvalidTime(time.to_string()));
            }
        }
        let item = ScheduleItem::manual(start_time, end_time, title);
        self.edit(|daily| {
            daily.schedule.push(item.clone());
            Ok(item)
        })
    }

    pub fn remove_schedule_item(&self, id: &str) -> Result<(), EditError> {
        self.edit(|daily| {
            let before = daily.schedule.len();
            daily.schedule.retain(|item| item.id != id);
            if daily.schedule.len() == before {
                return Err(EditError::NotFound(id.to_string()));
            }
            Ok(())
        })
    }

    /// New todos go to the top of the list.
    pub fn add_todo(&self, text: &str) -> Result<TodoItem, EditError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EditError::EmptyText);
        }
        let item = TodoItem::new(text);
        self.edit(|daily| {
            daily.todos.insert(0, item.clone());
            Ok(item)
        })
    }

    pub fn toggle_todo(&self, id: &str) -> Result<TodoItem, EditError> {
        self.edit(|daily| {
            let todo = daily
                .todos
                .iter_mut()
                .find(|todo| todo.id == id)
                .ok_or_else(|| EditError::NotFound(id.to_string()))?;
            todo.completed = !todo.completed;
            let toggled = todo.clone();
            sort_todos(&mut daily.todos);
            Ok(toggled)
        })
    }

    pub fn delete_todo(&self, id: &str) -> Result<(), EditError> {
        self.edit(|daily| {
            let before = daily.todos.len();
            daily.todos.retain(|todo| todo.id != id);
            if daily.todos.len() == before {
                return Err(EditError::NotFound(id.to_string()));
            }
            Ok(())
        })
    }

    /// Caller validates `config` (see [`crate::settings::SettingsDraft`]).
    pub fn update_config(&self, config: TimerConfig) -> bool {
        let saved = self.settings.save(&config);
        self.inner.lock().expect("state poisoned").config = config;
        self.publish();
        saved
    }

    /// Forwarded from the timer; not subject to the read-only rule.
    pub fn record_session(&self, event: &SessionComplete) -> Integration {
        let now = self.clock.now();
        let (outcome, displayed) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let outcome = integrate(&mut guard.daily, &self.records, event, &now);
            (outcome, guard.daily.clone())
        };
        if let Integration::Displayed(_) = outcome {
            self.records.save(&displayed);
            self.publish();
        }
        outcome
    }

    pub fn summary(&self) -> DailySummary {
        daily_summary(&self.daily())
    }

    pub fn weekly(&self) -> Vec<DayFocus> {
        weekly_overview(&self.records, self.clock.today(), &self.daily())
    }
}
