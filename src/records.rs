use std::collections::BTreeSet;
use std::sync::Arc;

use crate::date_key::DateKey;
use crate::models::DailyData;
use crate::storage::{KeyValueStore, StorageError};

pub const STORAGE_PREFIX: &str = "plan_focus_data_";

pub fn record_key(date: &DateKey) -> String {
    format!("{STORAGE_PREFIX}{date}")
}

/// Per-day records over the shared key space.
pub struct DailyRecordStore<S> {
    store: Arc<S>,
}

impl<S> Clone for DailyRecordStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> DailyRecordStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Never fails: missing, unreadable or corrupt records come back empty.
    pub fn load(&self, date: &DateKey) -> DailyData {
        let key = record_key(date);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return DailyData::empty(*date),
            Err(error) => {
                log::error!("failed to read daily record key={key} error={error}");
                return DailyData::empty(*date);
            }
        };
        match serde_json::from_str::<DailyData>(&raw) {
            Ok(mut data) => {
                if data.date != *date {
                    log::warn!(
                        "daily record date mismatch key={key} stored_date={}, using key",
                        data.date
                    );
                    data.date = *date;
                }
                log::debug!("daily record loaded key={key}");
                data
            }
            Err(error) => {
                log::warn!("corrupt daily record key={key} error={error}");
                DailyData::empty(*date)
            }
        }
    }

    pub fn try_save(&self, data: &DailyData) -> Result<(), StorageError> {
        let json = serde_json::to_string(data)?;
        self.store.set(&record_key(&data.date), &json)
    }

    /// Writes `data` verbatim; failures are logged and the write is abandoned.
    pub fn save(&self, data: &DailyData) -> bool {
        match self.try_save(data) {
            Ok(()) => {
                log::debug!("daily record saved date={}", data.date);
                true
            }
            Err(error) => {
                log::error!("failed to save daily record date={} error={error}", data.date);
                false
            }
        }
    }

    /// Days whose stored record has any focus time, schedule item or todo.
    ///
    /// The stored `date` field is authoritative; a record that cannot be
    /// parsed is skipped.
    pub fn list_active_dates(&self) -> BTreeSet<DateKey> {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(error) => {
                log::error!("failed to list storage keys error={error}");
                return BTreeSet::new();
            }
        };
        keys.iter()
            .filter(|key| key.starts_with(STORAGE_PREFIX))
            .filter_map(|key| self.store.get(key).ok().flatten())
            .filter_map(|raw| serde_json::from_str::<DailyData>(&raw).ok())
            .filter(DailyData::has_content)
            .map(|data| data.date)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScheduleItem, TodoItem};
    use crate::storage::{FileStore, MemoryStore};

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    fn make_store() -> (Arc<MemoryStore>, DailyRecordStore<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), DailyRecordStore::new(kv))
    }

    #[test]
    fn load_of_never_written_day_is_empty() {
        let (_, records) = make_store();
        let data = records.load(&key("2024-05-01"));
        assert_eq!(data, DailyData::empty(key("2024-05-01")));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let records = DailyRecordStore::new(Arc::new(FileStore::open(dir.path().to_path_buf()).unwrap()));
        let mut data = DailyData::empty(key("2024-05-01"));
        data.schedule.push(ScheduleItem::manual("10:00", "09:00", "backwards is allowed"));
        data.todos.push(TodoItem::new("write report"));
        data.focus_minutes = 75;

        assert!(records.save(&data));
        assert_eq!(records.load(&key("2024-05-01")), data);
    }

    #[test]
    fn save_does_not_reorder_todos() {
        let (_, records) = make_store();
        let mut data = DailyData::empty(key("2024-05-01"));
        let mut done = TodoItem::new("done");
        done.completed = true;
        data.todos = vec![done, TodoItem::new("open")];
        records.save(&data);
        let loaded = records.load(&key("2024-05-01"));
        assert!(loaded.todos[0].completed);
    }

    #[test]
    fn corrupt_record_falls_back_to_empty() {
        let (kv, records) = make_store();
        kv.set("plan_focus_data_2024-05-01", "{ not json").unwrap();
        assert_eq!(
            records.load(&key("2024-05-01")),
            DailyData::empty(key("2024-05-01"))
        );
    }

    #[test]
    fn legacy_record_is_patched_on_load() {
        let (kv, records) = make_store();
        kv.set(
            "plan_focus_data_2024-05-01",
            r#"{"date":"2024-05-01","focusMinutes":25}"#,
        )
        .unwrap();
        let data = records.load(&key("2024-05-01"));
        assert_eq!(data.focus_minutes, 25);
        assert!(data.schedule.is_empty());
        assert!(data.todos.is_empty());
    }

    #[test]
    fn null_lists_keep_focus_and_todos() {
        let (kv, records) = make_store();
        kv.set(
            "plan_focus_data_2024-05-01",
            r#"{"date":"2024-05-01","schedule":null,"todos":[{"id":"t1","text":"call","completed":false}],"focusMinutes":50}"#,
        )
        .unwrap();
        let data = records.load(&key("2024-05-01"));
        assert_eq!(data.focus_minutes, 50);
        assert!(data.schedule.is_empty());
        assert_eq!(data.todos.len(), 1);

        kv.set(
            "plan_focus_data_2024-05-02",
            r#"{"date":"2024-05-02","schedule":[],"todos":null,"focusMinutes":25}"#,
        )
        .unwrap();
        let active: Vec<String> = records
            .list_active_dates()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(active, vec!["2024-05-01", "2024-05-02"]);
    }

    #[test]
    fn load_takes_the_date_from_the_key() {
        let (kv, records) = make_store();
        kv.set(
            "plan_focus_data_2024-05-01",
            r#"{"date":"2024-05-02","schedule":[],"todos":[],"focusMinutes":30}"#,
        )
        .unwrap();
        let data = records.load(&key("2024-05-01"));
        assert_eq!(data.date, key("2024-05-01"));
        assert_eq!(data.focus_minutes, 30);

        records.save(&data);
        assert!(kv.get("plan_focus_data_2024-05-02").unwrap().is_none());
    }

    #[test]
    fn save_failure_is_reported_not_raised() {
        let records = DailyRecordStore::new(Arc::new(MemoryStore::with_quota(8)));
        let data = DailyData::empty(key("2024-05-01"));
        assert!(!records.save(&data));
        assert!(matches!(
            records.try_save(&data),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(records.load(&key("2024-05-01")), data);
    }

    #[test]
    fn list_active_dates_skips_empty_and_foreign_keys() {
        let (kv, records) = make_store();
        let mut focused = DailyData::empty(key("2024-05-01"));
        focused.focus_minutes = 25;
        let mut scheduled = DailyData::empty(key("2024-05-02"));
        scheduled.schedule.push(ScheduleItem::manual("09:00", "10:00", "standup"));
        let mut todo_only = DailyData::empty(key("2024-05-03"));
        todo_only.todos.push(TodoItem::new("call"));
        records.save(&focused);
        records.save(&scheduled);
        records.save(&todo_only);
        records.save(&DailyData::empty(key("2024-05-04")));
        kv.set("plan_focus_data_2024-05-05", "garbage").unwrap();
        kv.set("plan_focus_data_2024-05-06", r#"{"focusMinutes":10}"#).unwrap();
        kv.set("unrelated_2024-05-07", r#"{"date":"2024-05-07","focusMinutes":10}"#)
            .unwrap();

        let active: Vec<String> = records
            .list_active_dates()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(active, vec!["2024-05-01", "2024-05-02", "2024-05-03"]);
    }
}
