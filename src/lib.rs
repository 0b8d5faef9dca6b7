//! Plan & Focus core: per-day records, timer config, backups, the focus
//! countdown and the glue that turns finished focus sessions into timeline
//! entries.
pub mod backup;
pub mod date_key;
pub mod events;
pub mod integrator;
pub mod logging;
pub mod models;
pub mod records;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod stats;
pub mod storage;
pub mod timer;

pub use date_key::{to_date_key, Clock, DateKey, SystemClock};
pub use events::SessionComplete;
pub use models::{DailyData, ScheduleItem, ScheduleKind, TimerConfig, TimerMode, TodoItem};
pub use state::AppState;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
