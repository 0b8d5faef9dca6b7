//! Turns completed focus sessions into timeline entries and focus minutes.
//!
//! The session is credited to the calendar day on which it *completed*. When
//! that is the day on screen, the in-memory record is updated and the caller
//! persists it as part of its normal autosave. When it is some other day (the
//! app was left open across midnight, or the user is browsing history), the
//! target day is loaded, updated and saved directly, and the on-screen record
//! is left untouched.

use chrono::{DateTime, Duration, TimeZone};

use crate::date_key::{to_date_key, to_hhmm, DateKey};
use crate::events::SessionComplete;
use crate::models::{new_id, DailyData, ScheduleItem, ScheduleKind, TimerMode};
use crate::records::DailyRecordStore;
use crate::storage::KeyValueStore;

pub const AUTO_ITEM_TITLE: &str = "Focus";

const DAY_START: &str = "00:00";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Integration {
    /// Break sessions have no schedule or stats effect.
    Ignored,
    /// Applied to the in-memory displayed record; caller must persist it.
    Displayed(ScheduleItem),
    /// Applied to another day's stored record.
    Stored { date: DateKey, item: ScheduleItem, saved: bool },
}

/// Auto item for a session of `duration_minutes` ending at `end`.
///
/// A session that started before midnight is clamped to begin at `00:00` of
/// the completion day, so the block never renders with its start after its end.
pub fn auto_item<Tz: TimeZone>(duration_minutes: u32, end: &DateTime<Tz>) -> ScheduleItem {
    let start = end.clone() - Duration::minutes(i64::from(duration_minutes));
    let start_time = if to_date_key(&start) < to_date_key(end) {
        DAY_START.to_string()
    } else {
        to_hhmm(&start)
    };
    ScheduleItem {
        id: new_id(),
        start_time,
        end_time: to_hhmm(end),
        title: AUTO_ITEM_TITLE.to_string(),
        kind: ScheduleKind::Auto,
    }
}

fn credit(data: &mut DailyData, item: ScheduleItem, duration_minutes: u32) {
    data.focus_minutes = data.focus_minutes.saturating_add(duration_minutes);
    data.schedule.push(item);
}

pub fn integrate<S, Tz>(
    displayed: &mut DailyData,
    records: &DailyRecordStore<S>,
    event: &SessionComplete,
    now: &DateTime<Tz>,
) -> Integration
where
    S: KeyValueStore,
    Tz: TimeZone,
{
    if event.mode != TimerMode::Work {
        log::debug!("break session ignored mode={}", event.mode);
        return Integration::Ignored;
    }
    let item = auto_item(event.duration_minutes, now);
    let target = to_date_key(now);

    if target == displayed.date {
        credit(displayed, item.clone(), event.duration_minutes);
        log::info!(
            "focus session recorded date={target} minutes={} (displayed)",
            event.duration_minutes
        );
        return Integration::Displayed(item);
    }

    let mut data = records.load(&target);
    credit(&mut data, item.clone(), event.duration_minutes);
    let saved = records.save(&data);
    log::info!(
        "focus session recorded date={target} minutes={} displayed={} saved={saved}",
        event.duration_minutes,
        displayed.date
    );
    Integration::Stored {
        date: target,
        item,
        saved,
    }
}
