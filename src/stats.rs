use chrono::Datelike;

use crate::date_key::DateKey;
use crate::models::DailyData;
use crate::records::DailyRecordStore;
use crate::storage::KeyValueStore;

const WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub focus_hours: u32,
    pub focus_remainder_minutes: u32,
    /// Timeline entries, manual and auto alike.
    pub schedule_items: usize,
    pub pending_todos: usize,
}

pub fn daily_summary(data: &DailyData) -> DailySummary {
    DailySummary {
        focus_hours: data.focus_minutes / 60,
        focus_remainder_minutes: data.focus_minutes % 60,
        schedule_items: data.schedule.len(),
        pending_todos: data.pending_todos(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayFocus {
    pub date: DateKey,
    pub label: String,
    pub minutes: u32,
    pub is_today: bool,
}

/// Focus minutes for the seven days ending `today`, oldest first.
///
/// The displayed record is used as-is for its own day so unsaved in-memory
/// changes show up immediately.
pub fn weekly_overview<S: KeyValueStore>(
    records: &DailyRecordStore<S>,
    today: DateKey,
    displayed: &DailyData,
) -> Vec<DayFocus> {
    (0..WEEK_DAYS)
        .rev()
        .map(|offset| {
            let date = today.add_days(-offset);
            let minutes = if date == displayed.date {
                displayed.focus_minutes
            } else {
                records.load(&date).focus_minutes
            };
            let label = if offset == 0 {
                "Today".to_string()
            } else {
                date.date().weekday().to_string()
            };
            DayFocus {
                date,
                label,
                minutes,
                is_today: offset == 0,
            }
        })
        .collect()
}

/// Bar height as a share of the busiest day, never dividing by zero.
pub fn bar_ratio(day: &DayFocus, week: &[DayFocus]) -> f64 {
    let max = week.iter().map(|d| d.minutes).max().unwrap_or(0).max(1);
    (f64::from(day.minutes) / f64::from(max)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    fn with_minutes(date: &str, minutes: u32) -> DailyData {
        let mut data = DailyData::empty(key(date));
        data.focus_minutes = minutes;
        data
    }

    #[test]
    fn summary_splits_hours_and_counts_items() {
        let mut data = with_minutes("2024-06-03", 135);
        data.schedule.push(crate::models::ScheduleItem::manual("09:00", "10:00", "a"));
        let mut done = crate::models::TodoItem::new("done");
        done.completed = true;
        data.todos = vec![crate::models::TodoItem::new("open"), done];

        let summary = daily_summary(&data);
        assert_eq!(summary.focus_hours, 2);
        assert_eq!(summary.focus_remainder_minutes, 15);
        assert_eq!(summary.schedule_items, 1);
        assert_eq!(summary.pending_todos, 1);
    }

    #[test]
    fn weekly_overview_covers_seven_days_ending_today() {
        let records = DailyRecordStore::new(Arc::new(MemoryStore::new()));
        records.save(&with_minutes("2024-05-28", 30));
        records.save(&with_minutes("2024-06-01", 60));
        // Stored value for the displayed day is stale; in-memory wins.
        records.save(&with_minutes("2024-06-02", 5));
        let displayed = with_minutes("2024-06-02", 45);

        let week = weekly_overview(&records, key("2024-06-03"), &displayed);
        let dates: Vec<String> = week.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(
            dates,
            vec![
                "2024-05-28",
                "2024-05-29",
                "2024-05-30",
                "2024-05-31",
                "2024-06-01",
                "2024-06-02",
                "2024-06-03"
            ]
        );
        let minutes: Vec<u32> = week.iter().map(|d| d.minutes).collect();
        assert_eq!(minutes, vec![30, 0, 0, 0, 60, 45, 0]);
        assert_eq!(week[0].label, "Tue");
        assert_eq!(week[6].label, "Today");
        assert!(week[6].is_today);
        assert!(!week[5].is_today);
    }

    #[test]
    fn bar_ratio_is_relative_to_busiest_day() {
        let records = DailyRecordStore::new(Arc::new(MemoryStore::new()));
        let displayed = with_minutes("2024-06-03", 50);
        records.save(&with_minutes("2024-06-02", 100));
        let week = weekly_overview(&records, key("2024-06-03"), &displayed);
        assert_eq!(bar_ratio(&week[6], &week), 0.5);
        assert_eq!(bar_ratio(&week[5], &week), 1.0);

        let empty = weekly_overview(&records, key("2020-01-10"), &DailyData::empty(key("2020-01-10")));
        assert_eq!(bar_ratio(&empty[0], &empty), 0.0);
    }
}
