use chrono::{NaiveDateTime, Timelike};

use crate::models::{DailyHours, IssueCount, QualityLabel, SleepRecord, SleepSummary};

pub const UNDERSLEPT_HOURS: f64 = 5.0;
pub const OVERSLEPT_HOURS: f64 = 9.0;
pub const LOW_DAY_HOURS: f64 = 4.0;

/// Turns a newest-first window into display order.
pub fn chronological(mut records: Vec<SleepRecord>) -> Vec<SleepRecord> {
    records.reverse();
    records
}

/// `None` stands for "no data"; an empty window never averages to zero.
pub fn average_hours(records: &[SleepRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|record| record.hours).sum();
    Some(total / records.len() as f64)
}

pub fn summarize(records: &[SleepRecord]) -> Option<SleepSummary> {
    let average = average_hours(records)?;
    let first = records.first()?;

    let mut best = first;
    let mut worst = first;
    for record in records {
        if record.hours > best.hours {
            best = record;
        }
        if record.hours < worst.hours {
            worst = record;
        }
    }

    let timed: Vec<(NaiveDateTime, NaiveDateTime)> = records
        .iter()
        .filter_map(|record| record.sleep_start.zip(record.sleep_end))
        .collect();
    let onsets: Vec<f64> = timed.iter().map(|(start, _)| hour_of_day(*start)).collect();
    let wakes: Vec<f64> = timed.iter().map(|(_, end)| hour_of_day(*end)).collect();

    Some(SleepSummary {
        count: records.len(),
        average,
        best: best.clone(),
        worst: worst.clone(),
        min_hours: worst.hours,
        max_hours: best.hours,
        variation: best.hours - worst.hours,
        underslept_nights: count_where(records, |hours| hours < UNDERSLEPT_HOURS),
        overslept_nights: count_where(records, |hours| hours > OVERSLEPT_HOURS),
        has_low_days: records.iter().any(|record| record.hours < LOW_DAY_HOURS),
        poor_quality_nights: records
            .iter()
            .filter(|record| record.quality == QualityLabel::Poor)
            .count(),
        onset_average: average_clock(&onsets),
        wake_average: average_clock(&wakes),
        issue_frequency: issue_frequency(records),
    })
}

pub fn count_where(records: &[SleepRecord], predicate: impl Fn(f64) -> bool) -> usize {
    records
        .iter()
        .filter(|record| predicate(record.hours))
        .count()
}

/// Counts each distinct issue in the order it first appears.
pub fn issue_frequency(records: &[SleepRecord]) -> Vec<IssueCount> {
    let mut counts: Vec<IssueCount> = Vec::new();
    for issue in records.iter().filter_map(|record| record.issue.as_deref()) {
        match counts.iter_mut().find(|entry| entry.issue == issue) {
            Some(entry) => entry.count += 1,
            None => counts.push(IssueCount {
                issue: issue.to_string(),
                count: 1,
            }),
        }
    }
    counts
}

pub fn hour_of_day(timestamp: NaiveDateTime) -> f64 {
    f64::from(timestamp.hour()) + f64::from(timestamp.minute()) / 60.0
}

/// Plain arithmetic mean of hour-of-day values.
///
/// Times on either side of midnight are not averaged on a circle, so mixing
/// 23:30 and 00:30 lands near noon. Kept as-is; see DESIGN.md.
pub fn average_clock(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Whole hour of a clock value, truncated. Timing rules compare this, never
/// the rounded display from [`format_clock`].
pub fn clock_hour(value: f64) -> u32 {
    value.floor().max(0.0) as u32
}

pub fn format_clock(value: f64) -> String {
    let minutes = clock_minutes(value);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn clock_minutes(value: f64) -> u32 {
    (value * 60.0).round().max(0.0) as u32
}

/// Dashboard style duration, e.g. `7h 30m`.
pub fn format_hours(hours: Option<f64>) -> String {
    match hours {
        Some(hours) if hours > 0.0 => {
            let minutes = (hours * 60.0).round() as u64;
            format!("{}h {}m", minutes / 60, minutes % 60)
        }
        _ => "No data".to_string(),
    }
}

/// `frequent_waking` becomes `Frequent Waking`.
pub fn format_issue(issue: &str) -> String {
    issue
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn daily_hours(records: &[SleepRecord]) -> Vec<DailyHours> {
    records
        .iter()
        .map(|record| DailyHours {
            day_abbrev: record.date.format("%a").to_string(),
            day_full: record.date.format("%A").to_string(),
            date: record.date,
            hours: record.hours,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use uuid::Uuid;

    pub(crate) fn night(day: u32, hours: f64) -> SleepRecord {
        SleepRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
            quality: QualityLabel::Good,
            hours,
            sleep_start: None,
            sleep_end: None,
            issue: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn timed_night(day: u32, start: (u32, u32), end: (u32, u32)) -> SleepRecord {
        let date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
        let sleep_start = date.and_hms_opt(start.0, start.1, 0).unwrap();
        let mut sleep_end = date.and_hms_opt(end.0, end.1, 0).unwrap();
        if sleep_end < sleep_start {
            sleep_end += Duration::days(1);
        }
        let hours = (sleep_end - sleep_start).num_minutes() as f64 / 60.0;
        SleepRecord {
            sleep_start: Some(sleep_start),
            sleep_end: Some(sleep_end),
            ..night(day, hours)
        }
    }

    #[test]
    fn empty_window_has_no_average() {
        assert_eq!(average_hours(&[]), None);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn single_record_is_both_best_and_worst() {
        let record = night(12, 7.5);
        let summary = summarize(std::slice::from_ref(&record)).unwrap();
        assert_eq!(summary.average, 7.5);
        assert_eq!(summary.best, record);
        assert_eq!(summary.worst, record);
        assert_eq!(summary.variation, 0.0);
    }

    #[test]
    fn mixed_week_statistics() {
        let records = vec![night(10, 3.0), night(11, 9.5), night(12, 6.0)];
        let summary = summarize(&records).unwrap();

        assert!((summary.average - 6.166_666).abs() < 1e-5);
        assert_eq!(summary.variation, 6.5);
        assert!(summary.has_low_days);
        assert_eq!(summary.best.hours, 9.5);
        assert_eq!(summary.worst.hours, 3.0);
        assert_eq!(summary.underslept_nights, 1);
        assert_eq!(summary.overslept_nights, 1);
    }

    #[test]
    fn ties_keep_first_seen_record() {
        let records = vec![night(10, 8.0), night(11, 8.0), night(12, 5.0), night(13, 5.0)];
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.best.id, records[0].id);
        assert_eq!(summary.worst.id, records[2].id);
    }

    #[test]
    fn untimed_nights_are_excluded_from_clock_averages() {
        let records = vec![
            timed_night(10, (23, 0), (6, 0)),
            night(11, 8.0),
            timed_night(12, (23, 30), (7, 0)),
        ];
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.onset_average.map(format_clock).as_deref(), Some("23:15"));
        assert_eq!(summary.wake_average.map(format_clock).as_deref(), Some("06:30"));
    }

    #[test]
    fn clock_average_does_not_wrap_midnight() {
        let records = vec![timed_night(10, (23, 30), (7, 0)), timed_night(11, (0, 30), (8, 0))];
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.onset_average.map(format_clock).as_deref(), Some("12:00"));
    }

    #[test]
    fn no_timing_data_means_no_clock_average() {
        let summary = summarize(&[night(10, 7.0)]).unwrap();
        assert_eq!(summary.onset_average, None);
        assert_eq!(summary.wake_average, None);
    }

    #[test]
    fn only_poor_nights_count_as_poor_quality() {
        let mut records = vec![night(10, 4.0), night(11, 3.0), night(12, 7.0)];
        records[0].quality = QualityLabel::Poor;
        records[1].quality = QualityLabel::Terrible;
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.poor_quality_nights, 1);
    }

    #[test]
    fn issues_counted_in_first_seen_order() {
        let mut records = vec![night(10, 4.0), night(11, 4.5), night(12, 3.5), night(13, 8.0)];
        records[0].issue = Some("nightmares".to_string());
        records[1].issue = Some("frequent_waking".to_string());
        records[2].issue = Some("nightmares".to_string());

        let counts = issue_frequency(&records);
        assert_eq!(
            counts,
            vec![
                IssueCount {
                    issue: "nightmares".to_string(),
                    count: 2
                },
                IssueCount {
                    issue: "frequent_waking".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn formats_durations_and_issues() {
        assert_eq!(format_hours(Some(7.5)), "7h 30m");
        assert_eq!(format_hours(Some(6.99)), "6h 59m");
        assert_eq!(format_hours(None), "No data");
        assert_eq!(format_issue("difficulty_falling_asleep"), "Difficulty Falling Asleep");
        assert_eq!(format_clock(6.999), "07:00");
        assert_eq!(clock_hour(0.999), 0);
        assert_eq!(clock_hour(8.994), 8);
        assert_eq!(clock_hour(9.0), 9);
    }

    #[test]
    fn daily_rows_carry_weekday_names() {
        let rows = daily_hours(&[night(12, 7.0)]);
        assert_eq!(rows[0].day_abbrev, "Mon");
        assert_eq!(rows[0].day_full, "Monday");
    }

    #[test]
    fn chronological_reverses_newest_first() {
        let newest_first = vec![night(13, 7.0), night(12, 6.0), night(11, 5.0)];
        let ordered = chronological(newest_first);
        let days: Vec<u32> = ordered.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(days, vec![11, 12, 13]);
    }
}
