use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{SleepError, ValidationError};
use crate::models::{NewSleepRecord, QualityLabel, SleepEntry, SleepRecord, Subject};
use crate::store::SleepStore;

/// Validates and normalizes one entry without touching the store.
pub fn normalize(owner_id: Uuid, entry: &SleepEntry) -> Result<NewSleepRecord, ValidationError> {
    let quality = parse_quality(entry.quality.as_deref())?;
    let date = parse_date(entry.date.as_deref())?;

    let (hours, sleep_start, sleep_end) = match (
        non_blank(entry.sleep_start.as_deref()),
        non_blank(entry.sleep_end.as_deref()),
    ) {
        (Some(start), Some(end)) => {
            let (start, end) = time_range(date, start, end)?;
            (range_hours(start, end), Some(start), Some(end))
        }
        _ => (direct_hours(entry.hours.as_deref())?, None, None),
    };

    let issue = if quality.accepts_issue() {
        non_blank(entry.issue.as_deref()).map(str::to_string)
    } else {
        None
    };

    Ok(NewSleepRecord {
        owner_id,
        date,
        quality,
        hours,
        sleep_start,
        sleep_end,
        issue,
    })
}

pub async fn record_sleep(
    store: &dyn SleepStore,
    owner: &Subject,
    entry: &SleepEntry,
) -> Result<SleepRecord, SleepError> {
    let record = normalize(owner.id, entry)?;
    debug!(owner = %owner.id, hours = record.hours, "sleep entry normalized");

    let saved = store.save(record).await?;
    info!(record = %saved.id, owner = %owner.id, date = %saved.date, "sleep record saved");
    Ok(saved)
}

fn parse_quality(raw: Option<&str>) -> Result<QualityLabel, ValidationError> {
    let raw = non_blank(raw).ok_or(ValidationError::MissingQuality)?;
    raw.parse().map_err(ValidationError::UnknownQuality)
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, ValidationError> {
    let raw = non_blank(raw).ok_or(ValidationError::MissingDate)?;
    // Accept full timestamps by keeping only the calendar part.
    let day = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

fn direct_hours(hours: Option<&[f64]>) -> Result<f64, ValidationError> {
    let value = hours
        .and_then(|values| values.first().copied())
        .ok_or(ValidationError::MissingDuration)?;

    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidHours(value));
    }
    Ok(value)
}

fn time_range(
    date: NaiveDate,
    start: &str,
    end: &str,
) -> Result<(NaiveDateTime, NaiveDateTime), ValidationError> {
    let start = date.and_time(parse_clock(start)?);
    let mut end = date.and_time(parse_clock(end)?);

    // Waking before falling asleep means the night crossed midnight.
    if end < start {
        end += Duration::days(1);
    }
    Ok((start, end))
}

fn range_hours(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

fn parse_clock(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidTime(raw.to_string()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
