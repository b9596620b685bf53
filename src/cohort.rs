use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::SleepError;
use crate::models::{
    CohortOverview, PatientSummary, Role, SleepBands, SleepRecord, SleepStatus, Subject,
};
use crate::overview::RECENT_WINDOW;
use crate::stats::{self, UNDERSLEPT_HOURS};
use crate::store::SleepStore;

pub const SLEEP_GOAL_HOURS: f64 = 8.0;

/// First match wins; each bound is inclusive.
const STATUS_THRESHOLDS: [(f64, SleepStatus); 3] = [
    (7.5, SleepStatus::Excellent),
    (6.5, SleepStatus::Good),
    (5.5, SleepStatus::Warning),
];

pub fn classify(average_hours: f64) -> SleepStatus {
    STATUS_THRESHOLDS
        .iter()
        .find(|(floor, _)| average_hours >= *floor)
        .map_or(SleepStatus::Critical, |(_, status)| *status)
}

/// Nights under five hours.
pub fn alert_count(records: &[SleepRecord]) -> usize {
    stats::count_where(records, |hours| hours < UNDERSLEPT_HOURS)
}

pub fn bands(records: &[SleepRecord]) -> SleepBands {
    SleepBands {
        good: stats::count_where(records, |hours| hours >= 7.0),
        fair: stats::count_where(records, |hours| (6.0..7.0).contains(&hours)),
        poor: stats::count_where(records, |hours| hours < 6.0),
    }
}

pub fn describe_last_active(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last else {
        return "Unknown".to_string();
    };
    let minutes = (now - last).num_minutes().max(0);

    if minutes < 60 {
        plural(minutes, "minute")
    } else if minutes < 24 * 60 {
        plural(minutes / 60, "hour")
    } else {
        plural(minutes / (24 * 60), "day")
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Summarizes one patient's chronological window.
pub fn summarize_patient(
    subject: Subject,
    records: Vec<SleepRecord>,
    now: DateTime<Utc>,
) -> PatientSummary {
    let average = stats::average_hours(&records);
    let last_active = records.iter().map(|record| record.created_at).max();

    PatientSummary {
        id: subject.id,
        name: subject.name,
        email: subject.email,
        average_hours: average.map(round_tenth),
        sleep_goal_hours: SLEEP_GOAL_HOURS,
        alert_count: alert_count(&records),
        last_active: describe_last_active(last_active, now),
        status: average.map(classify),
        bands: bands(&records),
        recent_records: records,
    }
}

pub fn build_cohort(
    members: Vec<(Subject, Vec<SleepRecord>)>,
    now: DateTime<Utc>,
) -> CohortOverview {
    let patients: Vec<PatientSummary> = members
        .into_iter()
        .map(|(subject, newest_first)| {
            summarize_patient(subject, stats::chronological(newest_first), now)
        })
        .collect();

    let active_today = patients
        .iter()
        .filter(|patient| {
            patient
                .recent_records
                .iter()
                .map(|record| record.created_at)
                .max()
                .is_some_and(|last| now - last < chrono::Duration::hours(24))
        })
        .count();

    let averages: Vec<f64> = patients
        .iter()
        .filter_map(|patient| patient.average_hours)
        .collect();
    let average_sleep = if averages.is_empty() {
        None
    } else {
        Some(round_tenth(averages.iter().sum::<f64>() / averages.len() as f64))
    };

    CohortOverview {
        total_patients: patients.len(),
        active_today,
        active_alerts: patients.iter().map(|patient| patient.alert_count).sum(),
        average_sleep,
        patients,
    }
}

/// Doctor panel over every patient. Only doctors and admins may ask.
pub async fn cohort_overview(
    store: &dyn SleepStore,
    caller: &Subject,
    now: DateTime<Utc>,
) -> Result<CohortOverview, SleepError> {
    if caller.role == Role::Patient {
        return Err(SleepError::Forbidden {
            role: caller.role,
            action: "view the patient cohort",
        });
    }

    let members = store
        .find_all_by_subject_role(Role::Patient, RECENT_WINDOW)
        .await?;
    let overview = build_cohort(members, now);
    info!(
        caller = %caller.id,
        patients = overview.total_patients,
        alerts = overview.active_alerts,
        "cohort overview built"
    );
    Ok(overview)
}

#[derive(Debug, Clone, Default)]
pub struct CohortFilter {
    pub status: Option<SleepStatus>,
    pub search: Option<String>,
}

impl CohortFilter {
    pub fn matches(&self, patient: &PatientSummary) -> bool {
        let status_ok = self
            .status
            .is_none_or(|status| patient.status == Some(status));
        let search_ok = self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            patient.name.to_lowercase().contains(&needle)
                || patient.email.to_lowercase().contains(&needle)
        });
        status_ok && search_ok
    }

    pub fn apply<'a>(&self, patients: &'a [PatientSummary]) -> Vec<&'a PatientSummary> {
        patients.iter().filter(|patient| self.matches(patient)).collect()
    }
}
