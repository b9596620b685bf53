use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    Excellent,
    Good,
    Fair,
    Poor,
    Terrible,
}

impl QualityLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityLabel::Excellent => "excellent",
            QualityLabel::Good => "good",
            QualityLabel::Fair => "fair",
            QualityLabel::Poor => "poor",
            QualityLabel::Terrible => "terrible",
        }
    }

    /// Only poor and terrible nights carry an issue.
    pub fn accepts_issue(self) -> bool {
        matches!(self, QualityLabel::Poor | QualityLabel::Terrible)
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLabel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "excellent" => Ok(QualityLabel::Excellent),
            "good" => Ok(QualityLabel::Good),
            "fair" => Ok(QualityLabel::Fair),
            "poor" => Ok(QualityLabel::Poor),
            "terrible" => Ok(QualityLabel::Terrible),
            _ => Err(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Patient => "PATIENT",
        }
    }

    /// Unknown or absent roles register as patients.
    pub fn from_requested(value: Option<&str>) -> Self {
        value
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(Role::Patient)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ADMIN" => Ok(Role::Admin),
            "DOCTOR" => Ok(Role::Doctor),
            "PATIENT" => Ok(Role::Patient),
            other => Err(other.to_string()),
        }
    }
}

/// Resolved identity of a caller or a cohort member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Raw ingestion payload, as typed on the command line or read from CSV.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepEntry {
    pub quality: Option<String>,
    pub date: Option<String>,
    pub hours: Option<Vec<f64>>,
    pub sleep_start: Option<String>,
    pub sleep_end: Option<String>,
    pub issue: Option<String>,
}

/// A validated record waiting for the store to assign its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSleepRecord {
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub quality: QualityLabel,
    pub hours: f64,
    pub sleep_start: Option<NaiveDateTime>,
    pub sleep_end: Option<NaiveDateTime>,
    pub issue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub quality: QualityLabel,
    pub hours: f64,
    pub sleep_start: Option<NaiveDateTime>,
    pub sleep_end: Option<NaiveDateTime>,
    pub issue: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCount {
    pub issue: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSummary {
    pub count: usize,
    pub average: f64,
    pub best: SleepRecord,
    pub worst: SleepRecord,
    pub min_hours: f64,
    pub max_hours: f64,
    pub variation: f64,
    pub underslept_nights: usize,
    pub overslept_nights: usize,
    pub has_low_days: bool,
    pub poor_quality_nights: usize,
    pub onset_average: Option<f64>,
    pub wake_average: Option<f64>,
    pub issue_frequency: Vec<IssueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyHours {
    pub day_abbrev: String,
    pub day_full: String,
    pub date: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepStatus {
    Critical,
    Warning,
    Good,
    Excellent,
}

impl SleepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SleepStatus::Critical => "critical",
            SleepStatus::Warning => "warning",
            SleepStatus::Good => "good",
            SleepStatus::Excellent => "excellent",
        }
    }
}

impl fmt::Display for SleepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SleepStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(SleepStatus::Critical),
            "warning" => Ok(SleepStatus::Warning),
            "good" => Ok(SleepStatus::Good),
            "excellent" => Ok(SleepStatus::Excellent),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SleepBands {
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub average_hours: Option<f64>,
    pub sleep_goal_hours: f64,
    pub alert_count: usize,
    pub last_active: String,
    pub status: Option<SleepStatus>,
    pub bands: SleepBands,
    pub recent_records: Vec<SleepRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortOverview {
    pub total_patients: usize,
    pub active_today: usize,
    pub active_alerts: usize,
    pub average_sleep: Option<f64>,
    pub patients: Vec<PatientSummary>,
}
