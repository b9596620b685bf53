use serde::Serialize;
use tracing::debug;

use crate::error::SleepError;
use crate::insights;
use crate::models::{DailyHours, SleepRecord, SleepSummary, Subject};
use crate::stats;
use crate::store::SleepStore;

/// Number of most recent nights every view is computed over.
pub const RECENT_WINDOW: usize = 7;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepOverview {
    pub days: Vec<DailyHours>,
    pub average_display: String,
    pub summary: Option<SleepSummary>,
}

/// Chronological recent window for one subject.
pub async fn recent_window(
    store: &dyn SleepStore,
    subject: &Subject,
) -> Result<Vec<SleepRecord>, SleepError> {
    let newest_first = store.find_recent_by_owner(subject.id, RECENT_WINDOW).await?;
    debug!(subject = %subject.id, nights = newest_first.len(), "fetched recent window");
    Ok(stats::chronological(newest_first))
}

pub async fn overview(store: &dyn SleepStore, subject: &Subject) -> Result<SleepOverview, SleepError> {
    let records = recent_window(store, subject).await?;
    Ok(build_overview(&records))
}

pub async fn insight_report(store: &dyn SleepStore, subject: &Subject) -> Result<String, SleepError> {
    let records = recent_window(store, subject).await?;
    Ok(insights::generate(&records))
}

pub fn build_overview(records: &[SleepRecord]) -> SleepOverview {
    SleepOverview {
        days: stats::daily_hours(records),
        average_display: stats::format_hours(stats::average_hours(records)),
        summary: stats::summarize(records),
    }
}
