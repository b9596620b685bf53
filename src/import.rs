use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SleepError;
use crate::ingest;
use crate::models::{Role, SleepEntry, Subject};
use crate::store::{SleepStore, UserStore};

#[derive(Debug, Deserialize)]
struct CsvRow {
    email: String,
    quality: Option<String>,
    date: Option<String>,
    hours: Option<f64>,
    sleep_start: Option<String>,
    sleep_end: Option<String>,
    issue: Option<String>,
}

impl CsvRow {
    fn into_entry(self) -> SleepEntry {
        SleepEntry {
            quality: self.quality,
            date: self.date,
            hours: self.hours.map(|hours| vec![hours]),
            sleep_start: self.sleep_start,
            sleep_end: self.sleep_end,
            issue: self.issue,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub rejected: usize,
}

/// Imports sleep rows for existing accounts. Bad rows are skipped, storage
/// failures abort the run.
pub async fn import_csv<R: Read>(
    records: &dyn SleepStore,
    users: &dyn UserStore,
    caller: &Subject,
    reader: R,
) -> Result<ImportSummary, SleepError> {
    if caller.role == Role::Patient {
        return Err(SleepError::Forbidden {
            role: caller.role,
            action: "import records for other accounts",
        });
    }

    let mut reader = csv::Reader::from_reader(reader);
    let mut owners: HashMap<String, Option<Uuid>> = HashMap::new();
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(line, error = %err, "skipping unreadable row");
                summary.rejected += 1;
                continue;
            }
        };

        let key = row.email.trim().to_lowercase();
        let owner_id = match owners.get(&key) {
            Some(owner_id) => *owner_id,
            None => {
                let owner_id = users
                    .find_credentials(&key)
                    .await?
                    .map(|(subject, _)| subject.id);
                owners.insert(key.clone(), owner_id);
                owner_id
            }
        };

        let Some(owner_id) = owner_id else {
            warn!(line, email = %key, "skipping row for unknown account");
            summary.rejected += 1;
            continue;
        };

        match ingest::normalize(owner_id, &row.into_entry()) {
            Ok(record) => {
                records.save(record).await?;
                summary.inserted += 1;
            }
            Err(err) => {
                warn!(line, code = err.code(), error = %err, "skipping invalid row");
                summary.rejected += 1;
            }
        }
    }

    info!(
        inserted = summary.inserted,
        rejected = summary.rejected,
        "csv import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    const CSV: &str = "\
email,quality,date,hours,sleep_start,sleep_end,issue
avery@example.com,good,2026-10-10,7.5,,,
AVERY@example.com,poor,2026-10-11,,23:30,04:00,frequent_waking
avery@example.com,meh,2026-10-12,7,,,
nobody@example.com,good,2026-10-12,7,,,
avery@example.com,fair,2026-10-13,,,,
";

    #[tokio::test]
    async fn imports_valid_rows_and_counts_rejects() {
        let store = MemoryStore::default();
        let doctor = store.add_subject("Dr. Rivera", "rivera@example.com", Role::Doctor);
        let patient = store.add_subject("Avery Lee", "avery@example.com", Role::Patient);

        let summary = import_csv(&store, &store, &doctor, CSV.as_bytes())
            .await
            .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                rejected: 3
            }
        );

        let saved = store.find_recent_by_owner(patient.id, 7).await.unwrap();
        assert_eq!(saved.len(), 2);
        let overnight = saved.iter().find(|record| record.sleep_start.is_some()).unwrap();
        assert_eq!(overnight.hours, 4.5);
        assert_eq!(overnight.issue.as_deref(), Some("frequent_waking"));
    }

    #[tokio::test]
    async fn patients_cannot_import() {
        let store = MemoryStore::default();
        let patient = store.add_subject("Avery Lee", "avery@example.com", Role::Patient);
        let err = import_csv(&store, &store, &patient, CSV.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, SleepError::Forbidden { .. }));
        assert_eq!(store.record_count(), 0);
    }
}
