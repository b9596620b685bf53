use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{CohortOverview, IssueCount, PatientSummary, SleepStatus};
use crate::overview::RECENT_WINDOW;
use crate::stats;

const STATUS_ORDER: [SleepStatus; 4] = [
    SleepStatus::Excellent,
    SleepStatus::Good,
    SleepStatus::Warning,
    SleepStatus::Critical,
];

pub fn status_mix(patients: &[PatientSummary]) -> Vec<(SleepStatus, usize)> {
    STATUS_ORDER
        .iter()
        .map(|status| {
            let count = patients
                .iter()
                .filter(|patient| patient.status == Some(*status))
                .count();
            (*status, count)
        })
        .collect()
}

/// Critical and warning patients, lowest average first.
pub fn needing_attention(patients: &[PatientSummary]) -> Vec<&PatientSummary> {
    let mut flagged: Vec<&PatientSummary> = patients
        .iter()
        .filter(|patient| {
            matches!(
                patient.status,
                Some(SleepStatus::Critical | SleepStatus::Warning)
            )
        })
        .collect();
    flagged.sort_by(|a, b| {
        a.average_hours
            .partial_cmp(&b.average_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    flagged
}

pub fn cohort_issues(patients: &[PatientSummary]) -> Vec<IssueCount> {
    let records: Vec<_> = patients
        .iter()
        .flat_map(|patient| patient.recent_records.iter().cloned())
        .collect();
    let mut counts = stats::issue_frequency(&records);
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

pub fn build_report(overview: &CohortOverview, generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Patient Sleep Report");
    let _ = writeln!(
        output,
        "Generated {generated_on} over each patient's last {RECENT_WINDOW} nights"
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} patients, {} active today, {} active alerts, average sleep {}",
        overview.total_patients,
        overview.active_today,
        overview.active_alerts,
        overview
            .average_sleep
            .map_or_else(|| "no data".to_string(), |hours| format!("{hours:.1}h"))
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");

    if overview.patients.is_empty() {
        let _ = writeln!(output, "No patients registered.");
    } else {
        for (status, count) in status_mix(&overview.patients) {
            let _ = writeln!(output, "- {status}: {count}");
        }
        let without_data = overview
            .patients
            .iter()
            .filter(|patient| patient.status.is_none())
            .count();
        if without_data > 0 {
            let _ = writeln!(output, "- no data: {without_data}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Patients Needing Attention");

    let flagged = needing_attention(&overview.patients);
    if flagged.is_empty() {
        let _ = writeln!(output, "No patients below the warning threshold.");
    } else {
        for patient in flagged.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) {} average {} against a {:.0}h goal, {} alerts, last active {}",
                patient.name,
                patient.email,
                patient.status.map_or("unknown", SleepStatus::as_str),
                stats::format_hours(patient.average_hours),
                patient.sleep_goal_hours,
                patient.alert_count,
                patient.last_active
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Reported Issues");

    let issues = cohort_issues(&overview.patients);
    if issues.is_empty() {
        let _ = writeln!(output, "No issues reported in this window.");
    } else {
        for issue in issues.iter().take(5) {
            let _ = writeln!(
                output,
                "- {}: {} nights",
                stats::format_issue(&issue.issue),
                issue.count
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{build_cohort, summarize_patient};
    use crate::models::{Role, Subject};
    use crate::stats::tests::night;
    use chrono::Utc;
    use uuid::Uuid;

    fn patient(name: &str, hours: &[f64]) -> PatientSummary {
        let now = Utc::now();
        let records = hours
            .iter()
            .enumerate()
            .map(|(index, hours)| night(index as u32 + 1, *hours))
            .collect();
        summarize_patient(
            Subject {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                role: Role::Patient,
                created_at: now,
            },
            records,
            now,
        )
    }

    #[test]
    fn status_mix_counts_every_status() {
        let patients = vec![
            patient("Avery", &[8.0]),
            patient("Jules", &[5.0]),
            patient("Kiara", &[4.0]),
        ];
        let mix = status_mix(&patients);
        assert_eq!(mix[0], (SleepStatus::Excellent, 1));
        assert_eq!(mix[3], (SleepStatus::Critical, 2));
    }

    #[test]
    fn attention_list_is_sorted_by_average() {
        let patients = vec![
            patient("Avery", &[8.0]),
            patient("Jules", &[6.0]),
            patient("Kiara", &[4.0]),
        ];
        let names: Vec<&str> = needing_attention(&patients)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Kiara", "Jules"]);
    }

    #[test]
    fn report_lists_sections() {
        let mut tired = patient("Jules", &[4.0, 4.5]);
        for record in &mut tired.recent_records {
            record.issue = Some("frequent_waking".to_string());
        }
        let overview = CohortOverview {
            total_patients: 2,
            active_today: 2,
            active_alerts: tired.alert_count,
            average_sleep: Some(6.1),
            patients: vec![patient("Avery", &[8.0]), tired],
        };

        let report = build_report(&overview, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert!(report.contains("# Patient Sleep Report"));
        assert!(report.contains("2 patients, 2 active today, 2 active alerts, average sleep 6.1h"));
        assert!(report.contains("- critical: 1"));
        assert!(report.contains("- Jules (jules@example.com) critical average 4h 18m"));
        assert!(report.contains("- Frequent Waking: 2 nights"));
    }

    #[test]
    fn empty_cohort_report() {
        let overview = build_cohort(Vec::new(), Utc::now());
        let report = build_report(&overview, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert!(report.contains("No patients registered."));
        assert!(report.contains("average sleep no data"));
    }
}
