use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::error::SleepError;
use crate::models::{NewSleepRecord, NewUser, QualityLabel, Role, SleepRecord, Subject};
use crate::store::{SleepStore, UserStore};

const SUBJECT_COLUMNS: &str = "u.id, u.name, u.email, u.role, u.created_at";
const SEED_RECORD_BASE: u128 = 0x5eed_0000_0000_4000_8000_0000_0000_0000;
const RECORD_COLUMNS: &str = "r.id, r.owner_id, r.date, r.quality, r.hours, r.sleep_start, \
     r.sleep_end, r.issue, r.created_at";

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, bcrypt_cost: u32) -> anyhow::Result<()> {
    let password_hash = auth::hash_password("DemoUser123!", bcrypt_cost)?;
    let people = vec![
        (
            Uuid::parse_str("6a1f8a7e-3c0b-4f7e-9d55-0b1f7e2c4d10")?,
            "Dr. Maya Rivera",
            "maya.rivera@somnio.health",
            Role::Doctor,
        ),
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@somnio.health",
            Role::Patient,
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@somnio.health",
            Role::Patient,
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@somnio.health",
            Role::Patient,
        ),
    ];

    for (id, name, email, role) in &people {
        sqlx::query(
            r#"
            INSERT INTO somnio.users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(role.as_str())
        .execute(pool)
        .await?;
    }

    // One week per patient: rested, short-sleeping and irregular.
    let weeks: [[(f64, Option<&str>); 7]; 3] = [
        [(8.0, None), (7.5, None), (8.5, None), (7.0, None), (8.0, None), (7.5, None), (9.0, None)],
        [
            (4.5, Some("frequent_waking")),
            (5.0, None),
            (3.5, Some("difficulty_falling_asleep")),
            (6.0, None),
            (4.0, Some("frequent_waking")),
            (5.5, None),
            (6.5, None),
        ],
        [(9.5, None), (5.0, None), (10.0, None), (6.5, None), (4.5, Some("nightmares")), (7.0, None), (8.0, None)],
    ];

    let today = Utc::now().date_naive();
    let patients = people.iter().filter(|(_, _, _, role)| *role == Role::Patient);
    for (patient_index, ((owner_id, _, _, _), week)) in patients.zip(weeks.iter()).enumerate() {
        for (day_index, (hours, issue)) in week.iter().enumerate() {
            let date = today - Duration::days(7 - day_index as i64);
            let quality = seed_quality(*hours, issue.is_some());
            let id = Uuid::from_u128(SEED_RECORD_BASE | ((patient_index as u128) << 8) | day_index as u128);
            sqlx::query(
                r#"
                INSERT INTO somnio.sleep_records (id, owner_id, date, quality, hours, issue)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(owner_id)
            .bind(date)
            .bind(quality.as_str())
            .bind(*hours)
            .bind(*issue)
            .execute(pool)
            .await?;
        }
    }

    info!(users = people.len(), "seed data ready");
    Ok(())
}

fn seed_quality(hours: f64, has_issue: bool) -> QualityLabel {
    if has_issue {
        if hours < 4.0 {
            QualityLabel::Terrible
        } else {
            QualityLabel::Poor
        }
    } else if hours >= 8.0 {
        QualityLabel::Excellent
    } else if hours >= 7.0 {
        QualityLabel::Good
    } else {
        QualityLabel::Fair
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn subject_from_row(row: &PgRow) -> Result<Subject, SleepError> {
    let role: String = row.try_get("role")?;
    Ok(Subject {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role
            .parse()
            .map_err(|raw| SleepError::dependency(format!("unknown role '{raw}' in users table")))?,
        created_at: row.try_get("created_at")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<SleepRecord, SleepError> {
    let quality: String = row.try_get("quality")?;
    Ok(SleepRecord {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        date: row.try_get::<NaiveDate, _>("date")?,
        quality: quality.parse().map_err(|raw| {
            SleepError::dependency(format!("unknown quality '{raw}' in sleep_records table"))
        })?,
        hours: row.try_get("hours")?,
        sleep_start: row.try_get("sleep_start")?,
        sleep_end: row.try_get("sleep_end")?,
        issue: row.try_get("issue")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Pairs each subject with its records, keeping both input orders. Records
/// whose owner is not listed are dropped.
fn group_by_owner(
    subjects: Vec<Subject>,
    records: Vec<SleepRecord>,
) -> Vec<(Subject, Vec<SleepRecord>)> {
    let positions: HashMap<Uuid, usize> = subjects
        .iter()
        .enumerate()
        .map(|(index, subject)| (subject.id, index))
        .collect();

    let mut members: Vec<(Subject, Vec<SleepRecord>)> = subjects
        .into_iter()
        .map(|subject| (subject, Vec::new()))
        .collect();
    for record in records {
        if let Some(&index) = positions.get(&record.owner_id) {
            members[index].1.push(record);
        }
    }
    members
}

#[async_trait]
impl SleepStore for PgStore {
    async fn save(&self, record: NewSleepRecord) -> Result<SleepRecord, SleepError> {
        let query = format!(
            r#"
            INSERT INTO somnio.sleep_records AS r
            (id, owner_id, date, quality, hours, sleep_start, sleep_end, issue)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(record.owner_id)
            .bind(record.date)
            .bind(record.quality.as_str())
            .bind(record.hours)
            .bind(record.sleep_start)
            .bind(record.sleep_end)
            .bind(&record.issue)
            .fetch_one(&self.pool)
            .await?;

        record_from_row(&row)
    }

    async fn find_recent_by_owner(
        &self,
        owner_id: Uuid,
        limit: usize,
    ) -> Result<Vec<SleepRecord>, SleepError> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM somnio.sleep_records r \
             WHERE r.owner_id = $1 \
             ORDER BY r.date DESC, r.created_at DESC \
             LIMIT $2"
        );
        let rows = sqlx::query(&query)
            .bind(owner_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn find_all_by_subject_role(
        &self,
        role: Role,
        limit: usize,
    ) -> Result<Vec<(Subject, Vec<SleepRecord>)>, SleepError> {
        let subjects_query = format!(
            "SELECT {SUBJECT_COLUMNS} FROM somnio.users u WHERE u.role = $1 ORDER BY u.name"
        );
        let subject_rows = sqlx::query(&subjects_query)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;

        let records_query = format!(
            "SELECT {RECORD_COLUMNS} FROM ( \
                 SELECT r.*, ROW_NUMBER() OVER ( \
                     PARTITION BY r.owner_id ORDER BY r.date DESC, r.created_at DESC \
                 ) AS recency \
                 FROM somnio.sleep_records r \
                 JOIN somnio.users u ON u.id = r.owner_id \
                 WHERE u.role = $1 \
             ) r \
             WHERE r.recency <= $2 \
             ORDER BY r.owner_id, r.date DESC, r.created_at DESC"
        );
        let record_rows = sqlx::query(&records_query)
            .bind(role.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let subjects = subject_rows
            .iter()
            .map(subject_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let records = record_rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(group_by_owner(subjects, records))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<Subject, SleepError> {
        let query = format!(
            r#"
            INSERT INTO somnio.users AS u (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SUBJECT_COLUMNS}
            "#
        );
        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => subject_from_row(&row),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(SleepError::DuplicateEmail(user.email))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Subject, String)>, SleepError> {
        let query = format!(
            "SELECT {SUBJECT_COLUMNS}, u.password_hash FROM somnio.users u \
             WHERE lower(u.email) = lower($1)"
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let password_hash: String = row.try_get("password_hash")?;
                Ok(Some((subject_from_row(&row)?, password_hash)))
            }
            None => Ok(None),
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<Subject>, SleepError> {
        let query = format!("SELECT {SUBJECT_COLUMNS} FROM somnio.users u WHERE u.id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(subject_from_row).transpose()
    }
}
