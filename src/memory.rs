use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SleepError;
use crate::models::{NewSleepRecord, NewUser, Role, SleepRecord, Subject};
use crate::store::{SleepStore, UserStore};

/// In-memory store for exercising the core without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<(Subject, String)>>,
    records: Mutex<Vec<SleepRecord>>,
    failing: bool,
}

impl MemoryStore {
    /// A store whose every call fails like an unreachable database.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn add_subject(&self, name: &str, email: &str, role: Role) -> Subject {
        let subject = Subject {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            created_at: Utc::now(),
        };
        self.users
            .lock()
            .unwrap()
            .push((subject.clone(), String::new()));
        subject
    }

    /// Inserts a record with an explicit creation time.
    pub fn insert_at(&self, record: NewSleepRecord, created_at: DateTime<Utc>) -> SleepRecord {
        let record = SleepRecord {
            id: Uuid::new_v4(),
            owner_id: record.owner_id,
            date: record.date,
            quality: record.quality,
            hours: record.hours,
            sleep_start: record.sleep_start,
            sleep_end: record.sleep_end,
            issue: record.issue,
            created_at,
        };
        self.records.lock().unwrap().push(record.clone());
        record
    }

    fn check(&self) -> Result<(), SleepError> {
        if self.failing {
            return Err(SleepError::dependency("memory store is offline"));
        }
        Ok(())
    }

    fn recent(&self, owner_id: Uuid, limit: usize) -> Vec<SleepRecord> {
        let mut owned: Vec<SleepRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        owned.truncate(limit);
        owned
    }
}

#[async_trait]
impl SleepStore for MemoryStore {
    async fn save(&self, record: NewSleepRecord) -> Result<SleepRecord, SleepError> {
        self.check()?;
        Ok(self.insert_at(record, Utc::now()))
    }

    async fn find_recent_by_owner(
        &self,
        owner_id: Uuid,
        limit: usize,
    ) -> Result<Vec<SleepRecord>, SleepError> {
        self.check()?;
        Ok(self.recent(owner_id, limit))
    }

    async fn find_all_by_subject_role(
        &self,
        role: Role,
        limit: usize,
    ) -> Result<Vec<(Subject, Vec<SleepRecord>)>, SleepError> {
        self.check()?;
        let subjects: Vec<Subject> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|(subject, _)| subject.role == role)
            .map(|(subject, _)| subject.clone())
            .collect();

        Ok(subjects
            .into_iter()
            .map(|subject| {
                let records = self.recent(subject.id, limit);
                (subject, records)
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<Subject, SleepError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|(subject, _)| subject.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(SleepError::DuplicateEmail(user.email));
        }

        let subject = Subject {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        users.push((subject.clone(), user.password_hash));
        Ok(subject)
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Subject, String)>, SleepError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(subject, _)| subject.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<Subject>, SleepError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(subject, _)| subject.id == id)
            .map(|(subject, _)| subject.clone()))
    }
}
