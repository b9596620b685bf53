use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SleepError;
use crate::models::{NewSleepRecord, NewUser, Role, SleepRecord, Subject};

/// Persistence the sleep core depends on but never implements itself.
///
/// Implementations make exactly one attempt per call and report failures as
/// [`SleepError::Dependency`].
#[async_trait]
pub trait SleepStore: Send + Sync {
    /// Persists a record, assigning its id and creation time.
    async fn save(&self, record: NewSleepRecord) -> Result<SleepRecord, SleepError>;

    /// The `limit` most recent records of one owner, newest date first.
    async fn find_recent_by_owner(
        &self,
        owner_id: Uuid,
        limit: usize,
    ) -> Result<Vec<SleepRecord>, SleepError>;

    /// Every subject with `role`, each paired with its `limit` most recent
    /// records (newest first). Subjects without records get an empty list.
    async fn find_all_by_subject_role(
        &self,
        role: Role,
        limit: usize,
    ) -> Result<Vec<(Subject, Vec<SleepRecord>)>, SleepError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`SleepError::DuplicateEmail`] when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<Subject, SleepError>;

    /// Case-insensitive lookup returning the subject and its password hash.
    async fn find_credentials(&self, email: &str)
        -> Result<Option<(Subject, String)>, SleepError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<Subject>, SleepError>;
}
