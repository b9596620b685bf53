use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{SleepError, ValidationError};
use crate::models::{NewUser, Role, Subject};
use crate::store::UserStore;

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub subject: Subject,
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, SleepError> {
    bcrypt::hash(password, cost).map_err(SleepError::dependency)
}

pub async fn register(
    users: &dyn UserStore,
    settings: &AuthSettings,
    registration: Registration,
) -> Result<Subject, SleepError> {
    let name = required(&registration.name, "name")?;
    let email = required(&registration.email, "email")?;
    if registration.password.is_empty() {
        return Err(ValidationError::MissingField("password").into());
    }

    let role = Role::from_requested(registration.role.as_deref());
    let password_hash = hash_password(&registration.password, settings.bcrypt_cost)?;
    let subject = users
        .create_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role,
        })
        .await?;

    info!(user = %subject.id, role = %subject.role, "user registered");
    Ok(subject)
}

pub async fn login(
    users: &dyn UserStore,
    settings: &AuthSettings,
    email: &str,
    password: &str,
) -> Result<Session, SleepError> {
    let email = required(email, "email")?;
    if password.is_empty() {
        return Err(ValidationError::MissingField("password").into());
    }

    let Some((subject, password_hash)) = users.find_credentials(email).await? else {
        warn!("login attempt for unknown email");
        return Err(SleepError::InvalidCredentials);
    };

    let matches = bcrypt::verify(password, &password_hash).unwrap_or(false);
    if !matches {
        warn!(user = %subject.id, "login attempt with wrong password");
        return Err(SleepError::InvalidCredentials);
    }

    let token = issue_token(settings, subject.id)?;
    info!(user = %subject.id, "login succeeded");
    Ok(Session { token, subject })
}

pub fn issue_token(settings: &AuthSettings, user_id: Uuid) -> Result<String, SleepError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + settings.token_ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(SleepError::dependency)
}

/// Resolves a bearer token to the subject it was issued for.
pub async fn authenticate(
    users: &dyn UserStore,
    settings: &AuthSettings,
    token: Option<&str>,
) -> Result<Subject, SleepError> {
    let token = token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| SleepError::NotAuthenticated("no token supplied".to_string()))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| SleepError::NotAuthenticated(format!("invalid token: {err}")))?
    .claims;

    users
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| SleepError::NotAuthenticated("account no longer exists".to_string()))
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value)
}
