use std::{env, fmt::Display, str::FromStr};

use anyhow::Context;
use chrono::Duration;
use tracing::info;

use crate::auth::AuthSettings;

pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set to a production Postgres instance")?,
            max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            jwt_secret: env::var("JWT_SECRET").ok().filter(|secret| !secret.is_empty()),
            token_ttl_hours: try_load("TOKEN_TTL_HOURS", "24")?,
            bcrypt_cost: try_load("BCRYPT_COST", "10")?,
        })
    }

    /// Token work needs a signing secret; other commands run without one.
    pub fn auth(&self) -> anyhow::Result<AuthSettings> {
        let jwt_secret = self
            .jwt_secret
            .clone()
            .context("JWT_SECRET must be set to sign and verify tokens")?;

        Ok(AuthSettings {
            jwt_secret,
            token_ttl: Duration::hours(self.token_ttl_hours),
            bcrypt_cost: self.bcrypt_cost,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_unset() {
        let value: u32 = try_load("SOMNIO_TEST_UNSET_KEY", "5").unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn rejects_unparseable_defaults() {
        let result: anyhow::Result<u32> = try_load("SOMNIO_TEST_OTHER_UNSET_KEY", "five");
        assert!(result.is_err());
    }

    #[test]
    fn auth_requires_secret() {
        let config = Config {
            database_url: "postgres://localhost/somnio".to_string(),
            max_connections: 5,
            jwt_secret: None,
            token_ttl_hours: 24,
            bcrypt_cost: 10,
        };
        assert!(config.auth().is_err());

        let config = Config {
            jwt_secret: Some("secret".to_string()),
            ..config
        };
        let auth = config.auth().unwrap();
        assert_eq!(auth.token_ttl, Duration::hours(24));
        assert_eq!(auth.bcrypt_cost, 10);
    }
}
