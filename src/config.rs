use std::{fmt::Display, str::FromStr};

use anyhow::{ensure, Context};
use serde::Deserialize;

/// One year; also bounds token expiry arithmetic.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;
const MAX_LOCKOUT_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// One entry of the static subscription-key registry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionKey {
    pub key: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Nominal requests-per-hour figure. Not enforced anywhere.
    #[serde(default)]
    pub rate_limit: u32,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    pub threshold: u32,
    pub minutes: i64,
}

/// Argon2 cost parameters. `None` keeps the library default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashConfig {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub subscription_keys: Vec<SubscriptionKey>,
    pub lockout: LockoutConfig,
    pub hashing: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        ensure!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "shoplist".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "shoplist-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES")?.unwrap_or(60 * 24 * 7),
        };

        let subscription_keys = match std::env::var("SUBSCRIPTION_KEYS") {
            Ok(raw) => parse_subscription_keys(&raw)?,
            Err(_) => {
                tracing::warn!("SUBSCRIPTION_KEYS not set; using development key registry");
                dev_subscription_keys()
            }
        };

        let config = Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS")?.unwrap_or(10),
            jwt,
            subscription_keys,
            lockout: LockoutConfig {
                threshold: env_parse("LOCKOUT_THRESHOLD")?.unwrap_or(5),
                minutes: env_parse("LOCKOUT_MINUTES")?.unwrap_or(30),
            },
            hashing: HashConfig {
                memory_kib: env_parse("ARGON2_MEMORY_KIB")?,
                iterations: env_parse("ARGON2_ITERATIONS")?,
                parallelism: env_parse("ARGON2_PARALLELISM")?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks on values that feed duration arithmetic and the pool.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_TTL_MINUTES).contains(&self.jwt.ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {}, got {}",
            MAX_TTL_MINUTES,
            self.jwt.ttl_minutes
        );
        ensure!(
            self.lockout.threshold >= 1,
            "LOCKOUT_THRESHOLD must be at least 1"
        );
        ensure!(
            (1..=MAX_LOCKOUT_MINUTES).contains(&self.lockout.minutes),
            "LOCKOUT_MINUTES must be between 1 and {}, got {}",
            MAX_LOCKOUT_MINUTES,
            self.lockout.minutes
        );
        ensure!(
            self.db_max_connections >= 1,
            "DB_MAX_CONNECTIONS must be at least 1"
        );
        Ok(())
    }

    /// Config used by unit and router tests: in-memory store, cheap hashing.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24 * 7,
            },
            subscription_keys: vec![
                SubscriptionKey {
                    key: "test-key".into(),
                    name: "Test".into(),
                    active: true,
                    rate_limit: 100,
                },
                SubscriptionKey {
                    key: "retired-key".into(),
                    name: "Retired".into(),
                    active: false,
                    rate_limit: 100,
                },
            ],
            lockout: LockoutConfig {
                threshold: 5,
                minutes: 30,
            },
            hashing: HashConfig {
                memory_kib: Some(64),
                iterations: Some(1),
                parallelism: Some(1),
            },
        }
    }
}

fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(name, std::env::var(name).ok())
}

/// Unset means `None`; a value that is set but does not parse is an error.
fn parse_value<T>(name: &str, raw: Option<String>) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{name} has invalid value {v:?}: {e}")),
    }
}

pub fn parse_subscription_keys(raw: &str) -> anyhow::Result<Vec<SubscriptionKey>> {
    serde_json::from_str(raw).context("SUBSCRIPTION_KEYS must be a JSON array of keys")
}

fn dev_subscription_keys() -> Vec<SubscriptionKey> {
    vec![
        SubscriptionKey {
            key: "dev-subscription-key".into(),
            name: "Development".into(),
            active: true,
            rate_limit: 1000,
        },
        SubscriptionKey {
            key: "demo-subscription-key".into(),
            name: "Demo".into(),
            active: true,
            rate_limit: 100,
        },
    ]
}
