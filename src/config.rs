use anyhow::Context;
use serde::Deserialize;

/// One year.
pub const MAX_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET is not set")?;
        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "authgate".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "authgate-users".into()),
            ttl_hours: match lookup("JWT_TTL_HOURS") {
                Some(v) => v
                    .parse::<i64>()
                    .ok()
                    .filter(|h| (1..=MAX_TTL_HOURS).contains(h))
                    .with_context(|| {
                        format!("invalid JWT_TTL_HOURS {v:?}, expected 1..={MAX_TTL_HOURS}")
                    })?,
                None => 24,
            },
        };

        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid PORT {v:?}"))?,
            None => 3000,
        };

        Ok(Self {
            database_url,
            jwt,
            host,
            port,
        })
    }
}
