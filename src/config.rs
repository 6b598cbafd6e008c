use anyhow::{anyhow, bail, Context};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Database connection parameters, one field per `DB_*` variable.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub connection: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    /// `DATABASE_URL`; wins over the individual parameters when set.
    pub url: Option<String>,
}

/// Longest remember cookie lifetime accepted from config: one year.
pub const MAX_REMEMBER_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct RememberConfig {
    pub ttl_minutes: i64,
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub hmac_secret: String,
    pub remember: RememberConfig,
    pub views_dir: String,
    pub refresh_db: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let connection = var("DB_CONNECTION").unwrap_or_else(|| "postgres".into());
        if connection != "postgres" {
            bail!("DB_CONNECTION={connection} is not supported, expected postgres");
        }

        let database = DatabaseConfig {
            connection,
            host: var("DB_HOST").unwrap_or_else(|| "localhost".into()),
            port: parse_or(var("DB_PORT"), "DB_PORT", 5432)?,
            database: var("DB_DATABASE").unwrap_or_default(),
            username: var("DB_USERNAME").unwrap_or_default(),
            password: var("DB_PASSWORD").unwrap_or_default(),
            max_connections: parse_or(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            url: var("DATABASE_URL"),
        };

        let ttl_minutes = parse_or(
            var("REMEMBER_TOKEN_TTL_MINUTES"),
            "REMEMBER_TOKEN_TTL_MINUTES",
            60,
        )?;
        if !(1..=MAX_REMEMBER_TTL_MINUTES).contains(&ttl_minutes) {
            bail!(
                "invalid value for REMEMBER_TOKEN_TTL_MINUTES: {ttl_minutes}, \
                 expected 1..={MAX_REMEMBER_TTL_MINUTES}"
            );
        }

        let hmac_secret =
            var("HMAC_SECRET_KEY").ok_or_else(|| anyhow!("HMAC_SECRET_KEY must be set"))?;

        Ok(Self {
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(var("APP_PORT"), "APP_PORT", 8080)?,
            database,
            hmac_secret,
            remember: RememberConfig {
                ttl_minutes,
                secure: parse_or(var("COOKIE_SECURE"), "COOKIE_SECURE", false)?,
            },
            views_dir: var("VIEWS_DIR").unwrap_or_else(|| "resources/views".into()),
            refresh_db: parse_or(var("DB_REFRESH"), "DB_REFRESH", false)?,
        })
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url.parse().context("parse DATABASE_URL");
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(PgSslMode::Disable))
    }

    /// Connection string safe to put in logs.
    pub fn redacted(&self) -> String {
        match &self.url {
            Some(_) => "DATABASE_URL".to_string(),
            None => format!(
                "host={} port={} user={} password=*** dbname={} sslmode=disable",
                self.host, self.port, self.username, self.database
            ),
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid value for {key}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "HMAC_SECRET_KEY" => Some("test-secret".into()),
        "VIEWS_DIR" => Some(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/views").into()),
        _ => None,
    })
    .expect("test config")
}
