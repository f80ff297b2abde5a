/// Configuration management for the API server
///
/// Configuration comes from environment variables (and a `.env` file in
/// development).
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8000)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: `true` enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: signing key, at least 32 characters (required)
/// - `JWT_ACCESS_TTL_MINUTES`: access token lifetime (default: 60)
/// - `JWT_REFRESH_TTL_MINUTES`: refresh token lifetime (default: 1440)
/// - `BROADCAST_BACKEND`: `memory` or `redis` (default: memory)
/// - `REDIS_URL`: required when the backend is `redis`
/// - `REALTIME_SNAPSHOT_SCOPE`: `all` or `owner` (default: all)
/// - `REALTIME_QUEUE_CAPACITY`: per-connection event queue (default: 64)
/// - `RUST_LOG`: log filter
///
/// # Example
///
/// ```no_run
/// use taskhub_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use taskhub_shared::auth::jwt::TokenLifetimes;
use taskhub_shared::broadcast::DEFAULT_QUEUE_CAPACITY;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub broadcast: BroadcastConfig,
    pub realtime: RealtimeConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Longest accepted token lifetime: one year
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

impl JwtConfig {
    /// Token lifetimes, clamped to 1..=`MAX_TTL_MINUTES` minutes
    pub fn lifetimes(&self) -> TokenLifetimes {
        let minutes = |ttl: i64| Duration::minutes(ttl.clamp(1, MAX_TTL_MINUTES));
        TokenLifetimes {
            access: minutes(self.access_ttl_minutes),
            refresh: minutes(self.refresh_ttl_minutes),
        }
    }
}

/// Where change events are fanned out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastBackend {
    /// In-process only; a single server instance
    Memory,

    /// Redis pub/sub; any number of instances
    Redis,
}

impl FromStr for BroadcastBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BroadcastBackend::Memory),
            "redis" => Ok(BroadcastBackend::Redis),
            other => anyhow::bail!("unknown broadcast backend: {other} (expected memory or redis)"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub backend: BroadcastBackend,
    pub redis_url: Option<String>,
}

/// Which tasks a realtime push contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotScopeMode {
    /// Every task in the system
    All,

    /// Only the connected user's tasks; connections must authenticate
    Owner,
}

impl FromStr for SnapshotScopeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(SnapshotScopeMode::All),
            "owner" => Ok(SnapshotScopeMode::Owner),
            other => anyhow::bail!("unknown snapshot scope: {other} (expected all or owner)"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub snapshot_scope: SnapshotScopeMode,
    pub queue_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            snapshot_scope: SnapshotScopeMode::All,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value doesn't
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = parse_or(&var, "API_PORT", 8000u16)?;

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = parse_or(&var, "PRODUCTION", false)?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_ttl_minutes = parse_or(&var, "JWT_ACCESS_TTL_MINUTES", 60i64)?;
        let refresh_ttl_minutes = parse_or(&var, "JWT_REFRESH_TTL_MINUTES", 1440i64)?;
        for ttl in [access_ttl_minutes, refresh_ttl_minutes] {
            if !(1..=MAX_TTL_MINUTES).contains(&ttl) {
                anyhow::bail!(
                    "JWT token lifetimes must be between 1 and {} minutes",
                    MAX_TTL_MINUTES
                );
            }
        }

        let backend = parse_or(&var, "BROADCAST_BACKEND", BroadcastBackend::Memory)?;
        let redis_url = var("REDIS_URL");
        if backend == BroadcastBackend::Redis && redis_url.is_none() {
            anyhow::bail!("REDIS_URL is required when BROADCAST_BACKEND=redis");
        }

        let snapshot_scope = parse_or(&var, "REALTIME_SNAPSHOT_SCOPE", SnapshotScopeMode::All)?;
        let queue_capacity = parse_or(&var, "REALTIME_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;
        if queue_capacity == 0 {
            anyhow::bail!("REALTIME_QUEUE_CAPACITY must be at least 1");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_minutes,
                refresh_ttl_minutes,
            },
            broadcast: BroadcastConfig { backend, redis_url },
            realtime: RealtimeConfig {
                snapshot_scope,
                queue_capacity,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
