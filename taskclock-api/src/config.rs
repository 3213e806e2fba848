/// API server configuration
///
/// Loaded from environment variables (a `.env` file is honored in
/// development):
///
/// | Variable                   | Default     | Notes                                 |
/// |----------------------------|-------------|---------------------------------------|
/// | `API_HOST`                 | `0.0.0.0`   |                                       |
/// | `API_PORT`                 | `8080`      |                                       |
/// | `DATABASE_URL`             | required    | `memory://` selects the in-memory store |
/// | `DATABASE_MAX_CONNECTIONS` | `10`        |                                       |
/// | `JWT_SECRET`               | required    | at least 32 characters                |
/// | `REDIS_URL`                | unset       | unset: events are only logged         |
/// | `REPORT_CACHE_TTL_SECS`    | `30`        | must be below 60; 0 disables          |
/// | `CORS_ORIGINS`             | `*`         | comma-separated                       |

use serde::{Deserialize, Serialize};
use std::env;

/// `DATABASE_URL` value selecting the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory://";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    /// `None` when Redis is not configured
    pub redis_url: Option<String>,

    pub reports: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report cache TTL in seconds
    pub cache_ttl_secs: u64,
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup` (one call per variable)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = lookup("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let redis_url = lookup("REDIS_URL").filter(|url| !url.is_empty());

        let cache_ttl_secs = lookup("REPORT_CACHE_TTL_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()?;

        if cache_ttl_secs >= 60 {
            anyhow::bail!("REPORT_CACHE_TTL_SECS must be below 60");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            redis_url,
            reports: ReportConfig { cache_ttl_secs },
        })
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
