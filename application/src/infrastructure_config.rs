use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub worker_ws: WorkerWsConfig,
    pub ui_ws: UiWsConfig,
    pub rate_limit: RateLimitConfig,
    pub dispatch: DispatchConfig,
    pub guard: GuardDefaultsConfig,
    pub logging: LoggingConfig,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: SecretString,
    pub pool_size: u32,
    pub query_timeout_secs: u64,
}

impl Serialize for DbConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DbConfig", 3)?;
        state.serialize_field("database_url", "[REDACTED]")?;
        state.serialize_field("pool_size", &self.pool_size)?;
        state.serialize_field("query_timeout_secs", &self.query_timeout_secs)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for DbConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct DbConfigHelper {
            database_url: String,
            #[serde(default = "default_pool_size")]
            pool_size: u32,
            #[serde(default = "default_query_timeout")]
            query_timeout_secs: u64,
        }

        fn default_pool_size() -> u32 {
            10
        }

        fn default_query_timeout() -> u64 {
            5
        }

        let helper = DbConfigHelper::deserialize(deserializer)?;
        Ok(DbConfig {
            database_url: SecretString::from(helper.database_url),
            pool_size: helper.pool_size,
            query_timeout_secs: helper.query_timeout_secs,
        })
    }
}

impl DbConfig {
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let url_str = self.database_url.expose_secret();
        match url_str.split_once('@') {
            Some((_, rest)) => format!("postgresql://***:***@{rest}"),
            None => url_str.to_string(),
        }
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        self.database_url.expose_secret()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerWsConfig {
    pub broadcast_buffer_size: usize,
    pub max_connections: Option<usize>,
    pub connection_buffer_size: usize,
    pub drop_newest_on_full_buffer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiWsConfig {
    pub broadcast_buffer_size: usize,
    pub max_connections: Option<usize>,
    pub connection_buffer_size: usize,
    pub drop_newest_on_full_buffer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub worker_messages_per_minute: u32,
    pub http_requests_per_minute: u32,
    pub burst_size_multiplier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub inter_tile_delay_min_secs: f64,
    pub inter_tile_delay_max_secs: f64,
    pub round_retry_deadline_secs: u64,
    pub one_batch_retry_deadline_secs: u64,
    pub retry_poll_interval_ms: u64,
    pub compression_threshold_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardDefaultsConfig {
    pub protection_pattern: String,
    pub pixels_per_batch: u32,
    pub recent_lock_seconds: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_location: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "pretty")]
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origin: None,
            },
            db: DbConfig {
                database_url: SecretString::from("postgresql://localhost/orchestrator"),
                pool_size: 10,
                query_timeout_secs: 5,
            },
            worker_ws: WorkerWsConfig {
                broadcast_buffer_size: 1000,
                max_connections: None,
                connection_buffer_size: 100,
                drop_newest_on_full_buffer: false,
            },
            ui_ws: UiWsConfig {
                broadcast_buffer_size: 1000,
                max_connections: None,
                connection_buffer_size: 100,
                drop_newest_on_full_buffer: false,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                worker_messages_per_minute: 600,
                http_requests_per_minute: 300,
                burst_size_multiplier: 2,
            },
            dispatch: DispatchConfig {
                inter_tile_delay_min_secs: 5.0,
                inter_tile_delay_max_secs: 10.0,
                round_retry_deadline_secs: 90,
                one_batch_retry_deadline_secs: 45,
                retry_poll_interval_ms: 300,
                compression_threshold_bytes: 5 * 1024 * 1024,
            },
            guard: GuardDefaultsConfig {
                protection_pattern: "random".to_string(),
                pixels_per_batch: 50,
                recent_lock_seconds: 60,
                max_retries: 3,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                include_location: false,
            },
            environment: EnvironmentConfig {
                env: "development".to_string(),
            },
        }
    }
}

impl Config {
    pub fn validate(&self) -> AppResult<()> {
        if self.db.database_url.expose_secret().is_empty() {
            return Err(AppError::ConfigError {
                message: "database_url cannot be empty".to_string(),
            });
        }

        if self.db.pool_size == 0 {
            return Err(AppError::ConfigError {
                message: "db pool_size must be greater than 0".to_string(),
            });
        }

        if self.worker_ws.broadcast_buffer_size == 0 || self.ui_ws.broadcast_buffer_size == 0 {
            return Err(AppError::ConfigError {
                message: "broadcast_buffer_size must be greater than 0".to_string(),
            });
        }

        if self.worker_ws.connection_buffer_size == 0 || self.ui_ws.connection_buffer_size == 0 {
            return Err(AppError::ConfigError {
                message: "connection_buffer_size must be greater than 0".to_string(),
            });
        }

        if self.rate_limit.enabled
            && (self.rate_limit.worker_messages_per_minute == 0
                || self.rate_limit.http_requests_per_minute == 0)
        {
            return Err(AppError::ConfigError {
                message: "rate limit values must be greater than 0 when enabled".to_string(),
            });
        }

        if self.rate_limit.enabled && self.rate_limit.burst_size_multiplier == 0 {
            return Err(AppError::ConfigError {
                message: "burst_size_multiplier must be greater than 0".to_string(),
            });
        }

        if self.dispatch.inter_tile_delay_min_secs > self.dispatch.inter_tile_delay_max_secs {
            return Err(AppError::ConfigError {
                message: "inter_tile_delay_min_secs must be <= inter_tile_delay_max_secs"
                    .to_string(),
            });
        }

        if self.dispatch.retry_poll_interval_ms == 0 {
            return Err(AppError::ConfigError {
                message: "retry_poll_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.guard.pixels_per_batch == 0 {
            return Err(AppError::ConfigError {
                message: "pixels_per_batch must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
