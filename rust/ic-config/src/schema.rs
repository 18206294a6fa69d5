//! Typed view of the `./.config.json` document (§6, §3 ClientRecord).

use serde::{Deserialize, Serialize};

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub influxdb: InfluxDbSection,
    pub redis: RedisSection,
    pub asynq: AsynqSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub maxmind: MaxmindSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub name: String,
    #[serde(default = "default_env")]
    pub env: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_env() -> String {
    "production".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxDbSection {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_query_timeout_ms() -> u64 {
    60_000
}
fn default_write_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSection {
    pub url: String,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_health_ping_timeout_ms")]
    pub health_ping_timeout_ms: u64,
}

fn default_redis_pool_size() -> u32 {
    10
}
fn default_health_ping_timeout_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsynqSection {
    pub concurrency: u32,
    #[serde(default)]
    pub redis_db: u32,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_ttl_ms")]
    pub heartbeat_ttl_ms: u64,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_heartbeat_interval_ms() -> u64 {
    15_000
}
fn default_heartbeat_ttl_ms() -> u64 {
    60_000
}
fn default_shutdown_grace_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    pub enabled: bool,
    pub algorithm: SignatureAlgorithm,
    #[serde(default)]
    pub skip_missing_credentials: bool,
    #[serde(default)]
    pub clients: Vec<ClientConfigEntry>,
}

/// Bearer/signature algorithm label, per spec §4.2/§9 open question 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "AS256")]
    Asymmetric256,
    #[serde(rename = "AS512")]
    Asymmetric512,
    #[serde(rename = "SYM256")]
    Symmetric256,
    #[serde(rename = "SYM512")]
    Symmetric512,
}

impl SignatureAlgorithm {
    pub fn is_asymmetric(self) -> bool {
        matches!(self, Self::Asymmetric256 | Self::Asymmetric512)
    }
}

/// `auth_type` of a client record (§3 ClientRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Asymmetric,
    Symmetric,
}

/// On-disk shape of a `ClientRecord` (§3). The credential field that does
/// not match `auth_type` is always `None`; this is validated, not just
/// documented, by `validate_client`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfigEntry {
    pub client_id: String,
    pub client_name: String,
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric_secret: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaxmindSection {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub db_path: Option<String>,
}
