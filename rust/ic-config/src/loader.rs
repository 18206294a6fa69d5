//! C12: JSON config loader + targeted persister.
//!
//! Grounded on `knhk_config::config::load_config` (load hierarchy, env
//! overrides, validation) and `knhk-sidecar::config::SidecarConfig::from_file`,
//! adapted from TOML to the JSON format the spec's §6 config file contract
//! requires. Persistence keeps the original `serde_json::Value` document
//! around so in-place updates touch only the field(s) being changed and
//! preserve every other key exactly as written, matching the spec's
//! "preserve unrelated keys and existing indentation style" requirement.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{AppConfig, ClientConfigEntry};

/// 4-space indentation, matching the reference implementation.
const INDENT: &[u8] = b"    ";

/// Owns the on-disk JSON document and a typed view of it.
///
/// `raw` is the source of truth for serialization (it preserves key order
/// and any fields `AppConfig` doesn't model); `typed` is rebuilt from `raw`
/// on every load and after every mutation so callers never observe drift
/// between the two.
pub struct ConfigStore {
    path: PathBuf,
    raw: Value,
    typed: AppConfig,
}

impl ConfigStore {
    /// Load from `path`, applying environment overrides and validating.
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut raw: Value = serde_json::from_str(&content)?;
        apply_env_overrides(&mut raw);

        let typed: AppConfig = serde_json::from_value(raw.clone())?;
        validate(&typed)?;

        info!(path = %path.display(), "loaded configuration");
        Ok(Self { path, raw, typed })
    }

    pub fn typed(&self) -> &AppConfig {
        &self.typed
    }

    /// Rebuild `typed` from `raw` and validate. Call after any mutation of
    /// `raw` that bypasses the dedicated helper methods below.
    fn resync(&mut self) -> ConfigResult<()> {
        let typed: AppConfig = serde_json::from_value(self.raw.clone())?;
        validate(&typed)?;
        self.typed = typed;
        Ok(())
    }

    /// Persist the current document to disk with a 4-space pretty printer,
    /// via write-then-rename so a crash never leaves a half-written file.
    pub fn persist(&self) -> ConfigResult<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&self.raw, &mut ser)?;

        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, &buf).map_err(|source| ConfigError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Targeted in-place update of a single field, addressed by JSON
    /// Pointer (e.g. `/app/port`, `/auth/enabled`). This is the mechanism
    /// the operator CLI uses for single-field edits without touching
    /// anything else in the document.
    pub fn set_field(&mut self, pointer: &str, value: Value) -> ConfigResult<()> {
        let target = self
            .raw
            .pointer_mut(pointer)
            .ok_or_else(|| ConfigError::UnknownField(pointer.to_string()))?;
        *target = value;
        self.resync()?;
        self.persist()
    }

    /// Snapshot of the current client list (typed).
    pub fn clients(&self) -> &[ClientConfigEntry] {
        &self.typed.auth.clients
    }

    /// Append a new client to `auth.clients` and persist to disk. Fails
    /// if `client_id` already exists. Caller (C1) is responsible for
    /// applying the in-memory registry change first and rolling it back
    /// if this fails — this is the "persist" half of that dual write, so
    /// it writes through to disk rather than only updating the in-memory
    /// document, per §4.1's "persist the updated config file".
    pub fn add_client(&mut self, entry: ClientConfigEntry) -> ConfigResult<()> {
        if self
            .typed
            .auth
            .clients
            .iter()
            .any(|c| c.client_id == entry.client_id)
        {
            return Err(ConfigError::DuplicateClient(entry.client_id));
        }
        let clients = self
            .raw
            .pointer_mut("/auth/clients")
            .ok_or_else(|| ConfigError::UnknownField("/auth/clients".to_string()))?;
        let arr = clients
            .as_array_mut()
            .ok_or_else(|| ConfigError::UnknownField("/auth/clients".to_string()))?;
        arr.push(serde_json::to_value(&entry)?);
        self.resync()?;
        self.persist()
    }

    /// Replace an existing client entry in place.
    pub fn update_client(&mut self, entry: ClientConfigEntry) -> ConfigResult<()> {
        let idx = self
            .typed
            .auth
            .clients
            .iter()
            .position(|c| c.client_id == entry.client_id)
            .ok_or_else(|| ConfigError::UnknownClient(entry.client_id.clone()))?;
        let clients = self
            .raw
            .pointer_mut("/auth/clients")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| ConfigError::UnknownField("/auth/clients".to_string()))?;
        clients[idx] = serde_json::to_value(&entry)?;
        self.resync()?;
        self.persist()
    }

    /// Remove a client entry by id and persist to disk.
    pub fn remove_client(&mut self, client_id: &str) -> ConfigResult<()> {
        let idx = self
            .typed
            .auth
            .clients
            .iter()
            .position(|c| c.client_id == client_id)
            .ok_or_else(|| ConfigError::UnknownClient(client_id.to_string()))?;
        let clients = self
            .raw
            .pointer_mut("/auth/clients")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| ConfigError::UnknownField("/auth/clients".to_string()))?;
        clients.remove(idx);
        self.resync()?;
        self.persist()
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Applies env var overrides documented in §6: `MAXMIND_ACCOUNT_ID`,
/// `MAXMIND_LICENSE_KEY`. Unknown/unrelated env vars are ignored.
fn apply_env_overrides(raw: &mut Value) {
    if let Ok(account_id) = std::env::var("MAXMIND_ACCOUNT_ID") {
        if let Some(maxmind) = raw.pointer_mut("/maxmind") {
            maxmind["account_id"] = Value::String(account_id);
        }
    }
    if let Ok(license_key) = std::env::var("MAXMIND_LICENSE_KEY") {
        if let Some(maxmind) = raw.pointer_mut("/maxmind") {
            maxmind["license_key"] = Value::String(license_key);
        }
    }
}

/// Structural validation beyond what serde enforces: each client's
/// credential field must match its declared `auth_type`.
fn validate(config: &AppConfig) -> ConfigResult<()> {
    let mut seen = std::collections::HashSet::new();
    for client in &config.auth.clients {
        if !seen.insert(client.client_id.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate client_id in config: {}",
                client.client_id
            )));
        }
        match client.auth_type {
            crate::schema::AuthType::Asymmetric => {
                if client.public_key_path.is_none() || client.symmetric_secret.is_some() {
                    return Err(ConfigError::Validation(format!(
                        "client {} is asymmetric but has no public_key_path, or has a symmetric_secret set",
                        client.client_id
                    )));
                }
            }
            crate::schema::AuthType::Symmetric => {
                if client.symmetric_secret.is_none() || client.public_key_path.is_some() {
                    return Err(ConfigError::Validation(format!(
                        "client {} is symmetric but has no symmetric_secret, or has a public_key_path set",
                        client.client_id
                    )));
                }
            }
        }
        if client.permissions.is_empty() {
            warn!(client_id = %client.client_id, "client has no permissions granted");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_doc() -> &'static str {
        r#"{
    "app": { "name": "insight-collector", "port": 8080 },
    "influxdb": { "url": "http://localhost:8086", "token": "t", "org": "o", "bucket": "b" },
    "redis": { "url": "redis://localhost:6379" },
    "asynq": { "concurrency": 10 },
    "auth": {
        "enabled": true,
        "algorithm": "SYM256",
        "clients": [
            { "client_id": "ab12", "client_name": "n", "auth_type": "symmetric", "symmetric_secret": "s", "permissions": ["read:ping"], "active": true }
        ]
    },
    "maxmind": {}
}"#
    }

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_parses_and_validates() {
        let f = write_temp(sample_doc());
        let store = ConfigStore::load(f.path()).unwrap();
        assert_eq!(store.typed().app.port, 8080);
        assert_eq!(store.clients().len(), 1);
    }

    #[test]
    fn add_update_remove_round_trip() {
        let f = write_temp(sample_doc());
        let path = f.path().to_path_buf();
        let mut store = ConfigStore::load(&path).unwrap();

        store
            .add_client(ClientConfigEntry {
                client_id: "cd34".to_string(),
                client_name: "second".to_string(),
                auth_type: crate::schema::AuthType::Symmetric,
                public_key_path: None,
                symmetric_secret: Some("s2".to_string()),
                permissions: vec!["read:x".to_string()],
                active: true,
            })
            .unwrap();
        assert_eq!(store.clients().len(), 2);
        assert!(matches!(
            store.add_client(ClientConfigEntry {
                client_id: "cd34".to_string(),
                client_name: "dup".to_string(),
                auth_type: crate::schema::AuthType::Symmetric,
                public_key_path: None,
                symmetric_secret: Some("s3".to_string()),
                permissions: vec![],
                active: true,
            }),
            Err(ConfigError::DuplicateClient(_))
        ));

        store.persist().unwrap();
        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.clients().len(), 2);
        // unrelated key preserved
        assert_eq!(reloaded.typed().app.name, "insight-collector");

        let mut store = reloaded;
        store.remove_client("cd34").unwrap();
        assert_eq!(store.clients().len(), 1);
        assert!(matches!(
            store.remove_client("cd34"),
            Err(ConfigError::UnknownClient(_))
        ));
    }

    #[test]
    fn set_field_updates_single_pointer() {
        let f = write_temp(sample_doc());
        let mut store = ConfigStore::load(f.path()).unwrap();
        store
            .set_field("/app/port", Value::Number(9090.into()))
            .unwrap();
        assert_eq!(store.typed().app.port, 9090);
        assert!(store.set_field("/does/not/exist", Value::Null).is_err());
    }
}
