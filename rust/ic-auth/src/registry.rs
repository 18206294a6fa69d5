//! C1: Client Registry.
//!
//! Read-mostly, read-write-locked in-memory cache dual-written with the
//! on-disk config (`ic_config::ConfigStore`), grounded on the
//! apply-memory-first / persist-second / rollback-on-failure pattern in
//! §9 design notes and the `HealthChecker` style of wrapping shared state
//! behind a small typed API in `knhk-sidecar::health`.

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use ic_config::{AuthType, ClientConfigEntry, ConfigStore};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::{RegistryError, RegistryResult};

/// Verification material for a single client, parsed once at load time.
#[derive(Clone)]
pub enum Credential {
    Asymmetric(Box<VerifyingKey>),
    Symmetric(Vec<u8>),
}

/// In-memory view of a `ClientRecord` (§3), principal-ready.
#[derive(Clone)]
pub struct ClientEntry {
    pub client_id: String,
    pub client_name: String,
    pub credential: Credential,
    pub permissions: Vec<String>,
    pub active: bool,
}

/// C1: hot-reloadable client-id -> credential + permissions map.
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, ClientEntry>>,
    config: Arc<parking_lot::Mutex<ConfigStore>>,
    skip_missing_credentials: bool,
}

impl ClientRegistry {
    /// C1 `init`: load all declared clients from `config`. Inactive
    /// clients still get a config-backed entry (so flipping `active` plus
    /// `reload` is enough to bring them up) but their credential file is
    /// skipped unless present, matching "skips inactive ones from key
    /// loading but still records their config".
    pub fn init(config: Arc<parking_lot::Mutex<ConfigStore>>) -> RegistryResult<Arc<Self>> {
        let skip_missing_credentials = config.lock().typed().auth.skip_missing_credentials;
        let registry = Arc::new(Self {
            clients: RwLock::new(HashMap::new()),
            config,
            skip_missing_credentials,
        });
        registry.reload()?;
        Ok(registry)
    }

    fn load_credential(entry: &ClientConfigEntry) -> RegistryResult<Option<Credential>> {
        match entry.auth_type {
            AuthType::Asymmetric => {
                let path = entry.public_key_path.as_deref().ok_or_else(|| {
                    RegistryError::MissingCredentialField(entry.client_id.clone())
                })?;
                match std::fs::read_to_string(path) {
                    Ok(contents) => {
                        let bytes = hex::decode(contents.trim()).map_err(|e| {
                            RegistryError::ParseFailure(format!(
                                "client {}: invalid public key hex: {e}",
                                entry.client_id
                            ))
                        })?;
                        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                            RegistryError::ParseFailure(format!(
                                "client {}: public key must be 32 bytes",
                                entry.client_id
                            ))
                        })?;
                        let key = VerifyingKey::from_bytes(&arr).map_err(|e| {
                            RegistryError::ParseFailure(format!(
                                "client {}: invalid ed25519 public key: {e}",
                                entry.client_id
                            ))
                        })?;
                        Ok(Some(Credential::Asymmetric(Box::new(key))))
                    }
                    Err(_) => Err(RegistryError::MissingCredentialFile(path.to_string())),
                }
            }
            AuthType::Symmetric => {
                let secret = entry.symmetric_secret.as_deref().ok_or_else(|| {
                    RegistryError::MissingCredentialField(entry.client_id.clone())
                })?;
                Ok(Some(Credential::Symmetric(secret.as_bytes().to_vec())))
            }
        }
    }

    /// C1 `get`: look up a client by id.
    pub fn get(&self, client_id: &str) -> Option<ClientEntry> {
        self.clients.read().get(client_id).cloned()
    }

    /// Snapshot of every currently-loaded client, for the operator CLI's
    /// `client list` subcommand. Not part of C1's formal operation list
    /// in §4.1 but needed to display registry state without reaching
    /// into the config file directly.
    pub fn list(&self) -> Vec<ClientEntry> {
        let mut entries: Vec<ClientEntry> = self.clients.read().values().cloned().collect();
        entries.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        entries
    }

    /// C1 `add`: apply to memory first, then persist; roll back memory on
    /// persist failure.
    pub fn add(&self, entry: ClientConfigEntry) -> RegistryResult<()> {
        if self.clients.read().contains_key(&entry.client_id) {
            return Err(RegistryError::DuplicateClient(entry.client_id));
        }

        let in_memory = match Self::load_credential(&entry) {
            Ok(Some(cred)) => Some(cred),
            Ok(None) => None,
            Err(e) if self.skip_missing_credentials => {
                warn!(client_id = %entry.client_id, error = %e, "skipping missing credential, client added inactive");
                None
            }
            Err(e) => return Err(e),
        };

        let active = in_memory.is_some() && entry.active;
        if let Some(credential) = in_memory {
            self.clients.write().insert(
                entry.client_id.clone(),
                ClientEntry {
                    client_id: entry.client_id.clone(),
                    client_name: entry.client_name.clone(),
                    credential,
                    permissions: dedup_preserve_order(&entry.permissions),
                    active,
                },
            );
        }

        if let Err(e) = self.config.lock().add_client(entry.clone()) {
            self.clients.write().remove(&entry.client_id);
            return Err(RegistryError::PersistFailed(e));
        }
        info!(client_id = %entry.client_id, "client added");
        Ok(())
    }

    /// C1 `update`: same dual-write-with-rollback discipline as `add`.
    pub fn update(&self, entry: ClientConfigEntry) -> RegistryResult<()> {
        let previous = self
            .clients
            .read()
            .get(&entry.client_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownClient(entry.client_id.clone()))?;

        let credential = match Self::load_credential(&entry) {
            Ok(Some(cred)) => cred,
            Ok(None) => previous.credential.clone(),
            Err(e) if self.skip_missing_credentials => {
                warn!(client_id = %entry.client_id, error = %e, "keeping previous credential after missing-credential update");
                previous.credential.clone()
            }
            Err(e) => return Err(e),
        };

        self.clients.write().insert(
            entry.client_id.clone(),
            ClientEntry {
                client_id: entry.client_id.clone(),
                client_name: entry.client_name.clone(),
                credential,
                permissions: dedup_preserve_order(&entry.permissions),
                active: entry.active,
            },
        );

        if let Err(e) = self.config.lock().update_client(entry.clone()) {
            self.clients.write().insert(entry.client_id.clone(), previous);
            return Err(RegistryError::PersistFailed(e));
        }
        info!(client_id = %entry.client_id, "client updated");
        Ok(())
    }

    /// C1 `remove`: remove in-memory, then persist. Persist failure is
    /// reported but *not* rolled back — `reload` restores consistency.
    pub fn remove(&self, client_id: &str) -> RegistryResult<()> {
        if self.clients.write().remove(client_id).is_none() {
            return Err(RegistryError::UnknownClient(client_id.to_string()));
        }
        if let Err(e) = self.config.lock().remove_client(client_id) {
            warn!(client_id, error = %e, "in-memory removal succeeded but persistence failed; run reload");
            return Err(RegistryError::PersistFailed(e));
        }
        info!(client_id, "client removed");
        Ok(())
    }

    /// C1 `reload`: rebuild the entire in-memory map from the on-disk
    /// config, aborting unless `skip_missing_credentials` is set.
    pub fn reload(&self) -> RegistryResult<()> {
        let declared: Vec<ClientConfigEntry> =
            self.config.lock().clients().to_vec();

        let mut next = HashMap::new();
        for entry in declared {
            match Self::load_credential(&entry) {
                Ok(Some(credential)) => {
                    next.insert(
                        entry.client_id.clone(),
                        ClientEntry {
                            client_id: entry.client_id.clone(),
                            client_name: entry.client_name,
                            credential,
                            permissions: dedup_preserve_order(&entry.permissions),
                            active: entry.active,
                        },
                    );
                }
                Ok(None) => {}
                Err(e) if self.skip_missing_credentials => {
                    warn!(client_id = %entry.client_id, error = %e, "skipping client with missing credential");
                }
                Err(e) => return Err(e),
            }
        }

        *self.clients.write() = next;
        info!(count = self.clients.read().len(), "client registry reloaded");
        Ok(())
    }
}

fn dedup_preserve_order(perms: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    perms
        .iter()
        .filter(|p| seen.insert((*p).clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_config::AuthType;
    use std::io::Write;

    fn base_doc() -> &'static str {
        r#"{
    "app": { "name": "ic", "port": 8080 },
    "influxdb": { "url": "http://x", "token": "t", "org": "o", "bucket": "b" },
    "redis": { "url": "redis://x" },
    "asynq": { "concurrency": 1 },
    "auth": { "enabled": true, "algorithm": "SYM256", "clients": [] },
    "maxmind": {}
}"#
    }

    fn setup() -> (tempfile::NamedTempFile, Arc<parking_lot::Mutex<ConfigStore>>) {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(base_doc().as_bytes()).unwrap();
        let store = ConfigStore::load(f.path()).unwrap();
        (f, Arc::new(parking_lot::Mutex::new(store)))
    }

    #[test]
    fn add_get_remove_round_trip() {
        let (_f, store) = setup();
        let registry = ClientRegistry::init(store).unwrap();

        let entry = ClientConfigEntry {
            client_id: "ab12".to_string(),
            client_name: "n".to_string(),
            auth_type: AuthType::Symmetric,
            public_key_path: None,
            symmetric_secret: Some("S".to_string()),
            permissions: vec!["read:ping".to_string(), "read:ping".to_string()],
            active: true,
        };
        registry.add(entry).unwrap();

        let fetched = registry.get("ab12").unwrap();
        assert_eq!(fetched.permissions, vec!["read:ping".to_string()]);
        assert!(fetched.active);

        registry.remove("ab12").unwrap();
        assert!(registry.get("ab12").is_none());
    }

    #[test]
    fn duplicate_add_fails_and_leaves_state_untouched() {
        let (_f, store) = setup();
        let registry = ClientRegistry::init(store).unwrap();
        let entry = ClientConfigEntry {
            client_id: "ab12".to_string(),
            client_name: "n".to_string(),
            auth_type: AuthType::Symmetric,
            public_key_path: None,
            symmetric_secret: Some("S".to_string()),
            permissions: vec![],
            active: true,
        };
        registry.add(entry.clone()).unwrap();
        assert!(matches!(
            registry.add(entry),
            Err(RegistryError::DuplicateClient(_))
        ));
    }
}
