// rust/ic-cli/src/main.rs
// Insight-Collector operator CLI: client registry (C1), worker queue
// config (C7), and config-file (C12) operations. Every mutating
// subcommand goes through the same components the HTTP process uses —
// no parallel code path, per SPEC_FULL §0.

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use ic_auth::ClientRegistry;
use ic_config::{AuthType, ClientConfigEntry, ConfigStore};
use ic_queue::{JobRegistry, RedisClient, WorkerConfigStore};

/// §6: `CLI_QUIET_MODE` suppresses startup logs for CLI invocations.
fn quiet_mode() -> bool {
    std::env::var("CLI_QUIET_MODE")
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

#[derive(Parser)]
#[command(name = "insight-collector-cli")]
#[command(about = "Operator CLI for Insight-Collector's client registry and worker config")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the JSON config file (§6).
    #[arg(long, env = "CONFIG_PATH", default_value = "./.config.json", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Client registry operations (C1).
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Worker queue config operations (C7).
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Config-file operations (C12).
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliAuthType {
    Asymmetric,
    Symmetric,
}

impl From<CliAuthType> for AuthType {
    fn from(v: CliAuthType) -> Self {
        match v {
            CliAuthType::Asymmetric => AuthType::Asymmetric,
            CliAuthType::Symmetric => AuthType::Symmetric,
        }
    }
}

#[derive(Subcommand)]
enum ClientAction {
    /// Register a new client. Exactly one of `--public-key-path` /
    /// `--symmetric-secret` should be given, matching `auth_type`.
    Add {
        client_id: String,
        client_name: String,
        #[arg(long, value_enum)]
        auth_type: CliAuthType,
        #[arg(long)]
        public_key_path: Option<String>,
        #[arg(long)]
        symmetric_secret: Option<String>,
        #[arg(long, value_delimiter = ',')]
        permissions: Vec<String>,
        #[arg(long, default_value_t = true)]
        active: bool,
    },
    /// Replace an existing client's fields.
    Update {
        client_id: String,
        client_name: String,
        #[arg(long, value_enum)]
        auth_type: CliAuthType,
        #[arg(long)]
        public_key_path: Option<String>,
        #[arg(long)]
        symmetric_secret: Option<String>,
        #[arg(long, value_delimiter = ',')]
        permissions: Vec<String>,
        #[arg(long, default_value_t = true)]
        active: bool,
    },
    /// Delete a client by id.
    Remove { client_id: String },
    /// List every loaded client (id, name, active flag, permissions).
    List,
    /// Rebuild the in-memory registry from the on-disk config.
    Reload,
}

#[derive(Subcommand)]
enum WorkerAction {
    /// Set (or create) a queue's weight and task-type assignment.
    Set {
        name: String,
        percentage: u32,
        #[arg(long, value_delimiter = ',')]
        task_types: Vec<String>,
    },
    /// List configured queues with their percentage and task types.
    List,
    /// Reset worker config to the job-registry-derived defaults.
    Reset,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the currently loaded, typed config document.
    Show,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if !quiet_mode() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    let cli = Cli::parse();
    let store = ConfigStore::load(&cli.config)?;
    let config = Arc::new(parking_lot::Mutex::new(store));

    match cli.command {
        Commands::Client { action } => run_client(config, action)?,
        Commands::Worker { action } => run_worker(config, action).await?,
        Commands::Config { action } => run_config(&config, action),
    }

    Ok(())
}

fn run_client(
    config: Arc<parking_lot::Mutex<ConfigStore>>,
    action: ClientAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ClientRegistry::init(config)?;
    match action {
        ClientAction::Add {
            client_id,
            client_name,
            auth_type,
            public_key_path,
            symmetric_secret,
            permissions,
            active,
        } => {
            let entry = ClientConfigEntry {
                client_id: client_id.clone(),
                client_name,
                auth_type: auth_type.into(),
                public_key_path,
                symmetric_secret,
                permissions,
                active,
            };
            registry.add(entry)?;
            println!("client added: {client_id}");
        }
        ClientAction::Update {
            client_id,
            client_name,
            auth_type,
            public_key_path,
            symmetric_secret,
            permissions,
            active,
        } => {
            let entry = ClientConfigEntry {
                client_id: client_id.clone(),
                client_name,
                auth_type: auth_type.into(),
                public_key_path,
                symmetric_secret,
                permissions,
                active,
            };
            registry.update(entry)?;
            println!("client updated: {client_id}");
        }
        ClientAction::Remove { client_id } => {
            registry.remove(&client_id)?;
            println!("client removed: {client_id}");
        }
        ClientAction::List => {
            for entry in registry.list() {
                println!(
                    "{}\t{}\tactive={}\tpermissions={}",
                    entry.client_id,
                    entry.client_name,
                    entry.active,
                    entry.permissions.join(",")
                );
            }
        }
        ClientAction::Reload => {
            registry.reload()?;
            println!("registry reloaded from config file");
        }
    }
    Ok(())
}

async fn run_worker(
    config: Arc<parking_lot::Mutex<ConfigStore>>,
    action: WorkerAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let redis_url = config.lock().typed().redis.url.clone();
    let redis = RedisClient::connect(&redis_url).await?;
    let registry = JobRegistry::default_registry();
    let store = WorkerConfigStore::new(redis);
    store.load(&registry).await?;

    match action {
        WorkerAction::Set {
            name,
            percentage,
            task_types,
        } => {
            store.set(&name, percentage, task_types).await?;
            store.validate();
            println!("worker queue updated: {name}");
        }
        WorkerAction::List => {
            for w in store.list() {
                println!("{}\t{}%\t{}", w.name, w.percentage, w.task_types.join(","));
            }
        }
        WorkerAction::Reset => {
            store.reset(&registry).await?;
            println!("worker config reset to registry defaults");
        }
    }
    Ok(())
}

fn run_config(config: &Arc<parking_lot::Mutex<ConfigStore>>, action: ConfigAction) {
    match action {
        ConfigAction::Show => {
            let guard = config.lock();
            let json = serde_json::to_string_pretty(guard.typed()).unwrap_or_default();
            println!("{json}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_add_parses_comma_delimited_permissions() {
        let cli = Cli::try_parse_from([
            "insight-collector-cli",
            "client",
            "add",
            "ab12",
            "acme",
            "--auth-type",
            "symmetric",
            "--symmetric-secret",
            "S",
            "--permissions",
            "read:ping,write:user-activities",
        ])
        .unwrap();
        match cli.command {
            Commands::Client {
                action: ClientAction::Add { permissions, active, .. },
            } => {
                assert_eq!(permissions, vec!["read:ping", "write:user-activities"]);
                assert!(active);
            }
            _ => panic!("expected Client Add"),
        }
    }

    #[test]
    fn worker_set_parses_task_types() {
        let cli = Cli::try_parse_from([
            "insight-collector-cli",
            "worker",
            "set",
            "critical",
            "70",
            "--task-types",
            "user_activity.persist,security_event.persist",
        ])
        .unwrap();
        match cli.command {
            Commands::Worker {
                action: WorkerAction::Set { name, percentage, task_types },
            } => {
                assert_eq!(name, "critical");
                assert_eq!(percentage, 70);
                assert_eq!(task_types.len(), 2);
            }
            _ => panic!("expected Worker Set"),
        }
    }

    #[test]
    fn config_flag_defaults_to_dotconfig_json() {
        let cli = Cli::try_parse_from(["insight-collector-cli", "config", "show"]).unwrap();
        assert_eq!(cli.config, "./.config.json");
    }
}
