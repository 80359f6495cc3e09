use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, Settings, DEFAULT_CONFIG_FILE},
    ids::generate_policy_id,
    push::spawn_push_listener,
    ApiClient, HttpRemoteApi, NavigationGate, RequestHandle, RequestOutcome, WorkspaceActions,
};
use serde_json::{json, Value};
use shared::{
    domain::PolicyId,
    keys::{EntityKey, SingleKey},
};
use store::ReactiveStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// JSON snapshot of the store, loaded before and saved after the command.
    #[arg(long)]
    state: Option<PathBuf>,
    /// Signed-in account; overrides the session record in the snapshot.
    #[arg(long)]
    email: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    DefaultName {
        #[arg(long, default_value = "")]
        email: String,
    },
    GenerateId,
    CreateWorkspace {
        #[arg(long, default_value = "")]
        owner_email: String,
        #[arg(long)]
        make_me_admin: bool,
    },
    Rename {
        #[arg(long)]
        policy_id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = client_core::workspace::DEFAULT_OUTPUT_CURRENCY)]
        currency: String,
    },
    DeleteWorkspace {
        #[arg(long)]
        policy_id: String,
    },
    AddMembers {
        #[arg(long)]
        policy_id: String,
        #[arg(long, default_value = "")]
        welcome_note: String,
        logins: Vec<String>,
    },
    RemoveMembers {
        #[arg(long)]
        policy_id: String,
        logins: Vec<String>,
    },
    LoadPolicy {
        #[arg(long)]
        policy_id: String,
    },
    /// Applies server pushes until the socket closes.
    Watch,
    Dump,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;

    let store = Arc::new(ReactiveStore::new());
    if let Some(path) = &cli.state {
        load_state(&store, path)?;
    }
    if let Some(email) = &cli.email {
        store.merge(
            EntityKey::single(SingleKey::Session),
            json!({ "email": email }),
        );
    }

    let navigation = Arc::new(NavigationGate::headless());
    let actions = WorkspaceActions::new(api_client(&settings, &store)?, navigation)
        .with_public_domains(settings.public_domains());
    actions.navigation().mark_ready();

    match cli.command {
        Command::DefaultName { email } => {
            println!("{}", actions.generate_default_workspace_name(&email));
        }
        Command::GenerateId => println!("{}", generate_policy_id()),
        Command::CreateWorkspace {
            owner_email,
            make_me_admin,
        } => {
            let created = actions.create_workspace(&owner_email, make_me_admin);
            println!(
                "created policy_id={} name={}",
                created.policy_id, created.policy_name
            );
            report(created.request).await;
        }
        Command::Rename {
            policy_id,
            name,
            currency,
        } => {
            let handle =
                actions.update_general_settings(&PolicyId::new(policy_id), &name, &currency)?;
            report(handle).await;
        }
        Command::DeleteWorkspace { policy_id } => {
            let policy_id = PolicyId::new(policy_id);
            let reports = actions.context().reports_for_policy(&policy_id);
            report(actions.delete_workspace(&policy_id, &reports)?).await;
        }
        Command::AddMembers {
            policy_id,
            welcome_note,
            logins,
        } => {
            let handle = actions.add_members_to_workspace(
                &logins,
                &welcome_note,
                &PolicyId::new(policy_id),
            )?;
            report(handle).await;
        }
        Command::RemoveMembers { policy_id, logins } => {
            match actions.remove_members(&logins, &PolicyId::new(policy_id))? {
                Some(handle) => report(handle).await,
                None => println!("nothing to remove"),
            }
        }
        Command::LoadPolicy { policy_id } => {
            report(actions.load_full_policy(&PolicyId::new(policy_id))?).await;
        }
        Command::Watch => {
            let push_url = settings
                .resolved_push_url()?
                .context("watch needs api_base_url or push_url to be configured")?;
            let listener = spawn_push_listener(&push_url, Arc::clone(&store)).await?;
            listener.await.context("push listener panicked")?;
        }
        Command::Dump => {
            println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
        }
    }

    if let Some(path) = &cli.state {
        save_state(&store, path)?;
    }
    Ok(())
}

fn api_client(settings: &Settings, store: &Arc<ReactiveStore>) -> Result<ApiClient> {
    match &settings.api_base_url {
        Some(base_url) => {
            let remote = HttpRemoteApi::new(base_url, settings.request_timeout)?;
            Ok(ApiClient::with_retry_policy(
                Arc::clone(store),
                Arc::new(remote),
                settings.retry_policy(),
            ))
        }
        None => {
            warn!("no api_base_url configured; every request will fail");
            Ok(ApiClient::offline(Arc::clone(store)))
        }
    }
}

async fn report(handle: RequestHandle) {
    let command = handle.command();
    match handle.completion().await {
        RequestOutcome::Succeeded => println!("{command}: ok"),
        RequestOutcome::Failed(error) => println!("{command}: failed ({error})"),
    }
}

fn load_state(store: &ReactiveStore, path: &Path) -> Result<()> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read state file '{}'", path.display()))
        }
    };
    let records: BTreeMap<EntityKey, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse state file '{}'", path.display()))?;
    info!(records = records.len(), path = %path.display(), "state: loaded");
    for (key, value) in records {
        store.set(key, value);
    }
    Ok(())
}

fn save_state(store: &ReactiveStore, path: &Path) -> Result<()> {
    let snapshot = store.snapshot();
    fs::write(path, serde_json::to_string_pretty(&snapshot)?)
        .with_context(|| format!("failed to write state file '{}'", path.display()))?;
    info!(records = snapshot.len(), path = %path.display(), "state: saved");
    Ok(())
}
