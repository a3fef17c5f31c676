//! rapport server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), overlays any
//! `RAPPORT_*` environment variables, opens the SQLite store and serves the
//! JSON API under `/api`.
//!
//! # Seeding an account
//!
//! Credentials are issued outside the service. For local use:
//!
//! ```
//! cargo run -p rapport-server -- --add-user alice@example.com
//! ```
//!
//! prints the new identity and a bearer token for it.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use rapport_api::{
  AppState,
  auth::{issue_token, token_digest},
};
use rapport_core::{identity::NewUser, store::Directory};
use rapport_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Rapport social graph and notification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an identity with this email, print a bearer token and exit.
  #[arg(long, value_name = "EMAIL")]
  add_user: Option<String>,

  /// Issue another bearer token for an existing email and exit.
  #[arg(long, value_name = "EMAIL", conflicts_with = "add_user")]
  issue_token: Option<String>,
}

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:       String,
  #[serde(default = "default_port")]
  port:       u16,
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 3000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/rapport/rapport.db") }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("RAPPORT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper modes: seed credentials and exit.
  if let Some(email) = cli.add_user {
    let profile = store
      .add_user(NewUser::new(email))
      .await
      .context("failed to add user")?;
    return print_token(&store, profile.user_id, &profile.email).await;
  }
  if let Some(email) = cli.issue_token {
    let profile = store
      .find_by_email(&email)
      .await
      .context("failed to look up user")?
      .with_context(|| format!("no user with email {email}"))?;
    return print_token(&store, profile.user_id, &profile.email).await;
  }

  let state = AppState::new(Arc::new(store));
  let app = Router::new().nest("/api", rapport_api::api_router(state));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Register a fresh token for `user_id` and print it once; only its digest is kept.
async fn print_token(store: &SqliteStore, user_id: Uuid, email: &str) -> anyhow::Result<()> {
  let token = issue_token();
  store
    .register_token(user_id, token_digest(&token))
    .await
    .context("failed to register token")?;
  tracing::info!(%user_id, email, "issued bearer token");
  println!("user:  {user_id}");
  println!("token: {token}");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
