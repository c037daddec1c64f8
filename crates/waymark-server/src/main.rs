//! waymark-server binary.
//!
//! Loads [`ServerConfig`] from a TOML file overlaid with `WAYMARK_*`
//! environment variables, opens the SQLite history store and serves the API.
//!
//! `waymark-server --hash-password` reads a password from stdin and prints
//! the argon2 PHC string to put in `auth_password_hash`.

use std::{
  io::BufRead as _,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, anyhow};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use waymark_api::ApiState;
use waymark_server::{AppState, ServerConfig, retention};
use waymark_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Waymark history server")]
struct Cli {
  /// TOML configuration file; a missing file leaves everything to the
  /// environment.
  #[arg(short, long, default_value = "config.toml", env = "WAYMARK_CONFIG")]
  config: PathBuf,

  /// Hash a password read from stdin, print it and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    println!("{}", hash_password(&prompt_password()?)?);
    return Ok(());
  }

  let cfg = load_config(cli.config)?;
  let store = Arc::new(open_store(&cfg.store_path).await?);

  if let Some(policy) = cfg.retention_policy() {
    tracing::info!(
      keep_days = policy.keep_days,
      every_secs = policy.every.as_secs(),
      "history retention enabled"
    );
    retention::spawn(Arc::clone(&store), policy);
  }

  let app = waymark_server::router(AppState {
    api:  ApiState::new(store).with_search(cfg.search_provider()),
    auth: Arc::new(cfg.auth()),
  });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!(%address, "waymark listening");

  axum::serve(listener, app).await.context("server error")
}

fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("WAYMARK").try_parsing(true))
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("invalid server configuration")
}

/// Open the store at `path` (`~/` expanded), creating parent directories.
async fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
  let path = match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  };
  if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }

  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {}", path.display()))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| anyhow!("argon2 error: {e}"))
}

fn prompt_password() -> anyhow::Result<String> {
  eprint!("Password: ");
  let mut line = String::new();
  std::io::stdin()
    .lock()
    .read_line(&mut line)
    .context("failed to read password")?;
  Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
