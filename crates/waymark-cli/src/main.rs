//! `waymark`: command-line client for the Waymark history server.
//!
//! # Usage
//!
//! ```
//! waymark --url http://localhost:5280 --user alice --password secret frequent
//! waymark --config ~/.config/waymark/config.toml suggest rust
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, VisitRequest};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use waymark_core::site::VisitType;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "waymark", about = "Command-line client for the Waymark history store")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the waymark server (default: http://localhost:5280).
  #[arg(long, env = "WAYMARK_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "WAYMARK_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "WAYMARK_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Record a visit to a URL.
  Record {
    url:           String,
    #[arg(long)]
    title:         Option<String>,
    /// Visit time (RFC 3339). Defaults to now.
    #[arg(long)]
    at:            Option<DateTime<Utc>>,
    #[arg(long, default_value = "link")]
    visit_type:    VisitType,
    #[arg(long, default_value_t = 0)]
    root_id:       i64,
    /// Merge the title without counting a visit.
    #[arg(long)]
    metadata_only: bool,
  },
  /// Show history, newest first.
  History {
    /// Window start (RFC 3339). Defaults to `--days` ago.
    #[arg(long)]
    from:    Option<DateTime<Utc>>,
    /// Window end (RFC 3339, exclusive). Defaults to now.
    #[arg(long)]
    to:      Option<DateTime<Utc>>,
    #[arg(long, default_value_t = 1)]
    days:    u32,
    /// Only sites whose URL or title contains this text.
    #[arg(long)]
    filter:  Option<String>,
    /// Group into today, yesterday and earlier this week instead.
    #[arg(long, conflicts_with_all = ["from", "to", "days", "filter"])]
    grouped: bool,
  },
  /// Show the most visited sites.
  Frequent {
    /// Only sites visited in the last N days.
    #[arg(long)]
    days:  Option<u32>,
    #[arg(long, default_value_t = 8)]
    limit: usize,
  },
  /// Show suggestions for typed text.
  Suggest {
    text:  String,
    #[arg(long, default_value_t = 10)]
    limit: usize,
  },
  /// List every site.
  Sites,
  /// List every visit.
  Visits,
  /// Remember the registered domain of a URL, optionally with a display name.
  Domain {
    url:  String,
    #[arg(long)]
    name: Option<String>,
  },
  /// Upload an icon for a page.
  Icon {
    url:        String,
    file:       PathBuf,
    #[arg(long)]
    width:      u32,
    #[arg(long)]
    height:     Option<u32>,
    #[arg(long, default_value = "image/png")]
    media_type: String,
  },
  /// Delete visits in `[from, to)`.
  DeleteRange {
    #[arg(long)]
    from: DateTime<Utc>,
    #[arg(long)]
    to:   DateTime<Utc>,
  },
  /// Delete sites that no longer have visits.
  Cleanup,
  /// Flag a visit for deletion (or clear the flag).
  Mark {
    visit_id: Uuid,
    #[arg(long)]
    unmark:   bool,
  },
  /// Delete every visit flagged for deletion.
  Purge,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

/// CLI flags override the config file, which overrides defaults.
fn api_config(args: &Args, file_cfg: ConfigFile) -> ApiConfig {
  fn non_empty(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

  ApiConfig {
    base_url: args
      .url
      .clone()
      .or_else(|| non_empty(file_cfg.url))
      .unwrap_or_else(|| "http://localhost:5280".to_string()),
    username: args
      .user
      .clone()
      .or_else(|| non_empty(file_cfg.username))
      .unwrap_or_default(),
    password: args
      .password
      .clone()
      .or_else(|| non_empty(file_cfg.password))
      .unwrap_or_default(),
  }
}

/// `days` before `now`, clamped to the earliest representable instant.
fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
  now
    .checked_sub_signed(TimeDelta::days(i64::from(days)))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn days_ago(days: u32) -> DateTime<Utc> { days_before(Utc::now(), days) }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(api_config(&args, file_cfg))?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Record { url, title, at, visit_type, root_id, metadata_only } => {
      let site = client
        .record_visit(&VisitRequest {
          url,
          title,
          timestamp: at,
          visit_type,
          root_id,
          metadata_only,
        })
        .await?;
      render::sites(std::slice::from_ref(&site));
    }
    Command::History { grouped: true, .. } => {
      let grouped = client.grouped_history().await?;
      render::section("Today", &grouped.today);
      render::section("Yesterday", &grouped.yesterday);
      render::section("This week", &grouped.this_week);
    }
    Command::History { from, to, days, filter, .. } => {
      let to = to.unwrap_or_else(Utc::now);
      let from = from.unwrap_or_else(|| days_ago(days));
      render::sites(&client.history(from, to, filter.as_deref()).await?);
    }
    Command::Frequent { days, limit } => {
      render::sites(&client.frequent(days.map(days_ago), limit).await?);
    }
    Command::Suggest { text, limit } => {
      render::suggestions(&client.suggestions(&text, limit).await?);
    }
    Command::Sites => render::sites(&client.list_sites().await?),
    Command::Visits => render::visits(&client.list_visits().await?),
    Command::Domain { url, name } => client.record_domain(&url, name.as_deref()).await?,
    Command::Icon { url, file, width, height, media_type } => {
      let data = std::fs::read(&file)
        .with_context(|| format!("reading icon {}", file.display()))?;
      let icon = client
        .store_favicon(&url, &media_type, width, height.unwrap_or(width), data)
        .await?;
      println!("{}  {}x{}  {}", icon.hash, icon.width, icon.height, icon.media_type);
    }
    Command::DeleteRange { from, to } => {
      println!("deleted {} visits", client.delete_visits(from, to).await?);
    }
    Command::Cleanup => {
      println!("deleted {} sites", client.delete_orphans().await?);
    }
    Command::Mark { visit_id, unmark } => client.mark(visit_id, !unmark).await?,
    Command::Purge => {
      println!("purged {} visits", client.purge().await?);
    }
  }
  Ok(())
}
