//! `mfm`: command-line tool for MFM bulletins and the Munitorum server.
//!
//! # Usage
//!
//! ```text
//! mfm parse raw/mfm-3.2.txt --json
//! mfm diff raw/mfm-3.2.txt regenerated.txt
//! mfm --url http://localhost:8080 points "Space Marines" "Intercessor Squad" --models 10
//! mfm --config ~/.config/munitorum/cli.toml migrate --overwrite
//! ```

mod client;
mod hints;
mod offline;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, StatusError};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mfm", about = "Munitorum Field Manual tools")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the munitorum server (default: http://localhost:8080).
  #[arg(long, env = "MFM_URL")]
  url: Option<String>,

  /// Username for the raw-parser and admin routes.
  #[arg(long, env = "MFM_USER")]
  user: Option<String>,

  /// Password (plaintext).
  #[arg(long, env = "MFM_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Parse a local bulletin and print a summary.
  Parse {
    file: PathBuf,
    /// Print the full parse result as JSON.
    #[arg(long)]
    json: bool,
  },
  /// Print the parser feedback report for a local bulletin.
  Feedback { file: PathBuf },
  /// Compare two local bulletins line by line after normalisation.
  Diff {
    original:    PathBuf,
    regenerated: PathBuf,
  },
  /// List stored versions.
  Versions,
  /// List the units of a faction.
  Units {
    faction: String,
    #[arg(long)]
    version: Option<String>,
  },
  /// Look up the points cost of a unit.
  Points {
    faction: String,
    unit:    String,
    /// Unit size; defaults to the smallest.
    #[arg(long)]
    models:  Option<u32>,
    #[arg(long)]
    version: Option<String>,
  },
  /// Run the server's structured-file migration.
  Migrate {
    #[arg(long)]
    overwrite: bool,
  },
  /// Print the regenerated bulletin text of a stored version.
  Regenerate {
    #[arg(default_value = "latest")]
    version: String,
  },
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

fn api_config(args: &Args) -> Result<ApiConfig> {
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let pick = |flag: &Option<String>, file: &str| {
    flag
      .clone()
      .or_else(|| (!file.is_empty()).then(|| file.to_owned()))
  };
  Ok(ApiConfig {
    base_url: pick(&args.url, &file_cfg.url)
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: pick(&args.user, &file_cfg.username).unwrap_or_default(),
    password: pick(&args.password, &file_cfg.password).unwrap_or_default(),
  })
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  match &args.command {
    Command::Parse { file, json } => print!("{}", offline::parse(file, *json)?),
    Command::Feedback { file } => print!("{}", offline::feedback(file)?),
    Command::Diff { original, regenerated } => {
      let (text, comparison) = offline::diff(original, regenerated)?;
      print!("{text}");
      if !comparison.differences.is_empty() {
        std::process::exit(1);
      }
    }
    remote => {
      let client = ApiClient::new(api_config(&args)?)?;
      run_remote(&client, remote).await?;
    }
  }
  Ok(())
}

async fn run_remote(client: &ApiClient, command: &Command) -> Result<()> {
  match command {
    Command::Versions => {
      for v in client.versions().await? {
        let marker = if v.is_latest { "*" } else { " " };
        let label = v.release_label.as_deref().unwrap_or("");
        println!("{marker} {:<8} {label}", v.version);
      }
    }
    Command::Units { faction, version } => {
      let units = match client.units(faction, version.as_deref()).await {
        Ok(units) => units,
        Err(e) => return Err(with_faction_hints(client, e, faction, version).await),
      };
      for u in units {
        let sizes: Vec<String> = u
          .variants
          .iter()
          .map(|v| format!("{}×{} pts", v.model_count, v.points))
          .collect();
        println!("{:<40} {}", u.unit.name, sizes.join(", "));
      }
    }
    Command::Points { faction, unit, models, version } => {
      match client.points(faction, unit, *models, version.as_deref()).await {
        Ok(answer) => println!(
          "{} / {}: {} models = {} pts (v{})",
          answer.faction, answer.unit, answer.models, answer.points, answer.version
        ),
        Err(e) => {
          return Err(with_unit_hints(client, e, faction, unit, version).await);
        }
      }
    }
    Command::Migrate { overwrite } => {
      let report = client.migrate(*overwrite).await?;
      for set in &report.processed {
        println!("{:<10} {:<8} {}", set.status, set.version, set.source_name);
      }
      for failure in &report.failures {
        eprintln!("failed     {}: {}", failure.file, failure.message);
      }
      println!("latest: {}", report.latest.as_deref().unwrap_or("(none)"));
    }
    Command::Regenerate { version } => print!("{}", client.regenerate(version).await?),
    Command::Parse { .. } | Command::Feedback { .. } | Command::Diff { .. } => {
      bail!("not a remote command")
    }
  }
  Ok(())
}

fn is_not_found(e: &anyhow::Error) -> bool {
  e.downcast_ref::<StatusError>().is_some_and(StatusError::is_not_found)
}

/// Attach faction suggestions to a 404.
async fn with_faction_hints(
  client: &ApiClient,
  e: anyhow::Error,
  faction: &str,
  version: &Option<String>,
) -> anyhow::Error {
  if !is_not_found(&e) {
    return e;
  }
  let Ok(factions) = client.factions(version.as_deref()).await else {
    return e;
  };
  let hints = hints::suggest(faction, factions.iter().map(|f| f.name.as_str()));
  with_hints(e, &hints)
}

/// Attach unit (or, failing that, faction) suggestions to a 404.
async fn with_unit_hints(
  client: &ApiClient,
  e: anyhow::Error,
  faction: &str,
  unit: &str,
  version: &Option<String>,
) -> anyhow::Error {
  if !is_not_found(&e) {
    return e;
  }
  match client.units(faction, version.as_deref()).await {
    Ok(units) => {
      let hints = hints::suggest(unit, units.iter().map(|u| u.unit.name.as_str()));
      with_hints(e, &hints)
    }
    Err(units_err) => with_faction_hints(client, units_err, faction, version).await,
  }
}

fn with_hints(e: anyhow::Error, hints: &[String]) -> anyhow::Error {
  if hints.is_empty() {
    e
  } else {
    e.context(format!("did you mean: {}?", hints.join(", ")))
  }
}
