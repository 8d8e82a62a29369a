//! Getting MFM data into the store and checking it once it is there.
//!
//! Every entry point is generic over [`munitorum_core::store::MfmStore`]:
//!
//! - [`ingest`]: parse a raw bulletin and persist it as one version.
//! - [`migration`]: bulk-load version sets from structured points files.
//! - [`validation`]: regenerate a version and diff it against its source.
//! - [`report`]: plain-text report rendering and writing.

pub mod error;
pub mod ingest;
pub mod mapper;
pub mod migration;
pub mod report;
pub mod validation;

pub use error::{Error, Result};
pub use ingest::{
  IngestOptions, IngestOutcome, IngestStatus, LATEST, ingest_file,
  ingest_text, refresh_latest, resolve_version,
};
pub use mapper::{GraphCounts, build_graph};
pub use migration::{
  MigrationFailure, MigrationOptions, MigrationReport, migrate_directory,
};
pub use report::{ReportWriter, format_feedback_report, format_validation_report};
pub use validation::{ValidationReport, regenerate, validate_file, validate_text};

// ─── Round-trip test ─────────────────────────────────────────────────────────

#[cfg(test)]
mod roundtrip_tests {
  use munitorum_core::store::MfmStore;
  use munitorum_store_sqlite::SqliteStore;

  use super::*;

  const BULLETIN: &str = "\
MUNITORUM FIELD MANUAL
Version 3.2 - June 2025

CODEX: SPACE MARINES
Intercessor Squad
5 models ................ 80 pts
10 models ............... 160 pts
Terminator Squad 5 models ..... (+10) ..... 170 pts
Terminator Squad 10 models .... 340 pts
41
FORGE WORLD POINTS VALUES
Relic Contemptor Dreadnought
1 model ................. 150 pts
DETACHMENT ENHANCEMENTS
Gladius Task Force
Adept of the Codex ........ 20 pts

CODEX SUPPLEMENT:
BLOOD ANGELS
Death Company Marines
5 models ....... 85 pts

CODEX: IMPERIAL AGENTS
AGENTS OF THE IMPERIUM
Inquisitor
1 model ...... 55 pts
EVERY MODEL HAS THE
IMPERIUM KEYWORD
Callidus Assassin
1 model ...... 100 pts
";

  /// parse → store → render → parse keeps every (name, models, points).
  #[tokio::test]
  async fn stored_bulletin_renders_back_to_same_units() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let original = munitorum_text::parse(BULLETIN);
    assert!(original.diagnostics.is_empty(), "{:?}", original.diagnostics);

    let outcome = ingest_text(&store, BULLETIN, IngestOptions::default()).await.unwrap();
    assert_eq!(outcome.version, "3.2");

    let text = regenerate(&store, "3.2").await.unwrap();
    let reparsed = munitorum_text::parse(&text);
    assert_eq!(reparsed.unit_triples(), original.unit_triples());
    assert_eq!(reparsed.version.as_deref(), Some("3.2"));

    let v = store.get_version("3.2").await.unwrap().unwrap();
    let stats = store.stats(v.version_id).await.unwrap().unwrap();
    assert_eq!(stats.forge_world_units, 1);
    assert_eq!(stats.enhancements, 1);
  }
}
