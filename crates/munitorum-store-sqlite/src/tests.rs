//! Integration tests for `SqliteStore` against an in-memory database.

use munitorum_core::{
  model::{
    NewDetachment, NewEnhancement, NewFaction, NewUnit, NewVariant, NewVersion,
    Supergroup, UnitType,
  },
  store::MfmStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn unit(name: &str, unit_type: UnitType, sizes: &[(u32, u32)]) -> NewUnit {
  NewUnit {
    name: name.into(),
    unit_type,
    variants: sizes
      .iter()
      .map(|&(model_count, points)| NewVariant { model_count, points })
      .collect(),
  }
}

fn space_marines() -> NewFaction {
  let mut f = NewFaction::named("SPACE MARINES");
  f.units = vec![
    unit("Intercessor Squad", UnitType::Standard, &[(5, 80), (10, 160)]),
    unit("Relic Contemptor Dreadnought", UnitType::ForgeWorld, &[(1, 150)]),
  ];
  f.detachments = vec![NewDetachment {
    name:         "Gladius Task Force".into(),
    enhancements: vec![
      NewEnhancement { name: "Adept of the Codex".into(), points: 20 },
      NewEnhancement { name: "Artificer Armour".into(), points: 10 },
    ],
  }];
  f
}

fn necrons() -> NewFaction {
  let mut f = NewFaction::named("NECRONS");
  f.units = vec![unit("Necron Warriors", UnitType::Standard, &[(10, 90)])];
  f
}

// ─── Versions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn write_and_get_version() {
  let s = store().await;
  let mut new = NewVersion::new("3.2");
  new.release_label = Some("June 2025".into());
  new.source_hash = Some("abc123".into());

  let written = s.write_graph(new, vec![space_marines()]).await.unwrap();
  assert_eq!(written.version, "3.2");
  assert!(!written.is_latest);
  assert!(written.is_active);

  let fetched = s.get_version("3.2").await.unwrap().unwrap();
  assert_eq!(fetched.version_id, written.version_id);
  assert_eq!(fetched.release_label.as_deref(), Some("June 2025"));
  assert_eq!(fetched.source_hash.as_deref(), Some("abc123"));

  assert!(s.get_version("9.9").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_version_is_rejected() {
  let s = store().await;
  s.write_graph(NewVersion::new("3.2"), vec![]).await.unwrap();
  let err = s.write_graph(NewVersion::new("3.2"), vec![necrons()]).await.unwrap_err();
  assert!(matches!(err, Error::VersionExists(v) if v == "3.2"));
  // The failed write left nothing behind.
  assert_eq!(s.list_versions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_versions_in_insertion_order() {
  let s = store().await;
  for v in ["3.1", "3.10", "3.2"] {
    s.write_graph(NewVersion::new(v), vec![]).await.unwrap();
  }
  let versions: Vec<_> = s
    .list_versions()
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.version)
    .collect();
  assert_eq!(versions, ["3.1", "3.10", "3.2"]);
}

#[tokio::test]
async fn set_latest_flags_exactly_one() {
  let s = store().await;
  let a = s.write_graph(NewVersion::new("3.1"), vec![]).await.unwrap();
  let b = s.write_graph(NewVersion::new("3.2"), vec![]).await.unwrap();

  assert!(s.latest_version().await.unwrap().is_none());

  s.set_latest(a.version_id).await.unwrap();
  s.set_latest(b.version_id).await.unwrap();

  let all = s.list_versions().await.unwrap();
  assert_eq!(all.iter().filter(|v| v.is_latest).count(), 1);
  assert_eq!(s.latest_version().await.unwrap().unwrap().version, "3.2");
}

#[tokio::test]
async fn delete_version_removes_whole_graph() {
  let s = store().await;
  let keep = s.write_graph(NewVersion::new("3.1"), vec![necrons()]).await.unwrap();
  let gone = s
    .write_graph(NewVersion::new("3.2"), vec![space_marines(), necrons()])
    .await
    .unwrap();

  assert!(s.delete_version(gone.version_id).await.unwrap());
  assert!(!s.delete_version(gone.version_id).await.unwrap());
  assert!(s.get_version("3.2").await.unwrap().is_none());
  assert!(s.snapshot(gone.version_id).await.unwrap().is_none());

  // The other version is untouched.
  let stats = s.stats(keep.version_id).await.unwrap().unwrap();
  assert_eq!((stats.factions, stats.units, stats.variants), (1, 1, 1));

  // The version string can be reused after deletion.
  s.write_graph(NewVersion::new("3.2"), vec![necrons()]).await.unwrap();
}

#[tokio::test]
async fn replace_graph_swaps_rows_in_place() {
  let s = store().await;
  let old = s
    .write_graph(NewVersion::new("3.2"), vec![space_marines(), necrons()])
    .await
    .unwrap();

  let new = s.replace_graph(NewVersion::new("3.2"), vec![necrons()]).await.unwrap();
  assert_ne!(new.version_id, old.version_id);
  assert!(s.snapshot(old.version_id).await.unwrap().is_none());

  let stats = s.stats(new.version_id).await.unwrap().unwrap();
  assert_eq!(
    (stats.factions, stats.units, stats.variants, stats.enhancements),
    (1, 1, 1, 0)
  );
  assert_eq!(s.list_versions().await.unwrap().len(), 1);

  // Without an existing row it behaves like a plain write.
  s.replace_graph(NewVersion::new("3.3"), vec![]).await.unwrap();
  assert_eq!(s.list_versions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_replace_keeps_old_graph() {
  let s = store().await;
  let old = s
    .write_graph(NewVersion::new("3.2"), vec![space_marines()])
    .await
    .unwrap();
  let before = s.stats(old.version_id).await.unwrap().unwrap();

  // Two factions with the same name violate UNIQUE (version_id, name).
  let err = s
    .replace_graph(NewVersion::new("3.2"), vec![necrons(), necrons()])
    .await
    .unwrap_err();
  assert!(!matches!(err, Error::VersionExists(_)));

  let kept = s.get_version("3.2").await.unwrap().unwrap();
  assert_eq!(kept.version_id, old.version_id);
  assert_eq!(s.stats(old.version_id).await.unwrap().unwrap(), before);
}

// ─── Graph reads ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn faction_lookup_is_case_insensitive() {
  let s = store().await;
  let v = s
    .write_graph(NewVersion::new("3.2"), vec![space_marines(), necrons()])
    .await
    .unwrap();

  let factions = s.list_factions(v.version_id).await.unwrap();
  let names: Vec<_> = factions.iter().map(|f| f.name.as_str()).collect();
  assert_eq!(names, ["SPACE MARINES", "NECRONS"]);
  assert_eq!(factions[0].supergroup, Supergroup::Imperium);

  let found = s.find_faction(v.version_id, "space marines").await.unwrap().unwrap();
  assert_eq!(found.faction_id, factions[0].faction_id);
  assert!(s.find_faction(v.version_id, "ORKS").await.unwrap().is_none());
  assert!(s.find_faction(Uuid::new_v4(), "NECRONS").await.unwrap().is_none());
}

#[tokio::test]
async fn units_come_with_variants() {
  let s = store().await;
  let v = s.write_graph(NewVersion::new("3.2"), vec![space_marines()]).await.unwrap();
  let faction = s.find_faction(v.version_id, "SPACE MARINES").await.unwrap().unwrap();

  let units = s.list_units(faction.faction_id).await.unwrap();
  assert_eq!(units.len(), 2);
  assert_eq!(units[0].unit.name, "Intercessor Squad");
  assert_eq!(units[0].points_for(10), Some(160));
  assert_eq!(units[0].points_for(7), None);
  assert_eq!(units[1].unit.unit_type, UnitType::ForgeWorld);

  let found = s
    .find_unit(faction.faction_id, "intercessor squad")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.variants.len(), 2);
  assert!(s.find_unit(faction.faction_id, "Scouts").await.unwrap().is_none());
}

#[tokio::test]
async fn detachments_come_with_enhancements() {
  let s = store().await;
  let v = s.write_graph(NewVersion::new("3.2"), vec![space_marines()]).await.unwrap();
  let faction = s.find_faction(v.version_id, "SPACE MARINES").await.unwrap().unwrap();

  let detachments = s.list_detachments(faction.faction_id).await.unwrap();
  assert_eq!(detachments.len(), 1);
  let names: Vec<_> = detachments[0]
    .enhancements
    .iter()
    .map(|e| (e.name.as_str(), e.points))
    .collect();
  assert_eq!(names, [("Adept of the Codex", 20), ("Artificer Armour", 10)]);
}

#[tokio::test]
async fn snapshot_and_stats_agree() {
  let s = store().await;
  let v = s
    .write_graph(NewVersion::new("3.2"), vec![space_marines(), necrons()])
    .await
    .unwrap();

  let snapshot = s.snapshot(v.version_id).await.unwrap().unwrap();
  assert_eq!(snapshot.version.version, "3.2");
  assert_eq!(snapshot.factions.len(), 2);
  assert_eq!(snapshot.factions[0].units.len(), 2);
  assert_eq!(snapshot.factions[1].units[0].variants[0].points, 90);

  let stats = s.stats(v.version_id).await.unwrap().unwrap();
  assert_eq!(stats, snapshot.stats());
  assert_eq!(stats.factions, 2);
  assert_eq!(stats.units, 3);
  assert_eq!(stats.forge_world_units, 1);
  assert_eq!(stats.variants, 4);
  assert_eq!(stats.detachments, 1);
  assert_eq!(stats.enhancements, 2);

  assert!(s.stats(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn store_persists_across_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("mfm.db");
  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.write_graph(NewVersion::new("3.2"), vec![necrons()]).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  let v = s.get_version("3.2").await.unwrap().unwrap();
  assert_eq!(s.list_factions(v.version_id).await.unwrap().len(), 1);
}
