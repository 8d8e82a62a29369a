//! [`SqliteStore`], the SQLite implementation of [`MfmStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use munitorum_core::{
  model::{Detachment, Enhancement, Faction, MfmVersion, NewFaction, NewVersion, Unit, UnitVariant},
  snapshot::{DetachmentView, FactionView, UnitView, VersionSnapshot, VersionStats},
  store::MfmStore,
};

use crate::{
  encode::{
    DETACHMENT_COLUMNS, ENHANCEMENT_COLUMNS, FACTION_COLUMNS, RawDetachment,
    RawEnhancement, RawFaction, RawUnit, RawVariant, RawVersion, UNIT_COLUMNS,
    VARIANT_COLUMNS, VERSION_COLUMNS, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An MFM points store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn versions_where(
    &self,
    filter: &'static str,
    param: Option<String>,
  ) -> Result<Vec<MfmVersion>> {
    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {VERSION_COLUMNS} FROM mfm_versions {filter} ORDER BY rowid"
        );
        let rows = match param {
          Some(p) => query_all(conn, &sql, rusqlite::params![p], RawVersion::from_row)?,
          None => query_all(conn, &sql, [], RawVersion::from_row)?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }

  /// Write a version graph in one transaction. With `replace`, an existing
  /// version of the same name is deleted inside that transaction first;
  /// otherwise it is an error.
  async fn insert_graph(
    &self,
    version: NewVersion,
    factions: Vec<NewFaction>,
    replace: bool,
  ) -> Result<MfmVersion> {
    let record = MfmVersion {
      version_id:    Uuid::new_v4(),
      version:       version.version,
      release_label: version.release_label,
      is_latest:     false,
      is_active:     true,
      source_hash:   version.source_hash,
      created_at:    Utc::now(),
    };

    let id_str      = encode_uuid(record.version_id);
    let version_str = record.version.clone();
    let label       = record.release_label.clone();
    let hash        = record.source_hash.clone();
    let at_str      = encode_dt(record.created_at);
    let faction_count = factions.len();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
          .query_row(
            "SELECT version_id FROM mfm_versions WHERE version = ?1",
            rusqlite::params![version_str],
            |row| row.get(0),
          )
          .optional()?;
        match existing {
          Some(old_id) if replace => {
            delete_rows(&tx, &old_id)?;
          }
          Some(_) => return Ok(false),
          None => {}
        }

        tx.execute(
          "INSERT INTO mfm_versions (
             version_id, version, release_label, is_latest, is_active,
             source_hash, created_at
           ) VALUES (?1, ?2, ?3, 0, 1, ?4, ?5)",
          rusqlite::params![id_str, version_str, label, hash, at_str],
        )?;
        insert_factions(&tx, &id_str, &factions)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::VersionExists(record.version));
    }
    debug!(
      version = %record.version,
      factions = faction_count,
      replace,
      "wrote version graph"
    );
    Ok(record)
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn query_all<T>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
  map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare_cached(sql)?;
  let rows = stmt
    .query_map(params, map)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Insert every row beneath one version. Runs inside the caller's
/// transaction.
fn insert_factions(
  conn: &rusqlite::Connection,
  version_id: &str,
  factions: &[NewFaction],
) -> rusqlite::Result<()> {
  let mut faction_stmt = conn.prepare_cached(
    "INSERT INTO mfm_factions (faction_id, version_id, name, supergroup, ally_to)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  let mut unit_stmt = conn.prepare_cached(
    "INSERT INTO mfm_units (unit_id, faction_id, name, unit_type) VALUES (?1, ?2, ?3, ?4)",
  )?;
  let mut variant_stmt = conn.prepare_cached(
    "INSERT INTO mfm_unit_variants (variant_id, unit_id, model_count, points)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  let mut detachment_stmt = conn.prepare_cached(
    "INSERT INTO mfm_detachments (detachment_id, faction_id, name) VALUES (?1, ?2, ?3)",
  )?;
  let mut enhancement_stmt = conn.prepare_cached(
    "INSERT INTO mfm_enhancements (enhancement_id, detachment_id, name, points)
     VALUES (?1, ?2, ?3, ?4)",
  )?;

  for faction in factions {
    let faction_id = encode_uuid(Uuid::new_v4());
    faction_stmt.execute(rusqlite::params![
      faction_id,
      version_id,
      faction.name,
      faction.supergroup.as_ref(),
      faction.ally_to,
    ])?;

    for unit in &faction.units {
      let unit_id = encode_uuid(Uuid::new_v4());
      unit_stmt.execute(rusqlite::params![
        unit_id,
        faction_id,
        unit.name,
        unit.unit_type.as_ref(),
      ])?;
      for v in &unit.variants {
        variant_stmt.execute(rusqlite::params![
          encode_uuid(Uuid::new_v4()),
          unit_id,
          v.model_count,
          v.points,
        ])?;
      }
    }

    for detachment in &faction.detachments {
      let detachment_id = encode_uuid(Uuid::new_v4());
      detachment_stmt.execute(rusqlite::params![
        detachment_id,
        faction_id,
        detachment.name,
      ])?;
      for e in &detachment.enhancements {
        enhancement_stmt.execute(rusqlite::params![
          encode_uuid(Uuid::new_v4()),
          detachment_id,
          e.name,
          e.points,
        ])?;
      }
    }
  }
  Ok(())
}

/// Delete one version and every row beneath it, children first. Runs inside
/// the caller's transaction; returns the number of version rows removed.
fn delete_rows(conn: &rusqlite::Connection, version_id: &str) -> rusqlite::Result<usize> {
  conn.execute(
    "DELETE FROM mfm_enhancements WHERE detachment_id IN (
       SELECT d.detachment_id FROM mfm_detachments d
       JOIN mfm_factions f ON f.faction_id = d.faction_id
       WHERE f.version_id = ?1)",
    rusqlite::params![version_id],
  )?;
  conn.execute(
    "DELETE FROM mfm_detachments WHERE faction_id IN (
       SELECT faction_id FROM mfm_factions WHERE version_id = ?1)",
    rusqlite::params![version_id],
  )?;
  conn.execute(
    "DELETE FROM mfm_unit_variants WHERE unit_id IN (
       SELECT u.unit_id FROM mfm_units u
       JOIN mfm_factions f ON f.faction_id = u.faction_id
       WHERE f.version_id = ?1)",
    rusqlite::params![version_id],
  )?;
  conn.execute(
    "DELETE FROM mfm_units WHERE faction_id IN (
       SELECT faction_id FROM mfm_factions WHERE version_id = ?1)",
    rusqlite::params![version_id],
  )?;
  conn.execute(
    "DELETE FROM mfm_factions WHERE version_id = ?1",
    rusqlite::params![version_id],
  )?;
  conn.execute(
    "DELETE FROM mfm_versions WHERE version_id = ?1",
    rusqlite::params![version_id],
  )
}

/// Every row of one version, in insertion order.
struct RawGraph {
  version:      RawVersion,
  factions:     Vec<RawFaction>,
  units:        Vec<RawUnit>,
  variants:     Vec<RawVariant>,
  detachments:  Vec<RawDetachment>,
  enhancements: Vec<RawEnhancement>,
}

fn load_graph(
  conn: &rusqlite::Connection,
  version_id: &str,
) -> rusqlite::Result<Option<RawGraph>> {
  let version = conn
    .query_row(
      &format!("SELECT {VERSION_COLUMNS} FROM mfm_versions WHERE version_id = ?1"),
      rusqlite::params![version_id],
      RawVersion::from_row,
    )
    .optional()?;
  let Some(version) = version else {
    return Ok(None);
  };

  let factions = query_all(
    conn,
    &format!(
      "SELECT {FACTION_COLUMNS} FROM mfm_factions f
       WHERE f.version_id = ?1 ORDER BY f.rowid"
    ),
    rusqlite::params![version_id],
    RawFaction::from_row,
  )?;
  let units = query_all(
    conn,
    &format!(
      "SELECT {UNIT_COLUMNS} FROM mfm_units u
       JOIN mfm_factions f ON f.faction_id = u.faction_id
       WHERE f.version_id = ?1 ORDER BY u.rowid"
    ),
    rusqlite::params![version_id],
    RawUnit::from_row,
  )?;
  let variants = query_all(
    conn,
    &format!(
      "SELECT {VARIANT_COLUMNS} FROM mfm_unit_variants v
       JOIN mfm_units u    ON u.unit_id    = v.unit_id
       JOIN mfm_factions f ON f.faction_id = u.faction_id
       WHERE f.version_id = ?1 ORDER BY v.rowid"
    ),
    rusqlite::params![version_id],
    RawVariant::from_row,
  )?;
  let detachments = query_all(
    conn,
    &format!(
      "SELECT {DETACHMENT_COLUMNS} FROM mfm_detachments d
       JOIN mfm_factions f ON f.faction_id = d.faction_id
       WHERE f.version_id = ?1 ORDER BY d.rowid"
    ),
    rusqlite::params![version_id],
    RawDetachment::from_row,
  )?;
  let enhancements = query_all(
    conn,
    &format!(
      "SELECT {ENHANCEMENT_COLUMNS} FROM mfm_enhancements e
       JOIN mfm_detachments d ON d.detachment_id = e.detachment_id
       JOIN mfm_factions f    ON f.faction_id    = d.faction_id
       WHERE f.version_id = ?1 ORDER BY e.rowid"
    ),
    rusqlite::params![version_id],
    RawEnhancement::from_row,
  )?;

  Ok(Some(RawGraph { version, factions, units, variants, detachments, enhancements }))
}

fn load_units(
  conn: &rusqlite::Connection,
  faction_id: &str,
  name: Option<&str>,
) -> rusqlite::Result<(Vec<RawUnit>, Vec<RawVariant>)> {
  let name_filter = if name.is_some() { "AND u.name = ?2 COLLATE NOCASE" } else { "" };
  let units_sql = format!(
    "SELECT {UNIT_COLUMNS} FROM mfm_units u
     WHERE u.faction_id = ?1 {name_filter} ORDER BY u.rowid"
  );
  let variants_sql = format!(
    "SELECT {VARIANT_COLUMNS} FROM mfm_unit_variants v
     JOIN mfm_units u ON u.unit_id = v.unit_id
     WHERE u.faction_id = ?1 {name_filter} ORDER BY v.rowid"
  );
  match name {
    Some(n) => Ok((
      query_all(conn, &units_sql, rusqlite::params![faction_id, n], RawUnit::from_row)?,
      query_all(conn, &variants_sql, rusqlite::params![faction_id, n], RawVariant::from_row)?,
    )),
    None => Ok((
      query_all(conn, &units_sql, rusqlite::params![faction_id], RawUnit::from_row)?,
      query_all(conn, &variants_sql, rusqlite::params![faction_id], RawVariant::from_row)?,
    )),
  }
}

fn load_detachments(
  conn: &rusqlite::Connection,
  faction_id: &str,
) -> rusqlite::Result<(Vec<RawDetachment>, Vec<RawEnhancement>)> {
  let detachments = query_all(
    conn,
    &format!(
      "SELECT {DETACHMENT_COLUMNS} FROM mfm_detachments d
       WHERE d.faction_id = ?1 ORDER BY d.rowid"
    ),
    rusqlite::params![faction_id],
    RawDetachment::from_row,
  )?;
  let enhancements = query_all(
    conn,
    &format!(
      "SELECT {ENHANCEMENT_COLUMNS} FROM mfm_enhancements e
       JOIN mfm_detachments d ON d.detachment_id = e.detachment_id
       WHERE d.faction_id = ?1 ORDER BY e.rowid"
    ),
    rusqlite::params![faction_id],
    RawEnhancement::from_row,
  )?;
  Ok((detachments, enhancements))
}

// ─── Assembly ────────────────────────────────────────────────────────────────

fn unit_views(units: Vec<RawUnit>, variants: Vec<RawVariant>) -> Result<Vec<UnitView>> {
  let mut by_unit: HashMap<Uuid, Vec<UnitVariant>> = HashMap::new();
  for raw in variants {
    let v = raw.into_variant()?;
    by_unit.entry(v.unit_id).or_default().push(v);
  }
  units
    .into_iter()
    .map(|raw| {
      let unit: Unit = raw.into_unit()?;
      let variants = by_unit.remove(&unit.unit_id).unwrap_or_default();
      Ok(UnitView { unit, variants })
    })
    .collect()
}

fn detachment_views(
  detachments: Vec<RawDetachment>,
  enhancements: Vec<RawEnhancement>,
) -> Result<Vec<DetachmentView>> {
  let mut by_detachment: HashMap<Uuid, Vec<Enhancement>> = HashMap::new();
  for raw in enhancements {
    let e = raw.into_enhancement()?;
    by_detachment.entry(e.detachment_id).or_default().push(e);
  }
  detachments
    .into_iter()
    .map(|raw| {
      let detachment: Detachment = raw.into_detachment()?;
      let enhancements = by_detachment.remove(&detachment.detachment_id).unwrap_or_default();
      Ok(DetachmentView { detachment, enhancements })
    })
    .collect()
}

fn assemble(graph: RawGraph) -> Result<VersionSnapshot> {
  let version = graph.version.into_version()?;

  let mut units_by_faction: HashMap<Uuid, Vec<UnitView>> = HashMap::new();
  for view in unit_views(graph.units, graph.variants)? {
    units_by_faction.entry(view.unit.faction_id).or_default().push(view);
  }
  let mut detachments_by_faction: HashMap<Uuid, Vec<DetachmentView>> = HashMap::new();
  for view in detachment_views(graph.detachments, graph.enhancements)? {
    detachments_by_faction
      .entry(view.detachment.faction_id)
      .or_default()
      .push(view);
  }

  let factions = graph
    .factions
    .into_iter()
    .map(|raw| {
      let faction = raw.into_faction()?;
      Ok(FactionView {
        units: units_by_faction.remove(&faction.faction_id).unwrap_or_default(),
        detachments: detachments_by_faction
          .remove(&faction.faction_id)
          .unwrap_or_default(),
        faction,
      })
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(VersionSnapshot { version, factions })
}

// ─── MfmStore impl ───────────────────────────────────────────────────────────

impl MfmStore for SqliteStore {
  type Error = Error;

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn list_versions(&self) -> Result<Vec<MfmVersion>> {
    self.versions_where("", None).await
  }

  async fn get_version<'a>(&'a self, version: &'a str) -> Result<Option<MfmVersion>> {
    let found = self
      .versions_where("WHERE version = ?1", Some(version.trim().to_owned()))
      .await?;
    Ok(found.into_iter().next())
  }

  async fn latest_version(&self) -> Result<Option<MfmVersion>> {
    let found = self.versions_where("WHERE is_latest = 1", None).await?;
    Ok(found.into_iter().next())
  }

  async fn set_latest(&self, version_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(version_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE mfm_versions
           SET is_latest = CASE WHEN version_id = ?1 THEN 1 ELSE 0 END",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write_graph(
    &self,
    version: NewVersion,
    factions: Vec<NewFaction>,
  ) -> Result<MfmVersion> {
    self.insert_graph(version, factions, false).await
  }

  async fn replace_graph(
    &self,
    version: NewVersion,
    factions: Vec<NewFaction>,
  ) -> Result<MfmVersion> {
    self.insert_graph(version, factions, true).await
  }

  async fn delete_version(&self, version_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(version_id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let removed = delete_rows(&tx, &id_str)?;
        tx.commit()?;
        Ok(removed > 0)
      })
      .await?;

    if deleted {
      debug!(%version_id, "deleted version graph");
    }
    Ok(deleted)
  }

  // ── Graph reads ───────────────────────────────────────────────────────────

  async fn list_factions(&self, version_id: Uuid) -> Result<Vec<Faction>> {
    let id_str = encode_uuid(version_id);
    let raws: Vec<RawFaction> = self
      .conn
      .call(move |conn| {
        Ok(query_all(
          conn,
          &format!(
            "SELECT {FACTION_COLUMNS} FROM mfm_factions f
             WHERE f.version_id = ?1 ORDER BY f.rowid"
          ),
          rusqlite::params![id_str],
          RawFaction::from_row,
        )?)
      })
      .await?;

    raws.into_iter().map(RawFaction::into_faction).collect()
  }

  async fn find_faction<'a>(
    &'a self,
    version_id: Uuid,
    name: &'a str,
  ) -> Result<Option<Faction>> {
    let id_str = encode_uuid(version_id);
    let name = name.trim().to_owned();
    let raw: Option<RawFaction> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {FACTION_COLUMNS} FROM mfm_factions f
               WHERE f.version_id = ?1 AND f.name = ?2 COLLATE NOCASE
               ORDER BY f.rowid LIMIT 1"
            ),
            rusqlite::params![id_str, name],
            RawFaction::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFaction::into_faction).transpose()
  }

  async fn list_units(&self, faction_id: Uuid) -> Result<Vec<UnitView>> {
    let id_str = encode_uuid(faction_id);
    let (units, variants) = self
      .conn
      .call(move |conn| Ok(load_units(conn, &id_str, None)?))
      .await?;
    unit_views(units, variants)
  }

  async fn find_unit<'a>(
    &'a self,
    faction_id: Uuid,
    name: &'a str,
  ) -> Result<Option<UnitView>> {
    let id_str = encode_uuid(faction_id);
    let name = name.trim().to_owned();
    let (units, variants) = self
      .conn
      .call(move |conn| Ok(load_units(conn, &id_str, Some(&name))?))
      .await?;
    // A name may repeat across unit types; the first one wins.
    Ok(unit_views(units, variants)?.into_iter().next())
  }

  async fn list_detachments(&self, faction_id: Uuid) -> Result<Vec<DetachmentView>> {
    let id_str = encode_uuid(faction_id);
    let (detachments, enhancements) = self
      .conn
      .call(move |conn| Ok(load_detachments(conn, &id_str)?))
      .await?;
    detachment_views(detachments, enhancements)
  }

  async fn snapshot(&self, version_id: Uuid) -> Result<Option<VersionSnapshot>> {
    let id_str = encode_uuid(version_id);
    let graph = self
      .conn
      .call(move |conn| Ok(load_graph(conn, &id_str)?))
      .await?;
    graph.map(assemble).transpose()
  }

  async fn stats(&self, version_id: Uuid) -> Result<Option<VersionStats>> {
    let id_str = encode_uuid(version_id);
    let counts = self
      .conn
      .call(move |conn| {
        let version: Option<String> = conn
          .query_row(
            "SELECT version FROM mfm_versions WHERE version_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(version) = version else {
          return Ok(None);
        };

        let count = |sql: &str| -> rusqlite::Result<i64> {
          conn.query_row(sql, rusqlite::params![id_str], |r| r.get(0))
        };
        let factions = count("SELECT COUNT(*) FROM mfm_factions WHERE version_id = ?1")?;
        let units = count(
          "SELECT COUNT(*) FROM mfm_units u
           JOIN mfm_factions f ON f.faction_id = u.faction_id
           WHERE f.version_id = ?1",
        )?;
        let forge_world_units = count(
          "SELECT COUNT(*) FROM mfm_units u
           JOIN mfm_factions f ON f.faction_id = u.faction_id
           WHERE f.version_id = ?1 AND u.unit_type = 'forge_world'",
        )?;
        let variants = count(
          "SELECT COUNT(*) FROM mfm_unit_variants v
           JOIN mfm_units u    ON u.unit_id    = v.unit_id
           JOIN mfm_factions f ON f.faction_id = u.faction_id
           WHERE f.version_id = ?1",
        )?;
        let detachments = count(
          "SELECT COUNT(*) FROM mfm_detachments d
           JOIN mfm_factions f ON f.faction_id = d.faction_id
           WHERE f.version_id = ?1",
        )?;
        let enhancements = count(
          "SELECT COUNT(*) FROM mfm_enhancements e
           JOIN mfm_detachments d ON d.detachment_id = e.detachment_id
           JOIN mfm_factions f    ON f.faction_id    = d.faction_id
           WHERE f.version_id = ?1",
        )?;
        Ok(Some((version, [factions, units, forge_world_units, variants, detachments, enhancements])))
      })
      .await?;

    Ok(counts.map(|(version, [factions, units, forge_world_units, variants, detachments, enhancements])| {
      VersionStats {
        version,
        factions:          factions as usize,
        units:             units as usize,
        forge_world_units: forge_world_units as usize,
        variants:          variants as usize,
        detachments:       detachments as usize,
        enhancements:      enhancements as usize,
      }
    }))
  }
}
