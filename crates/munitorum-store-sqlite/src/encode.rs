//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their `strum` string forms.

use chrono::{DateTime, Utc};
use munitorum_core::model::{
  Detachment, Enhancement, Faction, MfmVersion, Supergroup, Unit, UnitType,
  UnitVariant,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

pub fn decode_supergroup(s: &str) -> Result<Supergroup> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown supergroup: {s:?}")))
}

pub fn decode_unit_type(s: &str) -> Result<UnitType> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown unit type: {s:?}")))
}

/// SQLite integers come back as `i64`; the CHECK constraints keep them
/// non-negative.
pub fn decode_count(n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Decode(format!("count out of range: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const VERSION_COLUMNS: &str =
  "version_id, version, release_label, is_latest, is_active, source_hash, created_at";

/// Raw values read directly from an `mfm_versions` row.
pub struct RawVersion {
  pub version_id:    String,
  pub version:       String,
  pub release_label: Option<String>,
  pub is_latest:     bool,
  pub is_active:     bool,
  pub source_hash:   Option<String>,
  pub created_at:    String,
}

impl RawVersion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:    row.get(0)?,
      version:       row.get(1)?,
      release_label: row.get(2)?,
      is_latest:     row.get(3)?,
      is_active:     row.get(4)?,
      source_hash:   row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_version(self) -> Result<MfmVersion> {
    Ok(MfmVersion {
      version_id:    decode_uuid(&self.version_id)?,
      version:       self.version,
      release_label: self.release_label,
      is_latest:     self.is_latest,
      is_active:     self.is_active,
      source_hash:   self.source_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const FACTION_COLUMNS: &str =
  "f.faction_id, f.version_id, f.name, f.supergroup, f.ally_to";

pub struct RawFaction {
  pub faction_id: String,
  pub version_id: String,
  pub name:       String,
  pub supergroup: String,
  pub ally_to:    Option<String>,
}

impl RawFaction {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      faction_id: row.get(0)?,
      version_id: row.get(1)?,
      name:       row.get(2)?,
      supergroup: row.get(3)?,
      ally_to:    row.get(4)?,
    })
  }

  pub fn into_faction(self) -> Result<Faction> {
    Ok(Faction {
      faction_id: decode_uuid(&self.faction_id)?,
      version_id: decode_uuid(&self.version_id)?,
      name:       self.name,
      supergroup: decode_supergroup(&self.supergroup)?,
      ally_to:    self.ally_to,
    })
  }
}

pub const UNIT_COLUMNS: &str = "u.unit_id, u.faction_id, u.name, u.unit_type";

pub struct RawUnit {
  pub unit_id:    String,
  pub faction_id: String,
  pub name:       String,
  pub unit_type:  String,
}

impl RawUnit {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      unit_id:    row.get(0)?,
      faction_id: row.get(1)?,
      name:       row.get(2)?,
      unit_type:  row.get(3)?,
    })
  }

  pub fn into_unit(self) -> Result<Unit> {
    Ok(Unit {
      unit_id:    decode_uuid(&self.unit_id)?,
      faction_id: decode_uuid(&self.faction_id)?,
      name:       self.name,
      unit_type:  decode_unit_type(&self.unit_type)?,
    })
  }
}

pub const VARIANT_COLUMNS: &str = "v.variant_id, v.unit_id, v.model_count, v.points";

pub struct RawVariant {
  pub variant_id:  String,
  pub unit_id:     String,
  pub model_count: i64,
  pub points:      i64,
}

impl RawVariant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      variant_id:  row.get(0)?,
      unit_id:     row.get(1)?,
      model_count: row.get(2)?,
      points:      row.get(3)?,
    })
  }

  pub fn into_variant(self) -> Result<UnitVariant> {
    Ok(UnitVariant {
      variant_id:  decode_uuid(&self.variant_id)?,
      unit_id:     decode_uuid(&self.unit_id)?,
      model_count: decode_count(self.model_count)?,
      points:      decode_count(self.points)?,
    })
  }
}

pub const DETACHMENT_COLUMNS: &str = "d.detachment_id, d.faction_id, d.name";

pub struct RawDetachment {
  pub detachment_id: String,
  pub faction_id:    String,
  pub name:          String,
}

impl RawDetachment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      detachment_id: row.get(0)?,
      faction_id:    row.get(1)?,
      name:          row.get(2)?,
    })
  }

  pub fn into_detachment(self) -> Result<Detachment> {
    Ok(Detachment {
      detachment_id: decode_uuid(&self.detachment_id)?,
      faction_id:    decode_uuid(&self.faction_id)?,
      name:          self.name,
    })
  }
}

pub const ENHANCEMENT_COLUMNS: &str = "e.enhancement_id, e.detachment_id, e.name, e.points";

pub struct RawEnhancement {
  pub enhancement_id: String,
  pub detachment_id:  String,
  pub name:           String,
  pub points:         i64,
}

impl RawEnhancement {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      enhancement_id: row.get(0)?,
      detachment_id:  row.get(1)?,
      name:           row.get(2)?,
      points:         row.get(3)?,
    })
  }

  pub fn into_enhancement(self) -> Result<Enhancement> {
    Ok(Enhancement {
      enhancement_id: decode_uuid(&self.enhancement_id)?,
      detachment_id:  decode_uuid(&self.detachment_id)?,
      name:           self.name,
      points:         decode_count(self.points)?,
    })
  }
}
