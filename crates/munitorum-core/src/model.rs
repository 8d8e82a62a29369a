//! Entity types of the normalised MFM graph.
//!
//! One [`MfmVersion`] owns its factions; a faction owns units and
//! detachments; units own variants; detachments own enhancements. Every
//! version carries a complete copy of its graph: nothing is shared across
//! versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Classification ──────────────────────────────────────────────────────────

/// The grand alliance a faction belongs to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Supergroup {
  Imperium,
  Chaos,
  Xenos,
}

/// Name fragments that place a faction in Chaos. Checked before
/// [`IMPERIUM_MARKERS`] because "CHAOS SPACE MARINES" contains "SPACE
/// MARINES".
const CHAOS_MARKERS: &[&str] = &[
  "CHAOS",
  "DEATH GUARD",
  "THOUSAND SONS",
  "WORLD EATERS",
  "EMPEROR'S CHILDREN",
];

const IMPERIUM_MARKERS: &[&str] = &[
  "ADEPTA SORORITAS",
  "ADEPTUS CUSTODES",
  "ADEPTUS MECHANICUS",
  "ASTRA MILITARUM",
  "GREY KNIGHTS",
  "IMPERIAL AGENTS",
  "IMPERIAL KNIGHTS",
  "SPACE MARINES",
  "BLACK TEMPLARS",
  "BLOOD ANGELS",
  "DARK ANGELS",
  "DEATHWATCH",
  "SPACE WOLVES",
  "IMPERIUM",
];

impl Supergroup {
  /// Infer the supergroup from a faction name by substring match.
  /// Anything that is neither Chaos nor Imperium is Xenos.
  pub fn from_faction_name(name: &str) -> Self {
    let upper = name.to_uppercase();
    if CHAOS_MARKERS.iter().any(|m| upper.contains(m)) {
      Self::Chaos
    } else if IMPERIUM_MARKERS.iter().any(|m| upper.contains(m)) {
      Self::Imperium
    } else {
      Self::Xenos
    }
  }
}

/// Whether a unit comes from the main points tables or the Forge World
/// section.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UnitType {
  #[default]
  Standard,
  ForgeWorld,
}

impl UnitType {
  pub fn from_forge_world(forge_world: bool) -> Self {
    if forge_world { Self::ForgeWorld } else { Self::Standard }
  }

  pub fn is_forge_world(self) -> bool { matches!(self, Self::ForgeWorld) }
}

// ─── Stored entities ─────────────────────────────────────────────────────────

/// One ruleset revision, e.g. "3.2".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfmVersion {
  pub version_id:    Uuid,
  pub version:       String,
  /// Free-text release label such as "June 2025".
  pub release_label: Option<String>,
  pub is_latest:     bool,
  pub is_active:     bool,
  /// Hex SHA-256 of the text the version was ingested from, if any.
  pub source_hash:   Option<String>,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
  pub faction_id: Uuid,
  pub version_id: Uuid,
  pub name:       String,
  pub supergroup: Supergroup,
  pub ally_to:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
  pub unit_id:    Uuid,
  pub faction_id: Uuid,
  pub name:       String,
  pub unit_type:  UnitType,
}

/// A purchasable size of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitVariant {
  pub variant_id:  Uuid,
  pub unit_id:     Uuid,
  pub model_count: u32,
  pub points:      u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detachment {
  pub detachment_id: Uuid,
  pub faction_id:    Uuid,
  pub name:          String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enhancement {
  pub enhancement_id: Uuid,
  pub detachment_id:  Uuid,
  pub name:           String,
  pub points:         u32,
}

// ─── Write-side graph ────────────────────────────────────────────────────────

/// Input to [`crate::store::MfmStore::write_graph`]. Ids and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
  pub version:       String,
  pub release_label: Option<String>,
  pub source_hash:   Option<String>,
}

impl NewVersion {
  pub fn new(version: impl Into<String>) -> Self {
    Self { version: version.into(), release_label: None, source_hash: None }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFaction {
  pub name:        String,
  pub supergroup:  Supergroup,
  pub ally_to:     Option<String>,
  pub units:       Vec<NewUnit>,
  pub detachments: Vec<NewDetachment>,
}

impl NewFaction {
  /// A faction with an inferred supergroup and no children.
  pub fn named(name: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      supergroup: Supergroup::from_faction_name(&name),
      name,
      ally_to: None,
      units: Vec::new(),
      detachments: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUnit {
  pub name:      String,
  pub unit_type: UnitType,
  pub variants:  Vec<NewVariant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewVariant {
  pub model_count: u32,
  pub points:      u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDetachment {
  pub name:         String,
  pub enhancements: Vec<NewEnhancement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnhancement {
  pub name:   String,
  pub points: u32,
}
