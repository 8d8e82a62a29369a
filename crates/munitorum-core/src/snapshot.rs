//! Read models assembled from the stored graph.
//!
//! A [`VersionSnapshot`] is never stored; it is materialised on read by
//! joining a version's rows back into a tree.

use serde::{Deserialize, Serialize};

use crate::model::{
  Detachment, Enhancement, Faction, MfmVersion, Unit, UnitVariant,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitView {
  pub unit:     Unit,
  pub variants: Vec<UnitVariant>,
}

impl UnitView {
  /// Points for a given model count, if that size exists.
  pub fn points_for(&self, model_count: u32) -> Option<u32> {
    self
      .variants
      .iter()
      .find(|v| v.model_count == model_count)
      .map(|v| v.points)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachmentView {
  pub detachment:   Detachment,
  pub enhancements: Vec<Enhancement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionView {
  pub faction:     Faction,
  pub units:       Vec<UnitView>,
  pub detachments: Vec<DetachmentView>,
}

/// The whole graph of one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
  pub version:  MfmVersion,
  pub factions: Vec<FactionView>,
}

impl VersionSnapshot {
  pub fn stats(&self) -> VersionStats {
    let mut stats = VersionStats {
      version: self.version.version.clone(),
      factions: self.factions.len(),
      ..Default::default()
    };
    for f in &self.factions {
      stats.units += f.units.len();
      stats.variants += f.units.iter().map(|u| u.variants.len()).sum::<usize>();
      stats.forge_world_units +=
        f.units.iter().filter(|u| u.unit.unit_type.is_forge_world()).count();
      stats.detachments += f.detachments.len();
      stats.enhancements +=
        f.detachments.iter().map(|d| d.enhancements.len()).sum::<usize>();
    }
    stats
  }
}

/// Row counts for one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStats {
  pub version:           String,
  pub factions:          usize,
  pub units:             usize,
  pub forge_world_units: usize,
  pub variants:          usize,
  pub detachments:       usize,
  pub enhancements:      usize,
}
