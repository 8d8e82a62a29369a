//! Group flat parse records into the write-side entity graph.

use std::collections::HashMap;

use munitorum_core::{
  bulletin::ParsedBulletin,
  model::{
    NewDetachment, NewEnhancement, NewFaction, NewUnit, NewVariant, UnitType,
  },
};

/// Build the graph for one parsed bulletin.
///
/// Factions keep first-appearance order. Units are keyed by
/// `(name, forge_world)` with variants deduplicated on
/// `(model_count, points)`; detachments are keyed by name and keep the first
/// enhancement of each name. Units are not attached to detachments.
pub fn build_graph(parsed: &ParsedBulletin) -> Vec<NewFaction> {
  let mut graph = GraphBuilder::default();

  for f in &parsed.factions {
    let faction = graph.faction(&f.name);
    faction.supergroup = f.supergroup;
    faction.ally_to = f.ally_to.clone();
  }

  for u in &parsed.units {
    let faction = graph.faction(&u.faction);
    let unit_type = UnitType::from_forge_world(u.forge_world);
    let idx = match faction
      .units
      .iter()
      .position(|x| x.name == u.name && x.unit_type == unit_type)
    {
      Some(i) => i,
      None => {
        faction.units.push(NewUnit {
          name: u.name.clone(),
          unit_type,
          variants: Vec::new(),
        });
        faction.units.len() - 1
      }
    };
    let variant = NewVariant { model_count: u.model_count, points: u.points };
    let unit = &mut faction.units[idx];
    if !unit.variants.contains(&variant) {
      unit.variants.push(variant);
    }
  }

  for d in &parsed.detachments {
    graph.detachment(&d.faction, &d.name);
  }

  for e in &parsed.enhancements {
    let detachment = graph.detachment(&e.faction, &e.detachment);
    if !detachment.enhancements.iter().any(|x| x.name == e.name) {
      detachment.enhancements.push(NewEnhancement {
        name:   e.name.clone(),
        points: e.points,
      });
    }
  }

  graph.factions
}

#[derive(Default)]
struct GraphBuilder {
  factions: Vec<NewFaction>,
  index:    HashMap<String, usize>,
}

impl GraphBuilder {
  fn faction(&mut self, name: &str) -> &mut NewFaction {
    let idx = match self.index.get(name) {
      Some(&i) => i,
      None => {
        self.factions.push(NewFaction::named(name));
        self.index.insert(name.to_owned(), self.factions.len() - 1);
        self.factions.len() - 1
      }
    };
    &mut self.factions[idx]
  }

  fn detachment(&mut self, faction: &str, name: &str) -> &mut NewDetachment {
    let faction = self.faction(faction);
    let idx = match faction.detachments.iter().position(|d| d.name == name) {
      Some(i) => i,
      None => {
        faction.detachments.push(NewDetachment {
          name:         name.to_owned(),
          enhancements: Vec::new(),
        });
        faction.detachments.len() - 1
      }
    };
    &mut faction.detachments[idx]
  }
}

/// Row counts of a write graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct GraphCounts {
  pub factions:     usize,
  pub units:        usize,
  pub variants:     usize,
  pub detachments:  usize,
  pub enhancements: usize,
}

impl GraphCounts {
  pub fn of(graph: &[NewFaction]) -> Self {
    let mut counts = Self { factions: graph.len(), ..Self::default() };
    for f in graph {
      counts.units += f.units.len();
      counts.variants += f.units.iter().map(|u| u.variants.len()).sum::<usize>();
      counts.detachments += f.detachments.len();
      counts.enhancements +=
        f.detachments.iter().map(|d| d.enhancements.len()).sum::<usize>();
    }
    counts
  }
}
