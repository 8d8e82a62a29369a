//! Reader for the structured points files (`window.MFM_BASE = {...};` and
//! friends).
//!
//! The files are JavaScript assignments whose right-hand side is almost JSON.
//! The object literal is cut out by brace counting, comments and trailing
//! commas are dropped, and the rest goes through `serde_json`.

use std::{fmt, marker::PhantomData};

use munitorum_core::{
  model::{
    NewDetachment, NewEnhancement, NewFaction, NewUnit, NewVariant,
    Supergroup, UnitType,
  },
  version::latest_by,
};
use serde::{
  Deserialize, Deserializer,
  de::{DeserializeOwned, MapAccess, Visitor},
};

use crate::error::{Error, Result};

// ─── Object literal extraction ───────────────────────────────────────────────

/// The first balanced `{ ... }` in `source`, ignoring braces inside quoted
/// strings and comments.
pub fn extract_object_literal(source: &str) -> Result<&str> {
  let mut scanner = Scanner::new(source);
  let mut start = None;
  let mut depth = 0usize;
  while let Some((i, c)) = scanner.next_code_char() {
    match c {
      '{' => {
        if depth == 0 {
          start = Some(i);
        }
        depth += 1;
      }
      '}' if depth > 0 => {
        depth -= 1;
        if depth == 0
          && let Some(start) = start
        {
          return Ok(&source[start..=i]);
        }
      }
      _ => {}
    }
  }
  match start {
    None => Err(Error::MissingObjectLiteral),
    Some(_) => Err(Error::UnbalancedBraces(depth)),
  }
}

/// Drop comments and commas that directly precede `}` or `]`.
pub fn strip_trailing_commas(literal: &str) -> String {
  let mut out = String::with_capacity(literal.len());
  let mut scanner = Scanner::new(literal);
  let mut pending_comma: Option<String> = None;
  while let Some(piece) = scanner.next_piece() {
    match piece {
      Piece::Code(',') => {
        if let Some(comma) = pending_comma.take() {
          out.push_str(&comma);
        }
        pending_comma = Some(",".to_owned());
      }
      Piece::Code(c) if c.is_whitespace() => match &mut pending_comma {
        Some(comma) => comma.push(c),
        None => out.push(c),
      },
      Piece::Code(c) => {
        if let Some(comma) = pending_comma.take()
          && c != '}'
          && c != ']'
        {
          out.push_str(&comma);
        }
        out.push(c);
      }
      Piece::Quoted(s) => {
        if let Some(comma) = pending_comma.take() {
          out.push_str(&comma);
        }
        out.push_str(s);
      }
      Piece::Comment => {}
    }
  }
  if let Some(comma) = pending_comma {
    out.push_str(&comma);
  }
  out
}

/// Parse the object assigned in a `window.X = {...};` file.
pub fn parse_assignment<T: DeserializeOwned>(source: &str) -> Result<T> {
  let literal = extract_object_literal(source)?;
  Ok(serde_json::from_str(&strip_trailing_commas(literal))?)
}

enum Piece<'a> {
  Code(char),
  /// A complete quoted string, quotes included.
  Quoted(&'a str),
  Comment,
}

/// Walks JS-ish source separating code characters from strings and
/// comments.
struct Scanner<'a> {
  src: &'a str,
  pos: usize,
}

impl<'a> Scanner<'a> {
  fn new(src: &'a str) -> Self { Self { src, pos: 0 } }

  fn peek_at(&self, offset: usize) -> Option<char> {
    self.src[self.pos..].chars().nth(offset)
  }

  fn next_piece(&mut self) -> Option<Piece<'a>> {
    let c = self.peek_at(0)?;
    let start = self.pos;
    match c {
      '"' | '\'' => {
        self.pos += c.len_utf8();
        let mut escaped = false;
        for ch in self.src[self.pos..].chars() {
          self.pos += ch.len_utf8();
          if escaped {
            escaped = false;
          } else if ch == '\\' {
            escaped = true;
          } else if ch == c {
            break;
          }
        }
        Some(Piece::Quoted(&self.src[start..self.pos]))
      }
      '/' if self.peek_at(1) == Some('/') => {
        let rest = &self.src[self.pos..];
        self.pos += rest.find('\n').unwrap_or(rest.len());
        Some(Piece::Comment)
      }
      '/' if self.peek_at(1) == Some('*') => {
        let rest = &self.src[self.pos + 2..];
        self.pos += 2 + rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
        Some(Piece::Comment)
      }
      _ => {
        self.pos += c.len_utf8();
        Some(Piece::Code(c))
      }
    }
  }

  /// The next code character and its byte offset.
  fn next_code_char(&mut self) -> Option<(usize, char)> {
    loop {
      let at = self.pos;
      match self.next_piece()? {
        Piece::Code(c) => return Some((at, c)),
        Piece::Quoted(_) | Piece::Comment => continue,
      }
    }
  }
}

// ─── File shapes ─────────────────────────────────────────────────────────────

/// A JSON object read with its key order intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
  fn default() -> Self { Self(Vec::new()) }
}

impl<V> OrderedMap<V> {
  pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Case-insensitive key lookup.
  pub fn get(&self, key: &str) -> Option<&V> {
    self
      .0
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(key))
      .map(|(_, v)| v)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> { self.0.iter().map(|(k, _)| k.as_str()) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
      type Value = OrderedMap<V>;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry()? {
          entries.push((k, v));
        }
        Ok(OrderedMap(entries))
      }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
  }
}

/// `window.MFM_BASE`.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseFile {
  #[serde(deserialize_with = "version_string")]
  pub version:  String,
  #[serde(default)]
  pub date:     Option<String>,
  #[serde(default)]
  pub factions: OrderedMap<FactionMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactionMeta {
  #[serde(default)]
  pub supergroup: Option<String>,
  #[serde(default, rename = "allyTo")]
  pub ally_to:    Option<String>,
}

/// `window.MFM_UNITS`: faction → unit → entry.
pub type UnitsFile = OrderedMap<OrderedMap<UnitEntry>>;

/// `window.MFM_DETACHMENTS`: faction → detachment → enhancement → points.
pub type DetachmentsFile = OrderedMap<OrderedMap<OrderedMap<PointsValue>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct UnitEntry {
  #[serde(default, rename = "forgeWorld")]
  pub forge_world: bool,
  #[serde(default)]
  pub variants:    Vec<VariantEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantEntry {
  pub models: u32,
  pub points: PointsValue,
}

/// A points value, either fixed or keyed by version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PointsValue {
  Flat(u32),
  ByVersion(OrderedMap<u32>),
}

impl PointsValue {
  /// The value for `version`, else the value of the greatest version
  /// present.
  pub fn for_version(&self, version: &str) -> Option<u32> {
    match self {
      Self::Flat(p) => Some(*p),
      Self::ByVersion(map) => map
        .get(version)
        .copied()
        .or_else(|| latest_by(map.iter(), |(v, _)| *v).map(|(_, p)| *p)),
    }
  }
}

fn version_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
  match serde_json::Value::deserialize(d)? {
    serde_json::Value::String(s) => Ok(s),
    serde_json::Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!(
      "expected a version string, got {other}"
    ))),
  }
}

// ─── Graph building ──────────────────────────────────────────────────────────

/// Assemble the write graph for `version` from one set of structured files.
///
/// Factions come in base-file order, followed by any faction that only
/// appears in the units or detachments file. Names repeated in any file
/// (ignoring case) collapse onto their first appearance.
pub fn build_structured_graph(
  base: &BaseFile,
  units: &UnitsFile,
  detachments: &DetachmentsFile,
  version: &str,
) -> Vec<NewFaction> {
  let mut names: Vec<&str> = Vec::new();
  for name in base.factions.keys().chain(units.keys()).chain(detachments.keys()) {
    if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
      names.push(name);
    }
  }

  names
    .into_iter()
    .map(|name| {
      let mut faction = NewFaction::named(name);
      if let Some(meta) = base.factions.get(name) {
        if let Some(sg) = meta.supergroup.as_deref().and_then(|s| s.parse::<Supergroup>().ok()) {
          faction.supergroup = sg;
        }
        faction.ally_to = meta.ally_to.clone();
      }
      if let Some(unit_map) = units.get(name) {
        faction.units = unit_map
          .iter()
          .map(|(unit_name, entry)| structured_unit(unit_name, entry, version))
          .collect();
      }
      if let Some(det_map) = detachments.get(name) {
        faction.detachments = det_map
          .iter()
          .map(|(det_name, enhancements)| NewDetachment {
            name:         det_name.to_owned(),
            enhancements: enhancements
              .iter()
              .filter_map(|(enh_name, points)| {
                Some(NewEnhancement {
                  name:   enh_name.to_owned(),
                  points: points.for_version(version)?,
                })
              })
              .collect(),
          })
          .collect();
      }
      faction
    })
    .collect()
}

fn structured_unit(name: &str, entry: &UnitEntry, version: &str) -> NewUnit {
  let mut variants: Vec<NewVariant> = Vec::new();
  for v in &entry.variants {
    let Some(points) = v.points.for_version(version) else { continue };
    let variant = NewVariant { model_count: v.models, points };
    if !variants.contains(&variant) {
      variants.push(variant);
    }
  }
  NewUnit {
    name: name.to_owned(),
    unit_type: UnitType::from_forge_world(entry.forge_world),
    variants,
  }
}
