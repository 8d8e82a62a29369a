//! SQL schema for the Munitorum SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS mfm_versions (
    version_id    TEXT PRIMARY KEY,
    version       TEXT NOT NULL UNIQUE,   -- e.g. '3.2'
    release_label TEXT,                   -- e.g. 'June 2025'
    is_latest     INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1,
    source_hash   TEXT,                   -- hex SHA-256 of the ingested text
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS mfm_factions (
    faction_id  TEXT PRIMARY KEY,
    version_id  TEXT NOT NULL REFERENCES mfm_versions(version_id),
    name        TEXT NOT NULL,
    supergroup  TEXT NOT NULL,            -- 'Imperium' | 'Chaos' | 'Xenos'
    ally_to     TEXT,
    UNIQUE (version_id, name)
);

CREATE TABLE IF NOT EXISTS mfm_units (
    unit_id     TEXT PRIMARY KEY,
    faction_id  TEXT NOT NULL REFERENCES mfm_factions(faction_id),
    name        TEXT NOT NULL,
    unit_type   TEXT NOT NULL             -- 'standard' | 'forge_world'
);

CREATE TABLE IF NOT EXISTS mfm_unit_variants (
    variant_id  TEXT PRIMARY KEY,
    unit_id     TEXT NOT NULL REFERENCES mfm_units(unit_id),
    model_count INTEGER NOT NULL CHECK (model_count >= 0),
    points      INTEGER NOT NULL CHECK (points >= 0)
);

CREATE TABLE IF NOT EXISTS mfm_detachments (
    detachment_id TEXT PRIMARY KEY,
    faction_id    TEXT NOT NULL REFERENCES mfm_factions(faction_id),
    name          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS mfm_enhancements (
    enhancement_id TEXT PRIMARY KEY,
    detachment_id  TEXT NOT NULL REFERENCES mfm_detachments(detachment_id),
    name           TEXT NOT NULL,
    points         INTEGER NOT NULL CHECK (points >= 0)
);

CREATE INDEX IF NOT EXISTS mfm_factions_version_idx    ON mfm_factions(version_id);
CREATE INDEX IF NOT EXISTS mfm_units_faction_idx       ON mfm_units(faction_id);
CREATE INDEX IF NOT EXISTS mfm_variants_unit_idx       ON mfm_unit_variants(unit_id);
CREATE INDEX IF NOT EXISTS mfm_detachments_faction_idx ON mfm_detachments(faction_id);
CREATE INDEX IF NOT EXISTS mfm_enhancements_det_idx    ON mfm_enhancements(detachment_id);

PRAGMA user_version = 1;
";
