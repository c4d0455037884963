//! SQL schema for the prism SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `external_id` is the primary key — this uniqueness constraint is what the
/// sync pipeline's create-only insert relies on. Set-valued fields are stored
/// as JSON arrays and queried with `json_each`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS products (
    external_id        TEXT PRIMARY KEY,
    title              TEXT NOT NULL DEFAULT '',
    description        TEXT NOT NULL DEFAULT '',
    handle             TEXT NOT NULL DEFAULT '',
    created_at         TEXT,            -- ISO 8601 UTC, as imported
    price_amount       REAL,
    price_currency     TEXT,
    collections        TEXT NOT NULL DEFAULT '[]',  -- JSON array of GIDs
    collection_handles TEXT NOT NULL DEFAULT '[]',  -- JSON array
    options            TEXT NOT NULL DEFAULT '[]',  -- JSON array of {name, values}
    option_values      TEXT NOT NULL DEFAULT '[]',  -- JSON array, denormalized

    -- Normalized attributes; NULL means the metafield was absent or invalid.
    style              TEXT,
    shape              TEXT,
    cut                TEXT,
    carat              REAL,
    carat_size         TEXT,            -- JSON array of numbers
    ring_carat         TEXT,            -- JSON array of numbers
    clarity            TEXT,
    diamond_color      TEXT,
    polish             TEXT,
    symmetry           TEXT,
    certification      TEXT,
    fluorescence       TEXT,
    depth              REAL,
    lw_ratio           REAL,
    table_pct          REAL,            -- 'table' is an SQL keyword

    -- Presence flags, derived from style/cut/shape at write time.
    -- Used only to push attribute-less records to the end of a sort.
    has_style          INTEGER NOT NULL DEFAULT 0,
    has_cut            INTEGER NOT NULL DEFAULT 0,
    has_shape          INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS products_style_idx   ON products(style);
CREATE INDEX IF NOT EXISTS products_shape_idx   ON products(shape);
CREATE INDEX IF NOT EXISTS products_cut_idx     ON products(cut);
CREATE INDEX IF NOT EXISTS products_price_idx   ON products(price_amount);
CREATE INDEX IF NOT EXISTS products_created_idx ON products(created_at);

PRAGMA user_version = 1;
";
