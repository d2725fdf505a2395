//! v001 -- Initial schema creation.
//!
//! Creates the entity tables (`users`, `cards`, `destinations`,
//! `itineraries`, `blocks`) and the ordered reference lists that link them.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    email         TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    password_hash TEXT NOT NULL,               -- hex(salt) $ hex(key)
    is_ambassador INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    itinerary_id  TEXT,                        -- nullable FK -> itineraries(id)
    created_at    TEXT NOT NULL,               -- RFC-3339

    FOREIGN KEY (itinerary_id) REFERENCES itineraries(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_users_ambassador ON users(is_ambassador);

-- ----------------------------------------------------------------
-- Cards (points of interest)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS cards (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name          TEXT NOT NULL,
    description   TEXT NOT NULL,
    address       TEXT NOT NULL,
    hours         TEXT NOT NULL,
    phone         TEXT,
    latitude      REAL,
    longitude     REAL,
    ambassador_id TEXT NOT NULL,               -- FK -> users(id)
    rating_score  REAL NOT NULL DEFAULT 0,
    rating_count  INTEGER NOT NULL DEFAULT 0,
    tips          TEXT NOT NULL DEFAULT '[]',  -- JSON array, insertion order
    tags          TEXT NOT NULL DEFAULT '[]',  -- JSON array
    image         TEXT,
    created_at    TEXT NOT NULL,

    FOREIGN KEY (ambassador_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_cards_ambassador ON cards(ambassador_id);
CREATE INDEX IF NOT EXISTS idx_cards_geo ON cards(latitude, longitude);

-- ----------------------------------------------------------------
-- Destinations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS destinations (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    location_name TEXT NOT NULL,
    tags          TEXT NOT NULL DEFAULT '[]',  -- JSON array
    latitude      REAL,
    longitude     REAL,
    distance      REAL NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_destinations_geo ON destinations(latitude, longitude);

-- ----------------------------------------------------------------
-- Itineraries
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS itineraries (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    partners       TEXT NOT NULL,
    ambassador_id  TEXT,                       -- nullable FK -> users(id)
    destination_id TEXT,                       -- nullable FK -> destinations(id)
    date_start     TEXT,
    date_end       TEXT,
    created_at     TEXT NOT NULL,

    FOREIGN KEY (ambassador_id) REFERENCES users(id),
    FOREIGN KEY (destination_id) REFERENCES destinations(id)
);

CREATE INDEX IF NOT EXISTS idx_itineraries_ambassador ON itineraries(ambassador_id);

-- ----------------------------------------------------------------
-- Blocks
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS blocks (
    id               TEXT PRIMARY KEY NOT NULL, -- UUID v4
    title            TEXT NOT NULL,
    date             TEXT,
    selected_card_id TEXT,                      -- nullable FK -> cards(id)
    created_at       TEXT NOT NULL,

    FOREIGN KEY (selected_card_id) REFERENCES cards(id) ON DELETE SET NULL
);

-- ----------------------------------------------------------------
-- Ordered reference lists
-- ----------------------------------------------------------------

-- Candidate cards of a block; a card appears at most once per block.
CREATE TABLE IF NOT EXISTS block_cards (
    block_id TEXT NOT NULL,
    card_id  TEXT NOT NULL,
    position INTEGER NOT NULL,

    PRIMARY KEY (block_id, card_id),
    FOREIGN KEY (block_id) REFERENCES blocks(id) ON DELETE CASCADE,
    FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_block_cards_order ON block_cards(block_id, position);

-- Blocks of an itinerary; a block belongs to one itinerary.
CREATE TABLE IF NOT EXISTS itinerary_blocks (
    itinerary_id TEXT NOT NULL,
    block_id     TEXT NOT NULL UNIQUE,
    position     INTEGER NOT NULL,

    PRIMARY KEY (itinerary_id, block_id),
    FOREIGN KEY (itinerary_id) REFERENCES itineraries(id) ON DELETE CASCADE,
    FOREIGN KEY (block_id) REFERENCES blocks(id) ON DELETE CASCADE
);

-- Cards pinned directly on an itinerary; duplicates are allowed.
CREATE TABLE IF NOT EXISTS itinerary_cards (
    itinerary_id TEXT NOT NULL,
    card_id      TEXT NOT NULL,
    position     INTEGER NOT NULL,

    PRIMARY KEY (itinerary_id, position),
    FOREIGN KEY (itinerary_id) REFERENCES itineraries(id) ON DELETE CASCADE,
    FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
