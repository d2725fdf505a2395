//! v002 -- Full-text index over cards.
//!
//! The index is maintained by the card CRUD helpers (see
//! `cards::reindex_card`) rather than triggers because tags and tips are
//! stored as JSON arrays and flattened on the way in.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS cards_fts USING fts5(
    card_id UNINDEXED,
    name,
    tags,
    description,
    tips,
    tokenize = 'porter unicode61'
);

INSERT INTO cards_fts (card_id, name, tags, description, tips)
SELECT c.id,
       c.name,
       (SELECT COALESCE(group_concat(value, ' '), '') FROM json_each(c.tags)),
       c.description,
       (SELECT COALESCE(group_concat(value, ' '), '') FROM json_each(c.tips))
FROM cards c;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
