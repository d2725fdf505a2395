//! CRUD, rating and search operations for [`Card`] records.
//!
//! Cards are mirrored into the `cards_fts` full-text table on every write
//! that touches an indexed column (name, tags, description, tips). Relevance
//! is FTS5's bm25 with per-column weights, name weighing the most.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;
use waypoint_shared::constants::{
    SEARCH_WEIGHT_DESCRIPTION, SEARCH_WEIGHT_NAME, SEARCH_WEIGHT_TAGS, SEARCH_WEIGHT_TIPS,
};
use waypoint_shared::geo::haversine_km;
use waypoint_shared::{BoundingBox, GeoPoint};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Card, CardUpdate, NearbyCard, NewCard, ScoredCard};
use crate::row;

/// Selected columns, in the order [`row_to_card`] reads them. Queries alias
/// `cards` as `c`.
const CARD_COLUMNS: &str = "c.id, c.name, c.description, c.address, c.hours, c.phone, \
     c.latitude, c.longitude, c.ambassador_id, c.rating_score, c.rating_count, \
     c.tips, c.tags, c.image, c.created_at";

const CARD_COLUMN_COUNT: usize = 15;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new card after checking that its owner is an ambassador.
    /// Rating counters start at zero.
    pub fn create_card(&mut self, new: &NewCard) -> Result<Card> {
        self.validate_ambassador(new.ambassador)?;

        let id = Uuid::new_v4();
        let tags = serde_json::to_string(&new.tags)?;

        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO cards (id, name, description, address, hours, phone, latitude,
                                longitude, ambassador_id, tags, image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id.to_string(),
                new.name,
                new.description,
                new.address,
                new.hours,
                new.phone,
                new.location.map(|p| p.latitude),
                new.location.map(|p| p.longitude),
                new.ambassador.to_string(),
                tags,
                new.image,
                row::format_ts(&row::now()),
            ],
        )?;
        reindex_card(&tx, id)?;
        tx.commit()?;

        tracing::info!(card = %id, ambassador = %new.ambassador, "card created");
        self.get_card(id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single card by id.
    pub fn get_card(&self, id: Uuid) -> Result<Card> {
        self.conn()
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM cards c WHERE c.id = ?1"),
                params![id.to_string()],
                row_to_card,
            )
            .map_err(StoreError::from_query)
    }

    /// List all cards, newest first.
    pub fn list_cards(&self) -> Result<Vec<Card>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards c ORDER BY c.created_at DESC, c.rowid DESC"
        ))?;

        let rows = stmt.query_map([], row_to_card)?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?);
        }
        Ok(cards)
    }

    /// List the cards owned by an ambassador, newest first.
    pub fn list_cards_by_ambassador(&self, ambassador: Uuid) -> Result<Vec<Card>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards c
             WHERE c.ambassador_id = ?1
             ORDER BY c.created_at DESC, c.rowid DESC"
        ))?;

        let rows = stmt.query_map(params![ambassador.to_string()], row_to_card)?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?);
        }
        Ok(cards)
    }

    /// Relevance-ranked full-text search. Any of the whitespace separated
    /// terms may match; results are ordered by descending score.
    pub fn search_cards(&self, term: &str) -> Result<Vec<ScoredCard>> {
        let Some(query) = fts_query(term) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT {CARD_COLUMNS},
                    -bm25(cards_fts, 0.0, {SEARCH_WEIGHT_NAME:.1}, {SEARCH_WEIGHT_TAGS:.1},
                          {SEARCH_WEIGHT_DESCRIPTION:.1}, {SEARCH_WEIGHT_TIPS:.1}) AS score
             FROM cards_fts
             JOIN cards c ON c.id = cards_fts.card_id
             WHERE cards_fts MATCH ?1
             ORDER BY score DESC, c.created_at DESC"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![query], |row| {
            Ok(ScoredCard {
                card: row_to_card(row)?,
                score: row.get(CARD_COLUMN_COUNT)?,
            })
        })?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?);
        }

        tracing::debug!(term, results = cards.len(), "card search");
        Ok(cards)
    }

    /// Cards within `radius_km` of `center`, nearest first. Cards without a
    /// location never match.
    pub fn cards_near(&self, center: GeoPoint, radius_km: f64) -> Result<Vec<NearbyCard>> {
        let bbox = BoundingBox::around(center, radius_km);

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards c
             WHERE c.latitude BETWEEN ?1 AND ?2
               AND c.longitude BETWEEN ?3 AND ?4"
        ))?;
        let rows = stmt.query_map(
            params![bbox.min_lat, bbox.max_lat, bbox.min_lng, bbox.max_lng],
            row_to_card,
        )?;

        let mut nearby = Vec::new();
        for row in rows {
            let card = row?;
            let Some(location) = card.location else {
                continue;
            };
            let distance_km = haversine_km(center, location);
            if distance_km <= radius_km {
                nearby.push(NearbyCard { card, distance_km });
            }
        }
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update. A new ambassador must pass the ambassador
    /// guard before anything is written.
    pub fn update_card(&mut self, id: Uuid, update: &CardUpdate) -> Result<Card> {
        if let Some(ambassador) = update.ambassador {
            self.validate_ambassador(ambassador)?;
        }

        let tags = update.tags.as_ref().map(serde_json::to_string).transpose()?;

        let tx = self.conn_mut().transaction()?;
        let affected = tx.execute(
            "UPDATE cards SET
                 name          = ?2,
                 description   = COALESCE(?3, description),
                 address       = COALESCE(?4, address),
                 hours         = COALESCE(?5, hours),
                 phone         = COALESCE(?6, phone),
                 latitude      = COALESCE(?7, latitude),
                 longitude     = COALESCE(?8, longitude),
                 ambassador_id = COALESCE(?9, ambassador_id),
                 tags          = COALESCE(?10, tags),
                 image         = COALESCE(?11, image)
             WHERE id = ?1",
            params![
                id.to_string(),
                update.name,
                update.description,
                update.address,
                update.hours,
                update.phone,
                update.location.map(|p| p.latitude),
                update.location.map(|p| p.longitude),
                update.ambassador.map(|a| a.to_string()),
                tags,
                update.image,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        reindex_card(&tx, id)?;
        tx.commit()?;

        self.get_card(id)
    }

    /// Add `delta` to the running rating sum and count one more rating.
    ///
    /// The delta is not range checked; values outside 1..=5 are only logged.
    pub fn rate_card(&self, id: Uuid, delta: f64) -> Result<Card> {
        if !(1.0..=5.0).contains(&delta) {
            tracing::warn!(card = %id, rating = delta, "rating outside 1..=5");
        }
        let affected = self.conn().execute(
            "UPDATE cards SET rating_score = rating_score + ?2, rating_count = rating_count + 1
             WHERE id = ?1",
            params![id.to_string(), delta],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_card(id)
    }

    /// Append a tip. Order is preserved and duplicates are kept.
    pub fn add_tip(&mut self, id: Uuid, tip: &str) -> Result<Card> {
        let tx = self.conn_mut().transaction()?;
        let affected = tx.execute(
            "UPDATE cards SET tips = json_insert(tips, '$[#]', ?2) WHERE id = ?1",
            params![id.to_string(), tip],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        reindex_card(&tx, id)?;
        tx.commit()?;

        self.get_card(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a card by id. Returns `true` if a row was deleted.
    ///
    /// The card disappears from block card lists and itinerary card lists,
    /// and blocks that had it selected are deselected.
    pub fn delete_card(&mut self, id: Uuid) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "DELETE FROM cards_fts WHERE card_id = ?1",
            params![id.to_string()],
        )?;
        let affected = tx.execute("DELETE FROM cards WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rebuild the full-text row of one card from its current columns.
pub(crate) fn reindex_card(conn: &Connection, id: Uuid) -> Result<()> {
    conn.execute(
        "DELETE FROM cards_fts WHERE card_id = ?1",
        params![id.to_string()],
    )?;
    conn.execute(
        "INSERT INTO cards_fts (card_id, name, tags, description, tips)
         SELECT c.id,
                c.name,
                (SELECT COALESCE(group_concat(value, ' '), '') FROM json_each(c.tags)),
                c.description,
                (SELECT COALESCE(group_concat(value, ' '), '') FROM json_each(c.tips))
         FROM cards c
         WHERE c.id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}

/// Whether a card with this id exists.
pub(crate) fn card_exists(conn: &Connection, id: Uuid) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM cards WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

/// Load several cards at once, keyed by id. Missing ids are skipped.
pub(crate) fn cards_by_ids(conn: &Connection, ids: &[Uuid]) -> Result<HashMap<Uuid, Card>> {
    let mut map = HashMap::new();
    if ids.is_empty() {
        return Ok(map);
    }

    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM cards c WHERE c.id IN ({})",
        row::placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params_from_iter(ids.iter().map(|id| id.to_string())),
        row_to_card,
    )?;
    for row in rows {
        let card = row?;
        map.insert(card.id, card);
    }
    Ok(map)
}

/// Turn free text into an FTS5 query: every whitespace separated term is
/// quoted (so operators and punctuation are matched literally) and the terms
/// are OR-ed. Terms without a letter or digit tokenize to nothing and are
/// dropped. `None` when no terms are left.
fn fts_query(term: &str) -> Option<String> {
    let terms: Vec<String> = term
        .split_whitespace()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Map a `rusqlite::Row` to a [`Card`].
fn row_to_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<Card> {
    let rating_score: f64 = row.get(9)?;
    let rating_count: i64 = row.get(10)?;
    let average_rating = (rating_count > 0).then(|| rating_score / rating_count as f64);

    Ok(Card {
        id: row::uuid(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        address: row.get(3)?,
        hours: row.get(4)?,
        phone: row.get(5)?,
        location: row::geo_point(row, 6)?,
        ambassador: row::uuid(row, 8)?,
        rating_score,
        rating_count,
        average_rating,
        tips: row::string_list(row, 11)?,
        tags: row::string_list(row, 12)?,
        image: row.get(13)?,
        created_at: row::timestamp(row, 14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ambassador, card_at, new_card, new_user};

    #[test]
    fn create_then_get_round_trip() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);

        let created = db.create_card(&new_card(&owner, "Cafe X")).unwrap();
        let fetched = db.get_card(created.id).unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Cafe X");
        assert_eq!(fetched.description, "desc");
        assert_eq!(fetched.hours, "9-5");
        assert_eq!(fetched.ambassador, owner.id);
        assert_eq!((fetched.rating_score, fetched.rating_count), (0.0, 0));
        assert_eq!(fetched.average_rating, None);
    }

    #[test]
    fn create_requires_ambassador_owner() {
        let mut db = Database::open_in_memory().unwrap();
        let plain = db.create_user(&new_user("plain@x.com", false)).unwrap();

        let err = db.create_card(&new_card(&plain, "Cafe X")).unwrap_err();
        assert!(matches!(err, StoreError::NotAmbassador));
        assert!(db.list_cards().unwrap().is_empty());
    }

    #[test]
    fn missing_card_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.get_card(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.rate_card(Uuid::new_v4(), 3.0),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn rating_accumulates() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let card = db.create_card(&new_card(&owner, "Cafe X")).unwrap();

        db.rate_card(card.id, 3.0).unwrap();
        let rated = db.rate_card(card.id, 4.0).unwrap();

        assert_eq!(rated.rating_score, 7.0);
        assert_eq!(rated.rating_count, 2);
        assert_eq!(rated.average_rating, Some(3.5));
    }

    #[test]
    fn tips_keep_order_and_duplicates() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let card = db.create_card(&new_card(&owner, "Cafe X")).unwrap();

        db.add_tip(card.id, "try the mole").unwrap();
        db.add_tip(card.id, "go early").unwrap();
        let card = db.add_tip(card.id, "try the mole").unwrap();

        assert_eq!(card.tips, vec!["try the mole", "go early", "try the mole"]);
    }

    #[test]
    fn search_ranks_name_above_description() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);

        let mut in_description = new_card(&owner, "Corner Spot");
        in_description.description = "Known for tacos al pastor".to_string();
        let in_description = db.create_card(&in_description).unwrap();
        let in_name = db.create_card(&new_card(&owner, "Taco Palace")).unwrap();
        db.create_card(&new_card(&owner, "Bookshop")).unwrap();

        let results = db.search_cards("taco").unwrap();
        let ids: Vec<Uuid> = results.iter().map(|r| r.card.id).collect();
        assert_eq!(ids, vec![in_name.id, in_description.id]);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn search_covers_tags_and_tips() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);

        let mut tagged = new_card(&owner, "Place A");
        tagged.tags = vec!["rooftop".to_string()];
        let tagged = db.create_card(&tagged).unwrap();

        let tipped = db.create_card(&new_card(&owner, "Place B")).unwrap();
        assert!(db.search_cards("sunset").unwrap().is_empty());
        db.add_tip(tipped.id, "great at sunset").unwrap();

        assert_eq!(db.search_cards("rooftop").unwrap()[0].card.id, tagged.id);
        assert_eq!(db.search_cards("sunset").unwrap()[0].card.id, tipped.id);

        let both = db.search_cards("rooftop sunset").unwrap();
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn search_tolerates_query_syntax() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        db.create_card(&new_card(&owner, "Cafe X")).unwrap();

        for term in ["\"", "cafe AND", "NEAR(", "x*", "-cafe", "   "] {
            assert!(db.search_cards(term).is_ok(), "term {term:?}");
        }
    }

    #[test]
    fn update_changes_fields_and_index() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let card = db.create_card(&new_card(&owner, "Old Name")).unwrap();

        let updated = db
            .update_card(
                card.id,
                &CardUpdate {
                    name: "Fresh Name".to_string(),
                    hours: Some("8-8".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Fresh Name");
        assert_eq!(updated.hours, "8-8");
        assert_eq!(updated.address, card.address);

        assert!(db.search_cards("old").unwrap().is_empty());
        assert_eq!(db.search_cards("fresh").unwrap().len(), 1);
    }

    #[test]
    fn update_guards_new_ambassador() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let plain = db.create_user(&new_user("plain@x.com", false)).unwrap();
        let card = db.create_card(&new_card(&owner, "Cafe X")).unwrap();

        let err = db
            .update_card(
                card.id,
                &CardUpdate {
                    name: "Cafe X".to_string(),
                    ambassador: Some(plain.id),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAmbassador));

        let err = db
            .update_card(
                Uuid::new_v4(),
                &CardUpdate {
                    name: "Nope".to_string(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn near_filters_and_orders_by_distance() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);

        // Around the Zocalo in Mexico City.
        let center = GeoPoint::new(19.4326, -99.1332).unwrap();
        let far = card_at(&mut db, &owner, "Far", 19.50, -99.20);
        let close = card_at(&mut db, &owner, "Close", 19.4330, -99.1335);
        card_at(&mut db, &owner, "Guadalajara", 20.6597, -103.3496);
        db.create_card(&new_card(&owner, "Nowhere")).unwrap();

        let nearby = db.cards_near(center, 25.0).unwrap();
        let ids: Vec<Uuid> = nearby.iter().map(|n| n.card.id).collect();
        assert_eq!(ids, vec![close.id, far.id]);
        assert!(nearby[0].distance_km < 0.1);
    }

    #[test]
    fn near_includes_points_at_the_east_west_edge() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);

        // ~998 km due east-ish of the center, at the cap's widest longitude.
        let center = GeoPoint::new(60.0, 0.0).unwrap();
        let east = card_at(&mut db, &owner, "East", 61.2566, 18.1894);
        let west = card_at(&mut db, &owner, "West", 61.2566, -18.1894);

        let nearby = db.cards_near(center, 1000.0).unwrap();
        let mut ids: Vec<Uuid> = nearby.iter().map(|n| n.card.id).collect();
        ids.sort();
        let mut expected = vec![east.id, west.id];
        expected.sort();
        assert_eq!(ids, expected);
        assert!(nearby.iter().all(|n| n.distance_km < 1000.0));
    }

    #[test]
    fn delete_removes_card_and_index_row() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let card = db.create_card(&new_card(&owner, "Cafe X")).unwrap();

        assert!(db.delete_card(card.id).unwrap());
        assert!(!db.delete_card(card.id).unwrap());
        assert!(db.search_cards("cafe").unwrap().is_empty());
        assert!(db.list_cards_by_ambassador(owner.id).unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let first = db.create_card(&new_card(&owner, "First")).unwrap();
        let second = db.create_card(&new_card(&owner, "Second")).unwrap();

        let ids: Vec<Uuid> = db.list_cards().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn fts_query_quotes_terms() {
        assert_eq!(fts_query("  "), None);
        assert_eq!(fts_query("\" -- *"), None);
        assert_eq!(fts_query("taco bar").unwrap(), "\"taco\" OR \"bar\"");
        assert_eq!(fts_query("say\"hi").unwrap(), "\"say\"\"hi\"");
    }
}
