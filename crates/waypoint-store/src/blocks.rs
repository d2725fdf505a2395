//! Blocks: dated groups of candidate cards inside an itinerary.
//!
//! The card list of a block is the `block_cards` table; every mutation of it
//! is a single statement so concurrent requests cannot lose updates. All
//! public operations hand back a [`PopulatedBlock`].

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::cards::card_exists;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Block, NewBlock, PopulatedBlock};
use crate::population::populate_block;
use crate::row;
use crate::users::user_itinerary;

const BLOCK_COLUMNS: &str = "id, title, date, selected_card_id, created_at";

impl Database {
    /// Insert a block and, when `owner` has an itinerary, append it to that
    /// itinerary's block list in the same transaction.
    pub fn create_block(&mut self, owner: Uuid, new: &NewBlock) -> Result<PopulatedBlock> {
        let id = Uuid::new_v4();

        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO blocks (id, title, date, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                id.to_string(),
                new.title,
                new.date.as_ref().map(row::format_ts),
                row::format_ts(&row::now()),
            ],
        )?;

        if let Some(itinerary) = user_itinerary(&tx, owner)? {
            tx.execute(
                "INSERT INTO itinerary_blocks (itinerary_id, block_id, position)
                 SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
                 FROM itinerary_blocks WHERE itinerary_id = ?1",
                params![itinerary.to_string(), id.to_string()],
            )?;
            tracing::debug!(block = %id, itinerary = %itinerary, "block attached to itinerary");
        }
        tx.commit()?;

        tracing::info!(block = %id, user = %owner, "block created");
        self.get_populated_block(id)
    }

    /// Fetch a block with card references as ids.
    pub fn get_block(&self, id: Uuid) -> Result<Block> {
        get_block(self.conn(), id)
    }

    /// Fetch a block with its cards and selection expanded.
    pub fn get_populated_block(&self, id: Uuid) -> Result<PopulatedBlock> {
        let block = get_block(self.conn(), id)?;
        populate_block(self.conn(), block)
    }

    /// Append a card to the block unless it is already there.
    pub fn add_card_to_block(&self, block: Uuid, card: Uuid) -> Result<PopulatedBlock> {
        self.require_block_and_card(block, card)?;

        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO block_cards (block_id, card_id, position)
             SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
             FROM block_cards WHERE block_id = ?1",
            params![block.to_string(), card.to_string()],
        )?;
        if inserted == 0 {
            tracing::debug!(block = %block, card = %card, "card already in block");
        }
        self.get_populated_block(block)
    }

    /// Mark `card` as the block's chosen card, replacing any earlier choice.
    pub fn select_card(&self, block: Uuid, card: Uuid) -> Result<PopulatedBlock> {
        self.require_block_and_card(block, card)?;

        self.conn().execute(
            "UPDATE blocks SET selected_card_id = ?2 WHERE id = ?1",
            params![block.to_string(), card.to_string()],
        )?;
        self.get_populated_block(block)
    }

    pub fn deselect_card(&self, block: Uuid) -> Result<PopulatedBlock> {
        let affected = self.conn().execute(
            "UPDATE blocks SET selected_card_id = NULL WHERE id = ?1",
            params![block.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_populated_block(block)
    }

    /// Drop `card` from the block's card list. Removing a card that is not
    /// in the list is a no-op.
    pub fn remove_card_from_block(&self, block: Uuid, card: Uuid) -> Result<PopulatedBlock> {
        get_block(self.conn(), block)?;

        self.conn().execute(
            "DELETE FROM block_cards WHERE block_id = ?1 AND card_id = ?2",
            params![block.to_string(), card.to_string()],
        )?;
        self.get_populated_block(block)
    }

    /// Delete a block. It also leaves its itinerary's block list. Returns
    /// `true` if a row was deleted.
    pub fn delete_block(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM blocks WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    /// Blocks of the user's itinerary in itinerary order, populated. Empty
    /// when the user has no itinerary.
    pub fn list_blocks_for_user(&self, user: Uuid) -> Result<Vec<PopulatedBlock>> {
        let Some(itinerary) = user_itinerary(self.conn(), user)? else {
            return Ok(Vec::new());
        };

        let mut blocks = Vec::new();
        for id in itinerary_block_ids(self.conn(), itinerary)? {
            blocks.push(populate_block(self.conn(), get_block(self.conn(), id)?)?);
        }
        Ok(blocks)
    }

    fn require_block_and_card(&self, block: Uuid, card: Uuid) -> Result<()> {
        get_block(self.conn(), block)?;
        if !card_exists(self.conn(), card)? {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn get_block(conn: &Connection, id: Uuid) -> Result<Block> {
    let mut block = conn
        .query_row(
            &format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE id = ?1"),
            params![id.to_string()],
            row_to_block,
        )
        .map_err(StoreError::from_query)?;
    block.cards = block_card_ids(conn, id)?;
    Ok(block)
}

/// Card ids of a block in insertion order.
pub(crate) fn block_card_ids(conn: &Connection, block: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt =
        conn.prepare("SELECT card_id FROM block_cards WHERE block_id = ?1 ORDER BY position")?;
    let rows = stmt.query_map(params![block.to_string()], |row| row::uuid(row, 0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Block ids of an itinerary in attachment order.
pub(crate) fn itinerary_block_ids(conn: &Connection, itinerary: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT block_id FROM itinerary_blocks WHERE itinerary_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![itinerary.to_string()], |row| row::uuid(row, 0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Map a `rusqlite::Row` to a [`Block`] without its card list.
fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    Ok(Block {
        id: row::uuid(row, 0)?,
        title: row.get(1)?,
        date: row::opt_timestamp(row, 2)?,
        cards: Vec::new(),
        selected_card: row::opt_uuid(row, 3)?,
        created_at: row::timestamp(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewItinerary;
    use crate::test_support::{ambassador, new_card, new_user};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn block(title: &str) -> NewBlock {
        NewBlock {
            title: title.to_string(),
            date: None,
        }
    }

    #[test]
    fn add_card_is_idempotent_and_ordered() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let a = db.create_card(&new_card(&owner, "A")).unwrap();
        let b = db.create_card(&new_card(&owner, "B")).unwrap();
        let blk = db.create_block(owner.id, &block("Day 1")).unwrap();

        db.add_card_to_block(blk.id, a.id).unwrap();
        db.add_card_to_block(blk.id, b.id).unwrap();
        let populated = db.add_card_to_block(blk.id, a.id).unwrap();

        let ids: Vec<Uuid> = populated.cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(db.get_block(blk.id).unwrap().cards, vec![a.id, b.id]);
    }

    #[test]
    fn add_unknown_card_or_block_is_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let card = db.create_card(&new_card(&owner, "A")).unwrap();
        let blk = db.create_block(owner.id, &block("Day 1")).unwrap();

        assert!(matches!(
            db.add_card_to_block(blk.id, Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.add_card_to_block(Uuid::new_v4(), card.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn select_deselect_and_remove() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let a = db.create_card(&new_card(&owner, "A")).unwrap();
        let b = db.create_card(&new_card(&owner, "B")).unwrap();
        let blk = db.create_block(owner.id, &block("Day 1")).unwrap();
        db.add_card_to_block(blk.id, a.id).unwrap();
        db.add_card_to_block(blk.id, b.id).unwrap();

        let selected = db.select_card(blk.id, b.id).unwrap();
        assert_eq!(selected.selected_card.map(|c| c.id), Some(b.id));

        let cleared = db.deselect_card(blk.id).unwrap();
        assert!(cleared.selected_card.is_none());

        let removed = db.remove_card_from_block(blk.id, a.id).unwrap();
        let ids: Vec<Uuid> = removed.cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id]);

        // Removing again changes nothing.
        let again = db.remove_card_from_block(blk.id, a.id).unwrap();
        assert_eq!(again.cards.len(), 1);
    }

    #[test]
    fn deleting_a_card_detaches_it() {
        let mut db = Database::open_in_memory().unwrap();
        let owner = ambassador(&db);
        let a = db.create_card(&new_card(&owner, "A")).unwrap();
        let blk = db.create_block(owner.id, &block("Day 1")).unwrap();
        db.add_card_to_block(blk.id, a.id).unwrap();
        db.select_card(blk.id, a.id).unwrap();

        db.delete_card(a.id).unwrap();

        let after = db.get_block(blk.id).unwrap();
        assert!(after.cards.is_empty());
        assert!(after.selected_card.is_none());
    }

    #[test]
    fn create_attaches_to_owner_itinerary() {
        let mut db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("trip@x.com", false)).unwrap();

        // Without an itinerary the block stands alone.
        let loose = db.create_block(user.id, &block("Loose")).unwrap();
        assert!(db.list_blocks_for_user(user.id).unwrap().is_empty());

        let mut rng = StdRng::seed_from_u64(1);
        db.create_itinerary(
            user.id,
            &NewItinerary {
                partners: "2 kids".to_string(),
                date_start: None,
                date_end: None,
                destination: None,
            },
            &mut rng,
        )
        .unwrap();

        let first = db.create_block(user.id, &block("Day 1")).unwrap();
        let second = db.create_block(user.id, &block("Day 2")).unwrap();

        let ids: Vec<Uuid> = db
            .list_blocks_for_user(user.id)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(!ids.contains(&loose.id));

        assert!(db.delete_block(first.id).unwrap());
        assert!(!db.delete_block(first.id).unwrap());
        assert_eq!(db.list_blocks_for_user(user.id).unwrap().len(), 1);
    }
}
