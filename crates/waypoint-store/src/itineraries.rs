//! Itinerary creation and the flat itinerary reads.
//!
//! Creating an itinerary touches three tables (destination, itinerary and the
//! owner's user row) and runs as one transaction.

use rand::Rng;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::blocks::itinerary_block_ids;
use crate::cards::card_exists;
use crate::database::Database;
use crate::destinations::insert_destination;
use crate::error::{Result, StoreError};
use crate::models::{Itinerary, NewItinerary};
use crate::row;
use crate::users::{pick_random_ambassador, set_user_itinerary};

const ITINERARY_COLUMNS: &str =
    "id, partners, ambassador_id, destination_id, date_start, date_end, created_at";

impl Database {
    /// Create an itinerary for `owner` and make it the owner's current one.
    ///
    /// An ambassador is drawn uniformly at random from all ambassador users;
    /// with none registered the itinerary is created without one.
    pub fn create_itinerary<R: Rng + ?Sized>(
        &mut self,
        owner: Uuid,
        new: &NewItinerary,
        rng: &mut R,
    ) -> Result<Itinerary> {
        let id = Uuid::new_v4();

        let tx = self.conn_mut().transaction()?;

        let ambassador = pick_random_ambassador(&tx, rng)?;
        if ambassador.is_none() {
            tracing::warn!(itinerary = %id, "no ambassadors registered; itinerary left unassigned");
        }

        let destination = new
            .destination
            .as_ref()
            .map(|d| insert_destination(&tx, d))
            .transpose()?;

        tx.execute(
            "INSERT INTO itineraries (id, partners, ambassador_id, destination_id,
                                      date_start, date_end, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                new.partners,
                ambassador.map(|a| a.to_string()),
                destination.map(|d| d.to_string()),
                new.date_start.as_ref().map(row::format_ts),
                new.date_end.as_ref().map(row::format_ts),
                row::format_ts(&row::now()),
            ],
        )?;

        set_user_itinerary(&tx, owner, id)?;
        tx.commit()?;

        tracing::info!(
            itinerary = %id,
            user = %owner,
            ambassador = ?ambassador,
            "itinerary created"
        );
        self.get_itinerary(id)
    }

    /// Fetch an itinerary with its block and card references as ids.
    pub fn get_itinerary(&self, id: Uuid) -> Result<Itinerary> {
        get_itinerary(self.conn(), id)
    }

    /// Itineraries assigned to an ambassador, newest first.
    pub fn list_itineraries_for_ambassador(&self, ambassador: Uuid) -> Result<Vec<Itinerary>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ITINERARY_COLUMNS} FROM itineraries
             WHERE ambassador_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![ambassador.to_string()], row_to_itinerary)?;

        let mut itineraries = Vec::new();
        for row in rows {
            let mut itinerary = row?;
            load_references(self.conn(), &mut itinerary)?;
            itineraries.push(itinerary);
        }
        Ok(itineraries)
    }

    /// Append a card to the itinerary's card list. The same card may be
    /// added more than once.
    pub fn add_card_to_itinerary(&self, itinerary: Uuid, card: Uuid) -> Result<Itinerary> {
        get_itinerary(self.conn(), itinerary)?;
        if !card_exists(self.conn(), card)? {
            return Err(StoreError::NotFound);
        }

        self.conn().execute(
            "INSERT INTO itinerary_cards (itinerary_id, card_id, position)
             SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
             FROM itinerary_cards WHERE itinerary_id = ?1",
            params![itinerary.to_string(), card.to_string()],
        )?;
        self.get_itinerary(itinerary)
    }

    /// Whether `user` may read the itinerary: its assigned ambassador or
    /// the user whose current itinerary it is.
    pub fn itinerary_visible_to(&self, itinerary: Uuid, user: Uuid) -> Result<bool> {
        let visible: i64 = self.conn().query_row(
            "SELECT EXISTS (SELECT 1 FROM itineraries WHERE id = ?1 AND ambassador_id = ?2)
                 OR EXISTS (SELECT 1 FROM users WHERE id = ?2 AND itinerary_id = ?1)",
            params![itinerary.to_string(), user.to_string()],
            |row| row.get(0),
        )?;
        Ok(visible != 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn get_itinerary(conn: &Connection, id: Uuid) -> Result<Itinerary> {
    let mut itinerary = conn
        .query_row(
            &format!("SELECT {ITINERARY_COLUMNS} FROM itineraries WHERE id = ?1"),
            params![id.to_string()],
            row_to_itinerary,
        )
        .map_err(StoreError::from_query)?;
    load_references(conn, &mut itinerary)?;
    Ok(itinerary)
}

/// Card ids pinned on an itinerary, in insertion order.
pub(crate) fn itinerary_card_ids(conn: &Connection, itinerary: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT card_id FROM itinerary_cards WHERE itinerary_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![itinerary.to_string()], |row| row::uuid(row, 0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

fn load_references(conn: &Connection, itinerary: &mut Itinerary) -> Result<()> {
    itinerary.blocks = itinerary_block_ids(conn, itinerary.id)?;
    itinerary.cards = itinerary_card_ids(conn, itinerary.id)?;
    Ok(())
}

/// Map a `rusqlite::Row` to an [`Itinerary`] without its reference lists.
fn row_to_itinerary(row: &rusqlite::Row<'_>) -> rusqlite::Result<Itinerary> {
    Ok(Itinerary {
        id: row::uuid(row, 0)?,
        partners: row.get(1)?,
        ambassador: row::opt_uuid(row, 2)?,
        destination: row::opt_uuid(row, 3)?,
        blocks: Vec::new(),
        cards: Vec::new(),
        date_start: row::opt_timestamp(row, 4)?,
        date_end: row::opt_timestamp(row, 5)?,
        created_at: row::timestamp(row, 6)?,
    })
}
