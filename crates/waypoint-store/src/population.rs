//! Nested reads: expanding id references into full documents.
//!
//! [`Database::full_itinerary`] is the single population routine for the
//! itinerary graph: ambassador, destination, blocks and each block's cards
//! and selection. Card lookups are batched per block.

use rusqlite::Connection;
use uuid::Uuid;

use crate::blocks::get_block;
use crate::cards::cards_by_ids;
use crate::database::Database;
use crate::destinations::get_destination;
use crate::error::{Result, StoreError};
use crate::itineraries::get_itinerary;
use crate::models::{Block, FullItinerary, PopulatedBlock};
use crate::users::{get_user, user_itinerary};

impl Database {
    /// Expand an itinerary with its ambassador, destination and populated
    /// blocks. Card references stay as ids.
    pub fn full_itinerary(&self, id: Uuid) -> Result<FullItinerary> {
        full_itinerary(self.conn(), id)
    }

    /// The user's current itinerary, expanded. [`StoreError::NotFound`] when
    /// the user has none.
    pub fn full_itinerary_for_user(&self, user: Uuid) -> Result<FullItinerary> {
        let itinerary = user_itinerary(self.conn(), user)?.ok_or(StoreError::NotFound)?;
        full_itinerary(self.conn(), itinerary)
    }
}

pub(crate) fn full_itinerary(conn: &Connection, id: Uuid) -> Result<FullItinerary> {
    let itinerary = get_itinerary(conn, id)?;

    let ambassador = match itinerary.ambassador {
        Some(user) => optional(get_user(conn, user))?,
        None => None,
    };
    let destination = match itinerary.destination {
        Some(destination) => optional(get_destination(conn, destination))?,
        None => None,
    };

    let mut blocks = Vec::with_capacity(itinerary.blocks.len());
    for block in &itinerary.blocks {
        if let Some(block) = optional(get_block(conn, *block))? {
            blocks.push(populate_block(conn, block)?);
        }
    }

    Ok(FullItinerary {
        id: itinerary.id,
        partners: itinerary.partners,
        ambassador,
        destination,
        blocks,
        cards: itinerary.cards,
        date_start: itinerary.date_start,
        date_end: itinerary.date_end,
        created_at: itinerary.created_at,
    })
}

/// Replace a block's card ids with the cards themselves, keeping order.
pub(crate) fn populate_block(conn: &Connection, block: Block) -> Result<PopulatedBlock> {
    let mut ids = block.cards.clone();
    if let Some(selected) = block.selected_card {
        ids.push(selected);
    }
    let mut found = cards_by_ids(conn, &ids)?;

    let selected_card = block.selected_card.and_then(|id| found.get(&id).cloned());
    let cards = block
        .cards
        .iter()
        .filter_map(|id| found.remove(id))
        .collect();

    Ok(PopulatedBlock {
        id: block.id,
        title: block.title,
        date: block.date,
        cards,
        selected_card,
        created_at: block.created_at,
    })
}

/// A dangling reference reads as absent rather than failing the whole view.
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBlock, NewDestination, NewItinerary};
    use crate::test_support::{ambassador, new_card, new_user};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn full_itinerary_expands_three_levels() {
        let mut db = Database::open_in_memory().unwrap();
        let amb = ambassador(&db);
        let a = db.create_card(&new_card(&amb, "A")).unwrap();
        let b = db.create_card(&new_card(&amb, "B")).unwrap();
        let user = db.create_user(&new_user("trip@x.com", false)).unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        let itinerary = db
            .create_itinerary(
                user.id,
                &NewItinerary {
                    partners: "2 kids".to_string(),
                    date_start: None,
                    date_end: None,
                    destination: Some(NewDestination {
                        location_name: "Mexico City".to_string(),
                        tags: vec!["food".to_string()],
                        location: None,
                        distance: 0.0,
                    }),
                },
                &mut rng,
            )
            .unwrap();

        let block = db
            .create_block(
                user.id,
                &NewBlock {
                    title: "Day 1".to_string(),
                    date: None,
                },
            )
            .unwrap();
        db.add_card_to_block(block.id, a.id).unwrap();
        db.add_card_to_block(block.id, b.id).unwrap();
        db.select_card(block.id, b.id).unwrap();
        db.add_card_to_itinerary(itinerary.id, a.id).unwrap();

        let full = db.full_itinerary_for_user(user.id).unwrap();
        assert_eq!(full.id, itinerary.id);
        assert_eq!(full.ambassador.as_ref().map(|u| u.id), Some(amb.id));
        assert_eq!(
            full.destination.as_ref().map(|d| d.location_name.as_str()),
            Some("Mexico City")
        );
        assert_eq!(full.blocks.len(), 1);
        let names: Vec<&str> = full.blocks[0].cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(full.blocks[0].selected_card.as_ref().map(|c| c.id), Some(b.id));
        assert_eq!(full.cards, vec![a.id]);

        assert_eq!(db.full_itinerary(itinerary.id).unwrap(), full);
    }

    #[test]
    fn serialized_view_hides_ambassador_password() {
        let mut db = Database::open_in_memory().unwrap();
        ambassador(&db);
        let user = db.create_user(&new_user("trip@x.com", false)).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        db.create_itinerary(
            user.id,
            &NewItinerary {
                partners: "friends".to_string(),
                date_start: None,
                date_end: None,
                destination: None,
            },
            &mut rng,
        )
        .unwrap();

        let full = db.full_itinerary_for_user(user.id).unwrap();
        let json = serde_json::to_value(&full).unwrap();
        assert!(json["ambassador"].get("passwordHash").is_none());
        assert_eq!(json["destination"], serde_json::Value::Null);
        assert_eq!(json["blocks"], serde_json::json!([]));
    }

    #[test]
    fn user_without_itinerary_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("trip@x.com", false)).unwrap();
        assert!(matches!(
            db.full_itinerary_for_user(user.id),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.full_itinerary(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }
}
