//! Destination records and the proximity query over them.

use rusqlite::{params, Connection};
use uuid::Uuid;
use waypoint_shared::geo::haversine_km;
use waypoint_shared::{BoundingBox, GeoPoint};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Destination, NearbyDestination, NewDestination};
use crate::row;

const DESTINATION_COLUMNS: &str =
    "id, location_name, tags, latitude, longitude, distance, created_at";

impl Database {
    /// Insert a destination on its own. Itinerary creation inserts its
    /// destination inside the itinerary transaction instead.
    pub fn create_destination(&self, new: &NewDestination) -> Result<Destination> {
        let id = insert_destination(self.conn(), new)?;
        self.get_destination(id)
    }

    pub fn get_destination(&self, id: Uuid) -> Result<Destination> {
        get_destination(self.conn(), id)
    }

    /// Destinations within `radius_km` of `center`, nearest first.
    pub fn destinations_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<NearbyDestination>> {
        let bbox = BoundingBox::around(center, radius_km);

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DESTINATION_COLUMNS} FROM destinations
             WHERE latitude BETWEEN ?1 AND ?2
               AND longitude BETWEEN ?3 AND ?4"
        ))?;
        let rows = stmt.query_map(
            params![bbox.min_lat, bbox.max_lat, bbox.min_lng, bbox.max_lng],
            row_to_destination,
        )?;

        let mut nearby = Vec::new();
        for row in rows {
            let destination = row?;
            let Some(location) = destination.location else {
                continue;
            };
            let distance_km = haversine_km(center, location);
            if distance_km <= radius_km {
                nearby.push(NearbyDestination {
                    destination,
                    distance_km,
                });
            }
        }
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }
}

pub(crate) fn insert_destination(conn: &Connection, new: &NewDestination) -> Result<Uuid> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO destinations
             (id, location_name, tags, latitude, longitude, distance, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id.to_string(),
            new.location_name,
            serde_json::to_string(&new.tags)?,
            new.location.map(|p| p.latitude),
            new.location.map(|p| p.longitude),
            new.distance,
            row::format_ts(&row::now()),
        ],
    )?;
    Ok(id)
}

pub(crate) fn get_destination(conn: &Connection, id: Uuid) -> Result<Destination> {
    conn.query_row(
        &format!("SELECT {DESTINATION_COLUMNS} FROM destinations WHERE id = ?1"),
        params![id.to_string()],
        row_to_destination,
    )
    .map_err(StoreError::from_query)
}

fn row_to_destination(row: &rusqlite::Row<'_>) -> rusqlite::Result<Destination> {
    Ok(Destination {
        id: row::uuid(row, 0)?,
        location_name: row.get(1)?,
        tags: row::string_list(row, 2)?,
        location: row::geo_point(row, 3)?,
        distance: row.get(5)?,
        created_at: row::timestamp(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destination(name: &str, lat: f64, lng: f64) -> NewDestination {
        NewDestination {
            location_name: name.to_string(),
            tags: vec!["food".to_string()],
            location: Some(GeoPoint::new(lat, lng).unwrap()),
            distance: 0.0,
        }
    }

    #[test]
    fn create_and_get() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_destination(&destination("Oaxaca", 17.0732, -96.7266))
            .unwrap();

        let fetched = db.get_destination(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.location_name, "Oaxaca");
        assert_eq!(fetched.tags, vec!["food"]);

        assert!(matches!(
            db.get_destination(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn near_orders_by_distance() {
        let db = Database::open_in_memory().unwrap();
        let center = GeoPoint::new(19.4326, -99.1332).unwrap();

        let coyoacan = db
            .create_destination(&destination("Coyoacan", 19.3467, -99.1617))
            .unwrap();
        let roma = db
            .create_destination(&destination("Roma Norte", 19.4194, -99.1617))
            .unwrap();
        db.create_destination(&destination("Cancun", 21.1619, -86.8515))
            .unwrap();
        db.create_destination(&NewDestination {
            location_name: "Unplaced".to_string(),
            tags: Vec::new(),
            location: None,
            distance: 0.0,
        })
        .unwrap();

        let ids: Vec<Uuid> = db
            .destinations_near(center, 25.0)
            .unwrap()
            .iter()
            .map(|d| d.destination.id)
            .collect();
        assert_eq!(ids, vec![roma.id, coyoacan.id]);
    }
}
