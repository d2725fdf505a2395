//! Fixtures shared by the store's unit tests.

use waypoint_shared::GeoPoint;

use crate::database::Database;
use crate::models::{Card, NewCard, NewUser, User};

pub(crate) fn new_user(email: &str, ambassador: bool) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: email.split('@').next().unwrap_or("user").to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        is_ambassador: ambassador,
    }
}

pub(crate) fn ambassador(db: &Database) -> User {
    db.create_user(&new_user("amb@waypoint.test", true)).unwrap()
}

pub(crate) fn new_card(owner: &User, name: &str) -> NewCard {
    NewCard {
        name: name.to_string(),
        description: "desc".to_string(),
        address: "1 Main St".to_string(),
        hours: "9-5".to_string(),
        phone: None,
        location: None,
        ambassador: owner.id,
        tags: Vec::new(),
        image: None,
    }
}

pub(crate) fn card_at(db: &mut Database, owner: &User, name: &str, lat: f64, lng: f64) -> Card {
    let mut new = new_card(owner, name);
    new.location = Some(GeoPoint::new(lat, lng).unwrap());
    db.create_card(&new).unwrap()
}
