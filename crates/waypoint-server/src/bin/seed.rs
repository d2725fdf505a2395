//! Wipe the configured database and fill it with demo data.
//!
//! Uses the same environment as the server (`DATABASE_PATH`, `.env`). All
//! demo accounts share the password `password123`.

use anyhow::Context;
use tracing::info;
use waypoint_server::{init_tracing, open_database, ServerConfig};
use waypoint_shared::password::hash_password;
use waypoint_shared::{parse_date, GeoPoint};
use waypoint_store::{NewBlock, NewCard, NewDestination, NewItinerary, NewUser};

const DEMO_PASSWORD: &str = "password123";

struct SeedCard {
    name: &'static str,
    description: &'static str,
    address: &'static str,
    hours: &'static str,
    latitude: f64,
    longitude: f64,
    tags: &'static [&'static str],
}

const CARDS: &[SeedCard] = &[
    SeedCard {
        name: "El Huequito",
        description: "Tacos al pastor since 1959",
        address: "Bolivar 58, Centro",
        hours: "9am-11pm",
        latitude: 19.4331,
        longitude: -99.1396,
        tags: &["tacos", "street food"],
    },
    SeedCard {
        name: "Museo Frida Kahlo",
        description: "The Blue House in Coyoacan",
        address: "Londres 247, Coyoacan",
        hours: "10am-6pm",
        latitude: 19.3551,
        longitude: -99.1625,
        tags: &["museum", "art"],
    },
    SeedCard {
        name: "Mercado de Coyoacan",
        description: "Tostadas and fresh juice in a busy market",
        address: "Ignacio Allende, Coyoacan",
        hours: "8am-7pm",
        latitude: 19.3502,
        longitude: -99.1617,
        tags: &["market", "food"],
    },
    SeedCard {
        name: "Bosque de Chapultepec",
        description: "A huge park with a castle on the hill",
        address: "Chapultepec, Miguel Hidalgo",
        hours: "5am-8pm",
        latitude: 19.4204,
        longitude: -99.1819,
        tags: &["park", "kids"],
    },
];

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    let mut db = open_database(&config).context("Failed to open database")?;
    db.wipe().context("Failed to wipe database")?;

    let password_hash = hash_password(DEMO_PASSWORD)?;
    let user = |email: &str, name: &str, is_ambassador: bool| NewUser {
        email: email.to_string(),
        name: name.to_string(),
        password_hash: password_hash.clone(),
        is_ambassador,
    };

    let ana = db.create_user(&user("ana@waypoint.dev", "Ana", true))?;
    db.create_user(&user("luis@waypoint.dev", "Luis", true))?;
    let traveler = db.create_user(&user("sam@waypoint.dev", "Sam", false))?;

    let mut cards = Vec::with_capacity(CARDS.len());
    for seed in CARDS {
        let card = db.create_card(&NewCard {
            name: seed.name.to_string(),
            description: seed.description.to_string(),
            address: seed.address.to_string(),
            hours: seed.hours.to_string(),
            phone: None,
            location: Some(GeoPoint::new(seed.latitude, seed.longitude)?),
            ambassador: ana.id,
            tags: seed.tags.iter().map(|t| t.to_string()).collect(),
            image: None,
        })?;
        cards.push(card);
    }
    db.add_tip(cards[0].id, "Order the gringa")?;
    db.rate_card(cards[1].id, 5.0)?;

    let itinerary = db.create_itinerary(
        traveler.id,
        &NewItinerary {
            partners: "2 kids".to_string(),
            date_start: Some(parse_date("2018-06-01", "dateStart")?),
            date_end: Some(parse_date("2018-06-07", "dateEnd")?),
            destination: Some(NewDestination {
                location_name: "Mexico City".to_string(),
                tags: vec!["food".to_string(), "museums".to_string()],
                location: Some(GeoPoint::new(19.4326, -99.1332)?),
                distance: 0.0,
            }),
        },
        &mut rand::thread_rng(),
    )?;

    let day_one = db.create_block(
        traveler.id,
        &NewBlock {
            title: "Lunch, day 1".to_string(),
            date: Some(parse_date("2018-06-01", "date")?),
        },
    )?;
    db.add_card_to_block(day_one.id, cards[0].id)?;
    db.add_card_to_block(day_one.id, cards[2].id)?;
    db.select_card(day_one.id, cards[0].id)?;

    let day_two = db.create_block(
        traveler.id,
        &NewBlock {
            title: "Afternoon, day 2".to_string(),
            date: Some(parse_date("2018-06-02", "date")?),
        },
    )?;
    db.add_card_to_block(day_two.id, cards[1].id)?;
    db.add_card_to_block(day_two.id, cards[3].id)?;
    db.add_card_to_itinerary(itinerary.id, cards[3].id)?;

    info!(
        users = 3,
        cards = cards.len(),
        itinerary = %itinerary.id,
        "Database wiped and re-initialized"
    );
    Ok(())
}
