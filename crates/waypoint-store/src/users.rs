//! CRUD operations for [`User`] records and the ambassador guard.

use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewUser, User};
use crate::row;

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_ambassador, itinerary_id, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user. Fails with [`StoreError::DuplicateEmail`] when the
    /// email is already registered.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: new.email.clone(),
            name: new.name.clone(),
            password_hash: new.password_hash.clone(),
            is_ambassador: new.is_ambassador,
            itinerary: None,
            created_at: row::now(),
        };

        self.conn()
            .execute(
                "INSERT INTO users (id, email, name, password_hash, is_ambassador, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.name,
                    user.password_hash,
                    user.is_ambassador,
                    row::format_ts(&user.created_at),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == ErrorCode::ConstraintViolation =>
                {
                    StoreError::DuplicateEmail
                }
                other => StoreError::Sqlite(other),
            })?;

        tracing::info!(user = %user.id, ambassador = user.is_ambassador, "user registered");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by id.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        get_user(self.conn(), id)
    }

    /// Look a user up by email (exact match).
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Ids of every user flagged as an ambassador.
    pub fn list_ambassador_ids(&self) -> Result<Vec<Uuid>> {
        ambassador_ids(self.conn())
    }

    // ------------------------------------------------------------------
    // Guard
    // ------------------------------------------------------------------

    /// Check that `id` names an existing user with the ambassador flag.
    pub fn validate_ambassador(&self, id: Uuid) -> Result<()> {
        let flag: Option<bool> = self
            .conn()
            .query_row(
                "SELECT is_ambassador FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match flag {
            None => Err(StoreError::UnknownUser),
            Some(false) => Err(StoreError::NotAmbassador),
            Some(true) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers (usable inside transactions)
// ---------------------------------------------------------------------------

pub(crate) fn get_user(conn: &Connection, id: Uuid) -> Result<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id.to_string()],
        row_to_user,
    )
    .map_err(StoreError::from_query)
}

pub(crate) fn ambassador_ids(conn: &Connection) -> Result<Vec<Uuid>> {
    let mut stmt =
        conn.prepare("SELECT id FROM users WHERE is_ambassador = 1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map([], |row| row::uuid(row, 0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Pick one ambassador uniformly at random from a full scan of the
/// ambassador users. `None` when there are no ambassadors.
pub(crate) fn pick_random_ambassador<R: Rng + ?Sized>(
    conn: &Connection,
    rng: &mut R,
) -> Result<Option<Uuid>> {
    let ids = ambassador_ids(conn)?;
    Ok(ids.choose(rng).copied())
}

/// The itinerary a user points at. `None` when the user has none or does
/// not exist.
pub(crate) fn user_itinerary(conn: &Connection, user: Uuid) -> Result<Option<Uuid>> {
    let itinerary = conn
        .query_row(
            "SELECT itinerary_id FROM users WHERE id = ?1",
            params![user.to_string()],
            |row| row::opt_uuid(row, 0),
        )
        .optional()?;
    Ok(itinerary.flatten())
}

/// Point a user at an itinerary, replacing any previous reference.
pub(crate) fn set_user_itinerary(conn: &Connection, user: Uuid, itinerary: Uuid) -> Result<()> {
    let affected = conn.execute(
        "UPDATE users SET itinerary_id = ?1 WHERE id = ?2",
        params![itinerary.to_string(), user.to_string()],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row::uuid(row, 0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        is_ambassador: row.get(4)?,
        itinerary: row::opt_uuid(row, 5)?,
        created_at: row::timestamp(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_user;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn create_and_lookup() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("bob@bob.com", false)).unwrap();

        let by_id = db.get_user(user.id).unwrap();
        assert_eq!(by_id, user);

        let by_email = db.find_user_by_email("bob@bob.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(db.find_user_by_email("nobody@bob.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("bob@bob.com", false)).unwrap();
        let err = db.create_user(&new_user("bob@bob.com", true)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[test]
    fn serialized_user_has_no_password() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("bob@bob.com", false)).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("salt$hash"));
        assert_eq!(json["id"], user.id.to_string());
        assert_eq!(json["isAmbassador"], false);
    }

    #[test]
    fn ambassador_guard() {
        let db = Database::open_in_memory().unwrap();
        let plain = db.create_user(&new_user("plain@x.com", false)).unwrap();
        let amb = db.create_user(&new_user("amb@x.com", true)).unwrap();

        assert!(db.validate_ambassador(amb.id).is_ok());
        assert!(matches!(
            db.validate_ambassador(plain.id),
            Err(StoreError::NotAmbassador)
        ));
        assert!(matches!(
            db.validate_ambassador(Uuid::new_v4()),
            Err(StoreError::UnknownUser)
        ));
    }

    #[test]
    fn random_ambassador_is_an_ambassador() {
        let db = Database::open_in_memory().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_random_ambassador(db.conn(), &mut rng).unwrap(), None);

        db.create_user(&new_user("plain@x.com", false)).unwrap();
        let a = db.create_user(&new_user("a@x.com", true)).unwrap();
        let b = db.create_user(&new_user("b@x.com", true)).unwrap();

        for _ in 0..20 {
            let picked = pick_random_ambassador(db.conn(), &mut rng).unwrap().unwrap();
            assert!(picked == a.id || picked == b.id);
        }
    }
}
