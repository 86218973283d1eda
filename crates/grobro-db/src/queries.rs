use crate::models::{CropRow, MessageRow, NewUser, PhotoRow, ProfilePatch, UserRow};
use crate::Database;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, username, email, password, rating, city, state, stand_name, \
                            avatar_link, first_name, last_name, bio, created_at";

const CROP_COLUMNS: &str = "id, owner_id, description, selling, status, created_at";

const MESSAGE_COLUMNS: &str = "id, crop_id, from_id, to_id, seller_id, content, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, first_name, last_name, city, state)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.city,
                    user.state,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn email_or_username_taken(&self, username: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let taken = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
                [username, email],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    /// Write one field group. Returns false when no user has this id.
    pub fn update_profile(&self, id: &str, patch: &ProfilePatch<'_>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = match patch {
                ProfilePatch::Password { password_hash } => conn.execute(
                    "UPDATE users SET password = ?2 WHERE id = ?1",
                    rusqlite::params![id, password_hash],
                )?,
                ProfilePatch::Location { city, state } => conn.execute(
                    "UPDATE users SET city = ?2, state = ?3 WHERE id = ?1",
                    rusqlite::params![id, city, state],
                )?,
                ProfilePatch::StandName { stand_name } => conn.execute(
                    "UPDATE users SET stand_name = ?2 WHERE id = ?1",
                    rusqlite::params![id, stand_name],
                )?,
                // A photo submission without a bio leaves the bio alone
                ProfilePatch::ProfilePhoto { avatar_link, bio } => conn.execute(
                    "UPDATE users SET avatar_link = ?2, bio = COALESCE(?3, bio) WHERE id = ?1",
                    rusqlite::params![id, avatar_link, bio],
                )?,
            };
            Ok(changed > 0)
        })
    }

    // -- Crops --

    pub fn insert_crop(
        &self,
        id: &str,
        owner_id: &str,
        description: &str,
        selling: bool,
        status: &str,
    ) -> Result<CropRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO crops (id, owner_id, description, selling, status) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, owner_id, description, selling, status],
            )?;
            query_crop(conn, id)?.ok_or_else(|| anyhow!("Crop vanished after insert: {}", id))
        })
    }

    pub fn get_crop(&self, id: &str) -> Result<Option<CropRow>> {
        self.with_conn(|conn| query_crop(conn, id))
    }

    /// Crops the owner is currently selling, oldest first.
    pub fn get_selling_crops(&self, owner_id: &str) -> Result<Vec<CropRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CROP_COLUMNS} FROM crops WHERE owner_id = ?1 AND selling = 1
                 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], crop_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Photos --

    pub fn insert_photo(&self, id: &str, link: &str, crop_id: &str, user_id: &str) -> Result<PhotoRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO photos (id, link, crop_id, user_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, link, crop_id, user_id],
            )?;
            conn.query_row(
                "SELECT id, link, crop_id, user_id, created_at FROM photos WHERE id = ?1",
                [id],
                photo_from_row,
            )
            .map_err(Into::into)
        })
    }

    pub fn get_photos_for_crop(&self, crop_id: &str) -> Result<Vec<PhotoRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, link, crop_id, user_id, created_at FROM photos
                 WHERE crop_id = ?1 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([crop_id], photo_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        crop_id: &str,
        from_id: &str,
        to_id: &str,
        seller_id: &str,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, crop_id, from_id, to_id, seller_id, content)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, crop_id, from_id, to_id, seller_id, content],
            )?;
            let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
            conn.query_row(&sql, [id], message_from_row).map_err(Into::into)
        })
    }

    /// True when `from_id` has already written to `to_id` about this crop.
    pub fn prior_contact_exists(&self, crop_id: &str, from_id: &str, to_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE crop_id = ?1 AND from_id = ?2 AND to_id = ?3)",
                [crop_id, from_id, to_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Every message the user sent or received.
    pub fn get_messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE to_id = ?1 OR from_id = ?1
                 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_messages_for_crop_and_user(&self, crop_id: &str, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE crop_id = ?1 AND (to_id = ?2 OR from_id = ?2)
                 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([crop_id, user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt.query_row([value], user_from_row).optional()?;

    Ok(row)
}

fn query_crop(conn: &Connection, id: &str) -> Result<Option<CropRow>> {
    let sql = format!("SELECT {CROP_COLUMNS} FROM crops WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt.query_row([id], crop_from_row).optional()?;

    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        rating: row.get(4)?,
        city: row.get(5)?,
        state: row.get(6)?,
        stand_name: row.get(7)?,
        avatar_link: row.get(8)?,
        first_name: row.get(9)?,
        last_name: row.get(10)?,
        bio: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn crop_from_row(row: &Row<'_>) -> rusqlite::Result<CropRow> {
    Ok(CropRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        description: row.get(2)?,
        selling: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<PhotoRow> {
    Ok(PhotoRow {
        id: row.get(0)?,
        link: row.get(1)?,
        crop_id: row.get(2)?,
        user_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        crop_id: row.get(1)?,
        from_id: row.get(2)?,
        to_id: row.get(3)?,
        seller_id: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
