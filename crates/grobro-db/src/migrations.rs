use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            rating      INTEGER NOT NULL DEFAULT 0,
            city        TEXT,
            state       TEXT,
            stand_name  TEXT,
            avatar_link TEXT,
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL,
            bio         TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS crops (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            description TEXT NOT NULL,
            selling     INTEGER NOT NULL DEFAULT 1,
            status      TEXT NOT NULL DEFAULT 'available',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_crops_owner
            ON crops(owner_id, selling);

        CREATE TABLE IF NOT EXISTS photos (
            id          TEXT PRIMARY KEY,
            link        TEXT NOT NULL,
            crop_id     TEXT NOT NULL REFERENCES crops(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_photos_crop
            ON photos(crop_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            crop_id     TEXT NOT NULL REFERENCES crops(id),
            from_id     TEXT NOT NULL REFERENCES users(id),
            to_id       TEXT NOT NULL REFERENCES users(id),
            seller_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Prior-contact lookups filter on all three columns
        CREATE INDEX IF NOT EXISTS idx_messages_contact
            ON messages(crop_id, from_id, to_id);

        CREATE INDEX IF NOT EXISTS idx_messages_to
            ON messages(to_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_from
            ON messages(from_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
