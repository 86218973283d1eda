//! Row to API model conversion.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use grobro_db::models::{CropRow, MessageRow, PhotoRow, UserRow};
use grobro_types::models::{Crop, Message, Photo, Profile, StandOwner};

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn profile(row: UserRow) -> Result<Profile> {
    Ok(Profile {
        id: parse_id(&row.id)?,
        username: row.username,
        email: row.email,
        rating: row.rating,
        city: row.city,
        state: row.state,
        stand_name: row.stand_name,
        avatar_link: row.avatar_link,
        first_name: row.first_name,
        last_name: row.last_name,
        bio: row.bio,
    })
}

pub fn stand_owner(row: &UserRow) -> Result<StandOwner> {
    Ok(StandOwner {
        id: parse_id(&row.id)?,
        stand_name: row.stand_name.clone(),
        avatar_link: row.avatar_link.clone(),
    })
}

pub fn crop(row: CropRow) -> Result<Crop> {
    Ok(Crop {
        id: parse_id(&row.id)?,
        owner_id: parse_id(&row.owner_id)?,
        description: row.description,
        selling: row.selling,
        status: row.status,
        created_at: parse_timestamp(&row.created_at),
    })
}

pub fn photo(row: PhotoRow) -> Result<Photo> {
    Ok(Photo {
        id: parse_id(&row.id)?,
        link: row.link,
        crop_id: parse_id(&row.crop_id)?,
        user_id: parse_id(&row.user_id)?,
        created_at: parse_timestamp(&row.created_at),
    })
}

pub fn message(row: MessageRow) -> Result<Message> {
    Ok(Message {
        id: parse_id(&row.id)?,
        crop_id: parse_id(&row.crop_id)?,
        from: parse_id(&row.from_id)?,
        to: parse_id(&row.to_id)?,
        seller_id: parse_id(&row.seller_id)?,
        content: row.content,
        created_at: parse_timestamp(&row.created_at),
    })
}

pub fn messages(rows: Vec<MessageRow>) -> Result<Vec<Message>> {
    rows.into_iter().map(message).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn sqlite_timestamps_parse_as_utc() {
        let ts = parse_timestamp("2018-09-08 16:28:45");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2018, 9, 8));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (16, 28, 45));
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday-ish"), DateTime::<Utc>::default());
    }

    #[test]
    fn corrupt_id_is_an_error() {
        assert!(parse_id("not-a-uuid").is_err());
    }
}
