/// Database row types. These map directly to SQLite rows and stay
/// independent of the grobro-types API models.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub rating: i64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub stand_name: Option<String>,
    pub avatar_link: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub created_at: String,
}

/// Columns required to create a user.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
}

/// A single profile field group written by the settings endpoint.
pub enum ProfilePatch<'a> {
    Password { password_hash: &'a str },
    Location { city: &'a str, state: &'a str },
    StandName { stand_name: &'a str },
    ProfilePhoto { avatar_link: &'a str, bio: Option<&'a str> },
}

pub struct CropRow {
    pub id: String,
    pub owner_id: String,
    pub description: String,
    pub selling: bool,
    pub status: String,
    pub created_at: String,
}

pub struct PhotoRow {
    pub id: String,
    pub link: String,
    pub crop_id: String,
    pub user_id: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub crop_id: String,
    pub from_id: String,
    pub to_id: String,
    pub seller_id: String,
    pub content: String,
    pub created_at: String,
}
