use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub rating: i64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub stand_name: Option<String>,
    pub avatar_link: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
}

impl Profile {
    /// A user runs a stand once they have given it a name.
    pub fn has_stand(&self) -> bool {
        self.stand_name.as_deref().is_some_and(|name| !name.trim().is_empty())
    }
}

/// Owner details attached to each crop on a stand page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandOwner {
    pub id: Uuid,
    pub stand_name: Option<String>,
    pub avatar_link: Option<String>,
}

/// A listing. `owner_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub description: String,
    pub selling: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: Uuid,
    pub link: String,
    pub crop_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A message about a crop. Created once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub crop_id: Uuid,
    pub from: Uuid,
    pub to: Uuid,
    pub seller_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
