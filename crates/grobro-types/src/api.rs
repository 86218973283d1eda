use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Crop, Photo, Profile, StandOwner};

// -- JWT Claims --

/// JWT claims issued at login and checked by the API middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Crops --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCropRequest {
    pub description: String,
    #[serde(default = "default_selling")]
    pub selling: bool,
    #[serde(default)]
    pub status: Option<String>,
}

fn default_selling() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CropResponse {
    #[serde(flatten)]
    pub crop: Crop,
    pub photos: Vec<Photo>,
}

/// One entry on a user's stand page.
#[derive(Debug, Serialize, Deserialize)]
pub struct StandCrop {
    #[serde(flatten)]
    pub crop: Crop,
    pub user: StandOwner,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub link: String,
}

// -- Messages --

/// Body of `POST /users/{to_id}/messages/{crop_id}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub from: Uuid,
    pub seller_id: Uuid,
    pub content: String,
}

// -- Profile settings --

/// One settings field group. A submission never mixes groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProfileFields {
    Password { old_pass: String, new_pass: String },
    Location { city: String, state: String },
    StandName { stand_name: String },
    ProfilePhoto {
        avatar_link: String,
        #[serde(default)]
        bio: Option<String>,
    },
}

impl ProfileFields {
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Location { .. } => "location",
            Self::StandName { .. } => "stand_name",
            Self::ProfilePhoto { .. } => "profile_photo",
        }
    }
}

/// Body of `PUT /users/settings`: the acting user plus one field group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: ProfileFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddStandRequest {
    pub stand_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_is_flat_with_mode_tag() {
        let id = Uuid::new_v4();
        let req = UpdateProfileRequest {
            id,
            fields: ProfileFields::Location {
                city: "Kailua".into(),
                state: "HI".into(),
            },
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["mode"], "location");
        assert_eq!(value["city"], "Kailua");
        assert_eq!(value["id"], id.to_string());

        let back: UpdateProfileRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn photo_update_bio_is_optional() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "mode": "profile_photo",
            "avatar_link": "http://localhost/uploads/mia/1-me.png",
        });
        let req: UpdateProfileRequest = serde_json::from_value(json).unwrap();
        assert_eq!(
            req.fields,
            ProfileFields::ProfilePhoto {
                avatar_link: "http://localhost/uploads/mia/1-me.png".into(),
                bio: None,
            }
        );
    }
}
