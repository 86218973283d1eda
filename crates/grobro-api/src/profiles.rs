use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::info;
use uuid::Uuid;

use grobro_db::Database;
use grobro_db::models::ProfilePatch;
use grobro_types::api::{AddStandRequest, ProfileFields, StandCrop, UpdateProfileRequest, UpdateProfileResponse};
use grobro_types::models::Profile;

use crate::auth::{AppState, MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::{blocking, convert};

/// Shortest stand name accepted once the user has typed one.
pub const MIN_STAND_NAME_LEN: usize = 5;

/// GET /users/{id}
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Profile>> {
    let profile = blocking(&state, move |db| load_profile(db, user_id)).await?;
    Ok(Json(profile))
}

/// GET /users/{id}/stand: the user's crops for sale, each tagged with the stand owner.
pub async fn get_stand(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<StandCrop>>> {
    let stand = blocking(&state, move |db| -> ApiResult<_> {
        let id = user_id.to_string();
        let crops = db.get_selling_crops(&id)?;
        if crops.is_empty() {
            return Err(ApiError::NotFound("This user doesn't have a stand".into()));
        }

        let owner = db
            .get_user_by_id(&id)?
            .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;
        let owner = convert::stand_owner(&owner)?;

        let stand = crops
            .into_iter()
            .map(|row| -> anyhow::Result<StandCrop> {
                Ok(StandCrop {
                    crop: convert::crop(row)?,
                    user: owner.clone(),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(stand)
    })
    .await?;

    Ok(Json(stand))
}

/// PUT /users/stand: name (or rename) the caller's stand.
pub async fn add_stand(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddStandRequest>,
) -> ApiResult<Json<Profile>> {
    let user_id = claims.sub;
    let fields = ProfileFields::StandName {
        stand_name: req.stand_name,
    };
    let profile = blocking(&state, move |db| apply_update(db, user_id, fields)).await?;
    Ok(Json(profile))
}

/// PUT /users/settings: apply one settings field group for the caller.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    if req.id != claims.sub {
        return Err(ApiError::Forbidden("You cannot edit someone else's profile.".into()));
    }

    let mode = req.fields.mode_name();
    let user_id = req.id;
    let profile = blocking(&state, move |db| apply_update(db, user_id, req.fields)).await?;

    info!("User {} updated {} settings", user_id, mode);

    Ok(Json(UpdateProfileResponse {
        success: true,
        profile: Some(profile),
    }))
}

fn load_profile(db: &Database, user_id: Uuid) -> ApiResult<Profile> {
    let row = db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;
    Ok(convert::profile(row)?)
}

/// Validate and persist one field group, then return the refreshed profile.
fn apply_update(db: &Database, user_id: Uuid, fields: ProfileFields) -> ApiResult<Profile> {
    let id = user_id.to_string();
    let user = db
        .get_user_by_id(&id)?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

    match fields {
        ProfileFields::Password { old_pass, new_pass } => {
            if new_pass.chars().count() < MIN_PASSWORD_LEN {
                return Err(ApiError::BadRequest(format!(
                    "Password must be at least {} characters.",
                    MIN_PASSWORD_LEN
                )));
            }
            if new_pass == old_pass {
                return Err(ApiError::BadRequest("New password must differ from the old one.".into()));
            }
            if !verify_password(&old_pass, &user.password)? {
                return Err(ApiError::BadRequest("Invalid password.".into()));
            }
            let password_hash = hash_password(&new_pass)?;
            db.update_profile(&id, &ProfilePatch::Password { password_hash: &password_hash })?;
        }
        ProfileFields::Location { city, state } => {
            let (city, state) = (city.trim(), state.trim());
            if city.is_empty() || state.is_empty() {
                return Err(ApiError::BadRequest("City and state are required.".into()));
            }
            db.update_profile(&id, &ProfilePatch::Location { city, state })?;
        }
        ProfileFields::StandName { stand_name } => {
            let stand_name = resolve_stand_name(&stand_name, &user.first_name)?;
            db.update_profile(&id, &ProfilePatch::StandName { stand_name: &stand_name })?;
        }
        ProfileFields::ProfilePhoto { avatar_link, bio } => {
            if avatar_link.trim().is_empty() {
                return Err(ApiError::BadRequest("A profile photo is required.".into()));
            }
            db.update_profile(
                &id,
                &ProfilePatch::ProfilePhoto {
                    avatar_link: &avatar_link,
                    bio: bio.as_deref(),
                },
            )?;
        }
    }

    load_profile(db, user_id)
}

/// Blank names fall back to `"{first_name}'s Stand"`; short names are rejected.
pub fn resolve_stand_name(requested: &str, first_name: &str) -> ApiResult<String> {
    let requested = requested.trim();
    if requested.is_empty() {
        return Ok(format!("{}'s Stand", first_name));
    }
    if requested.chars().count() < MIN_STAND_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Stand name must be at least {} characters.",
            MIN_STAND_NAME_LEN
        )));
    }
    Ok(requested.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grobro_db::models::NewUser;

    fn seeded() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        let hash = hash_password("abcde").unwrap();
        db.create_user(&NewUser {
            id: &id.to_string(),
            username: "mia",
            email: "mia@example.com",
            password_hash: &hash,
            first_name: "Mia",
            last_name: "Kealoha",
            city: Some("Manoa"),
            state: Some("HI"),
        })
        .unwrap();
        (db, id)
    }

    #[test]
    fn blank_stand_name_defaults_to_first_name() {
        assert_eq!(resolve_stand_name("", "Mia").unwrap(), "Mia's Stand");
        assert_eq!(resolve_stand_name("   ", "Mia").unwrap(), "Mia's Stand");
        assert!(resolve_stand_name("Kai", "Mia").is_err());
        assert_eq!(resolve_stand_name("Fresh Farm", "Mia").unwrap(), "Fresh Farm");
    }

    #[test]
    fn stand_name_update_opens_a_stand() {
        let (db, id) = seeded();
        assert!(!load_profile(&db, id).unwrap().has_stand());

        let profile = apply_update(
            &db,
            id,
            ProfileFields::StandName {
                stand_name: String::new(),
            },
        )
        .unwrap();
        assert_eq!(profile.stand_name.as_deref(), Some("Mia's Stand"));
        assert!(profile.has_stand());
    }

    #[test]
    fn password_change_requires_old_password() {
        let (db, id) = seeded();

        let wrong = apply_update(
            &db,
            id,
            ProfileFields::Password {
                old_pass: "zzzzz".into(),
                new_pass: "fghij".into(),
            },
        );
        assert!(matches!(wrong, Err(ApiError::BadRequest(_))));

        apply_update(
            &db,
            id,
            ProfileFields::Password {
                old_pass: "abcde".into(),
                new_pass: "fghij".into(),
            },
        )
        .unwrap();

        let row = db.get_user_by_id(&id.to_string()).unwrap().unwrap();
        assert!(verify_password("fghij", &row.password).unwrap());
    }

    #[test]
    fn location_requires_both_fields() {
        let (db, id) = seeded();
        let err = apply_update(
            &db,
            id,
            ProfileFields::Location {
                city: "Kailua".into(),
                state: " ".into(),
            },
        );
        assert!(matches!(err, Err(ApiError::BadRequest(_))));

        let profile = apply_update(
            &db,
            id,
            ProfileFields::Location {
                city: "Kailua".into(),
                state: "HI".into(),
            },
        )
        .unwrap();
        assert_eq!(profile.city.as_deref(), Some("Kailua"));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (db, _) = seeded();
        let err = apply_update(
            &db,
            Uuid::new_v4(),
            ProfileFields::StandName {
                stand_name: "Somebody's Farm".into(),
            },
        );
        assert!(matches!(err, Err(ApiError::NotFound(_))));
    }
}
