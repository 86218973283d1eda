use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use grobro_types::api::{CreateCropRequest, CropResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::files::store_upload;
use crate::middleware::Claims;
use crate::{blocking, convert};

const DEFAULT_STATUS: &str = "available";

/// POST /crops: list a crop owned by the caller.
pub async fn create_crop(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCropRequest>,
) -> ApiResult<impl IntoResponse> {
    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::BadRequest("Description cannot be empty.".into()));
    }

    let crop_id = Uuid::new_v4();
    let owner_id = claims.sub;
    let status = req.status.unwrap_or_else(|| DEFAULT_STATUS.to_string());

    let crop = blocking(&state, move |db| {
        db.insert_crop(
            &crop_id.to_string(),
            &owner_id.to_string(),
            &description,
            req.selling,
            &status,
        )
        .and_then(convert::crop)
    })
    .await?;

    info!("User {} listed crop {}", owner_id, crop_id);

    Ok((
        StatusCode::CREATED,
        Json(CropResponse {
            crop,
            photos: vec![],
        }),
    ))
}

/// GET /crops/{id}: a crop with its photos.
pub async fn get_crop(
    State(state): State<AppState>,
    Path(crop_id): Path<Uuid>,
) -> ApiResult<Json<CropResponse>> {
    let response = blocking(&state, move |db| -> ApiResult<_> {
        let id = crop_id.to_string();
        let crop = db
            .get_crop(&id)?
            .ok_or_else(|| ApiError::NotFound("Item does not exist.".into()))?;
        let photos = db
            .get_photos_for_crop(&id)?
            .into_iter()
            .map(convert::photo)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(CropResponse {
            crop: convert::crop(crop)?,
            photos,
        })
    })
    .await?;

    Ok(Json(response))
}

/// POST /crops/{id}/photos: raw image body; only the crop's owner may add photos.
pub async fn add_photo(
    State(state): State<AppState>,
    Path(crop_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    let owner_id = blocking(&state, move |db| -> ApiResult<_> {
        let crop = db
            .get_crop(&crop_id.to_string())?
            .ok_or_else(|| ApiError::NotFound("Item does not exist.".into()))?;
        Ok(convert::parse_id(&crop.owner_id)?)
    })
    .await?;

    if owner_id != claims.sub {
        return Err(ApiError::Forbidden("Only the seller can add photos to a crop.".into()));
    }

    let link = store_upload(&state, &claims, &headers, &bytes).await?;

    let user_id = claims.sub;
    let photo = blocking(&state, move |db| {
        db.insert_photo(
            &Uuid::new_v4().to_string(),
            &link,
            &crop_id.to_string(),
            &user_id.to_string(),
        )
        .and_then(convert::photo)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(photo)))
}
