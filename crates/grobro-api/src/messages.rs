use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use grobro_types::api::SendMessageRequest;
use grobro_types::models::Message;

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::messaging;
use crate::middleware::Claims;
use crate::notify;
use crate::{blocking, convert};

/// POST /users/{id}/messages/{crop_id}: send a message to user `id` about a crop.
///
/// The notification email goes out after the message is stored and is never
/// awaited by the request.
pub async fn send_message(
    State(state): State<AppState>,
    Path((to_id, crop_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let caller = claims.sub;
    let mail_from = state.mail_from.clone();

    let delivery = blocking(&state, move |db| {
        messaging::send(db, &mail_from, caller, to_id, crop_id, &req)
    })
    .await?;

    notify::dispatch(state.notifier.clone(), delivery.notification);

    Ok((StatusCode::CREATED, Json(delivery.message)))
}

/// GET /messages: the caller's inbox and sent messages.
pub async fn get_inbox(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Message>>> {
    let user_id = claims.sub.to_string();
    let messages = blocking(&state, move |db| {
        db.get_messages_for_user(&user_id).and_then(convert::messages)
    })
    .await?;

    Ok(Json(messages))
}

/// GET /messages/{crop_id}: the caller's conversation about one crop.
pub async fn get_crop_messages(
    State(state): State<AppState>,
    Path(crop_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Message>>> {
    let user_id = claims.sub.to_string();
    let messages = blocking(&state, move |db| {
        db.get_messages_for_crop_and_user(&crop_id.to_string(), &user_id)
            .and_then(convert::messages)
    })
    .await?;

    Ok(Json(messages))
}
