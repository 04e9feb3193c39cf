//! HTTP request handlers for the share domain and the intake API
//!
//! This module implements:
//! - Issuing share tokens for music links
//! - Opening share links by redirecting to the music URL they carry
//! - Handing playlist links over to the app
//! - Running a single delivery through the intake pipeline

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::classifier::is_valid_playlist_id;
use crate::coordinator::Delivery;
use crate::error::RejectionReason;
use crate::model::{CreateShareRequest, CreateShareResponse, IntakeRequest, TrackMetadata};
use crate::state::AppState;

fn rejection_response(status: StatusCode, reason: RejectionReason) -> Response {
    (
        status,
        Json(json!({
            "error": reason.user_message(),
            "code": reason.code()
        })),
    )
        .into_response()
}

/// Issues a share link for a music URL
///
/// The submitted URL is validated and canonicalized first. Links that
/// already point back at the app are unwrapped to the music URL inside them,
/// so tokens never wrap other tokens.
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://open.spotify.com/track/123?si=abc",
///   "title": "Song",     // Optional
///   "artist": "Artist"   // Optional
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - Token issued
/// - **422 Unprocessable Entity** - URL rejected; body carries the reason code
pub async fn create_share_link(
    State(state): State<AppState>,
    Json(payload): Json<CreateShareRequest>,
) -> Response {
    let validator = state.codec.validator();

    let url = match validator.validate(&payload.url) {
        Ok(url) => url,
        Err(reason) => return rejection_response(StatusCode::UNPROCESSABLE_ENTITY, reason),
    };

    let mut metadata =
        TrackMetadata::from_parts(payload.title.as_deref(), payload.artist.as_deref());

    let url = if validator.is_app_link(&url) || validator.is_share_domain(&url) {
        match state.codec.decode_detailed(url.as_str()) {
            Ok(decoded) => {
                metadata = metadata.or(decoded.metadata);
                decoded.url
            }
            Err(reason) => return rejection_response(StatusCode::UNPROCESSABLE_ENTITY, reason),
        }
    } else {
        url
    };

    let token = state.codec.encode_with_metadata(&url, metadata.as_ref());
    let share_url = state.codec.share_link(&url, metadata.as_ref());
    info!("Issued share link for {}", url);

    let response = CreateShareResponse {
        token,
        share_url,
        url,
        created_at: Utc::now(),
    };

    (StatusCode::CREATED, Json(response)).into_response()
}

/// Opens a share link
///
/// Decodes `token` (current or legacy format, nested links unwrapped) and
/// sends a 307 Temporary Redirect to the music URL.
///
/// # Response
///
/// - **307 Temporary Redirect** - Redirects to the music URL
/// - **404 Not Found** - Token could not be decoded to a trusted link
pub async fn open_share_link(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.codec.decode_detailed(&token) {
        Ok(decoded) => Redirect::temporary(decoded.url.as_str()).into_response(),
        Err(reason) => {
            debug!("Share token rejected: {}", reason);
            rejection_response(StatusCode::NOT_FOUND, reason)
        }
    }
}

/// Hands a playlist link over to the app
///
/// `GET /p/{id}` redirects to `<app-scheme>://playlist?id=<id>`.
///
/// # Response
///
/// - **307 Temporary Redirect** - Redirects into the app
/// - **400 Bad Request** - Playlist id is empty or has invalid characters
pub async fn open_playlist_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if !is_valid_playlist_id(&id) {
        return rejection_response(StatusCode::BAD_REQUEST, RejectionReason::Malformed);
    }

    let target = format!("{}://playlist?id={}", state.config.policy.app_scheme, id);
    Redirect::temporary(&target).into_response()
}

/// Runs one delivery through intake
///
/// Always answers 200; rejection and suppression are outcomes, not errors.
///
/// # Request Body
///
/// ```json
/// {
///   "source": "clipboard",
///   "text": "https://open.spotify.com/track/123"
/// }
/// ```
pub async fn intake(
    State(state): State<AppState>,
    Json(payload): Json<IntakeRequest>,
) -> impl IntoResponse {
    let delivery = Delivery::now(payload.source, payload.text);
    let outcome = state.coordinator.handle(delivery).await;
    Json(outcome)
}
