//! Handlers for link management endpoints (create, update, delete).

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::api::dto::links::{CreateLinkForm, LinkResponse, ShortUrlResponse, UpdateLinkRequest};
use crate::api::extract::Actor;
use crate::application::services::CreateLink;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /links` (`application/x-www-form-urlencoded`)
///
/// # Form Fields
///
/// - `url` (required): absolute http(s) URL, at most 2048 characters
/// - `custom_name` (optional): used as the short name instead of a generated code
/// - `domain` (optional): name of an available domain to serve the link from
/// - `from_modal` (optional): `true`, `1` or `on` to get only `{ "short_url" }` back
///
/// # Response
///
/// `201 Created` with the full link, or the compact modal body.
///
/// # Errors
///
/// - 400 if the URL, custom name or domain is invalid
/// - 409 `duplicate_code` if the custom name is taken
/// - 500 `code_space_exhausted` if no free code could be generated
pub async fn create_link_handler(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Form(form): Form<CreateLinkForm>,
) -> Result<Response, AppError> {
    form.validate()?;
    let from_modal = form.is_modal();

    let domain_id = match form.domain.as_deref() {
        Some(name) => Some(state.domain_service.serving_domain(name).await?.id),
        None => None,
    };

    let link = state
        .link_service
        .create(CreateLink {
            destination: form.url,
            user_id,
            domain_id,
            custom_name: form.custom_name,
        })
        .await?;

    let short_url = state.link_service.short_url(&link);

    if from_modal {
        return Ok((StatusCode::CREATED, Json(ShortUrlResponse { short_url })).into_response());
    }

    Ok((StatusCode::CREATED, Json(LinkResponse::new(link, short_url))).into_response())
}

/// Partially updates a link owned by the acting user.
///
/// # Endpoint
///
/// `PATCH /links/{id}`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://new-destination.example",
///   "custom_name": null,
///   "available": false
/// }
/// ```
///
/// # Errors
///
/// - 400 if the body is empty or invalid
/// - 403 if the link belongs to someone else
/// - 404 if the link does not exist or is deleted
pub async fn update_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state.link_service.get(id).await?;
    actor.authorize(&link)?;

    let link = state.link_service.update(id, payload.into()).await?;
    let short_url = state.link_service.short_url(&link);

    Ok(Json(LinkResponse::new(link, short_url)))
}

/// Soft-deletes a link owned by the acting user.
///
/// # Endpoint
///
/// `DELETE /links/{id}`
///
/// The row and its visit history stay; the code stops resolving at once.
///
/// # Errors
///
/// - 403 if the link belongs to someone else
/// - 404 if the link does not exist or is already deleted
pub async fn delete_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    actor: Actor,
) -> Result<StatusCode, AppError> {
    let link = state.link_service.get(id).await?;
    actor.authorize(&link)?;

    state.link_service.soft_delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
