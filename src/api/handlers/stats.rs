//! Handlers for link statistics.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::json;

use crate::api::dto::pagination::{DateFilterParams, HistoryQueryParams};
use crate::api::dto::stats::{HistoryResponse, StatsResponse};
use crate::api::extract::Actor;
use crate::error::AppError;
use crate::state::AppState;

/// Aggregated click numbers of a link.
///
/// # Endpoint
///
/// `GET /links/{id}/stats`
///
/// # Query Parameters
///
/// - `from` (optional): Start of the range (RFC 3339)
/// - `to` (optional): End of the range (RFC 3339)
///
/// Readable for soft-deleted links too.
///
/// # Errors
///
/// - 400 if `from` is after `to`
/// - 403 if the link belongs to someone else
/// - 404 if the link does not exist
pub async fn stats_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    actor: Actor,
    Query(range): Query<DateFilterParams>,
) -> Result<Json<StatsResponse>, AppError> {
    let link = state.link_service.find(id).await?;
    actor.authorize(&link)?;

    let summary = state.stats_service.summary(id, range.to_filter()).await?;

    Ok(Json(StatsResponse::new(link.id, link.short_name, &range, summary)))
}

/// Individual visits of a link, newest first.
///
/// # Endpoint
///
/// `GET /links/{id}/history`
///
/// # Query Parameters
///
/// - `page` (optional): Page number (default: 1)
/// - `page_size` (optional): Items per page (default: 25, max: 100)
/// - `from` / `to` (optional): RFC 3339 range
///
/// # Errors
///
/// - 400 if pagination or the range is invalid
/// - 403 if the link belongs to someone else
/// - 404 if the link does not exist
pub async fn history_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<HistoryQueryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let filter = params
        .to_filter()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let link = state.link_service.find(id).await?;
    actor.authorize(&link)?;

    let rows = state.stats_service.history(id, filter).await?;

    Ok(Json(HistoryResponse {
        link_id: id,
        pagination: (&params.pagination).into(),
        items: rows.into_iter().map(Into::into).collect(),
    }))
}
