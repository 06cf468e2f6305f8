//! Asset review API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::ReviewView;
use uuid::Uuid;

use crate::api::middleware::CatalogState;
use crate::service::{RequestReviewRequest, UpdateReviewRequest};

pub async fn request_review(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(version_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RequestReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    let review = state.catalog.request_review(&ctx, version_id, req).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_pending_reviews(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
) -> Result<Json<Vec<ReviewView>>> {
    let reviews = state.catalog.list_pending_reviews(&ctx).await?;
    Ok(Json(reviews))
}

/// Record a verdict (assigned reviewer or admin)
pub async fn update_review(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(review_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateReviewRequest>,
) -> Result<Json<ReviewView>> {
    let review = state.catalog.update_review(&ctx, review_id, req).await?;
    Ok(Json(review))
}
