//! Project API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use depot_auth::{AdminUser, AuthUser};
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::Project;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::CatalogState;
use crate::service::{CreateProjectRequest, UpdateProjectRequest};

/// Query parameters for listing projects
#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn list_projects(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<Project>>> {
    let projects = state
        .catalog
        .list_projects(&ctx, query.include_archived)
        .await?;
    Ok(Json(projects))
}

pub async fn get_project(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>> {
    let project = state.catalog.get_project(&ctx, id).await?;
    Ok(Json(project))
}

pub async fn create_project(
    AdminUser(ctx): AdminUser,
    State(state): State<CatalogState>,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>)> {
    let project = state.catalog.create_project(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// Update fields, quota or archive state
pub async fn update_project(
    AdminUser(ctx): AdminUser,
    State(state): State<CatalogState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> Result<Json<Project>> {
    let project = state.catalog.update_project(&ctx, id, req).await?;
    Ok(Json(project))
}
