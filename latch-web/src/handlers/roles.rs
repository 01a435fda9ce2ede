//! Role management endpoints

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use latch_core::{AuthError, AuthRepository, Paginated, PermissionCode};

use crate::dto::{CreateRoleRequest, PageQuery, RoleResponse, UpdateRoleRequest};
use crate::errors::WebResult;
use crate::state::AppState;

pub async fn list<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> WebResult<Json<Paginated<RoleResponse>>> {
    state.authorize(&headers, &[PermissionCode::ViewRole])?;

    let roles = state.service.list_roles().await?;
    let page = Paginated::from_items(&roles, query.page(), query.limit())?;
    Ok(Json(page.map(RoleResponse::from)))
}

pub async fn create<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Json(request): Json<CreateRoleRequest>,
) -> WebResult<(StatusCode, Json<RoleResponse>)> {
    state.authorize(&headers, &[PermissionCode::CreateRole])?;

    if request.name.trim().is_empty() {
        return Err(AuthError::validation("role name is required").into());
    }
    let role = state
        .service
        .create_role(&request.name, request.description, &request.permission_ids)
        .await?;

    Ok((StatusCode::CREATED, Json(role.into())))
}

pub async fn update<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(role_id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<UpdateRoleRequest>,
) -> WebResult<Json<RoleResponse>> {
    state.authorize(&headers, &[PermissionCode::UpdateRole])?;

    let (changes, permission_ids) = request.into_parts();
    if changes.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AuthError::validation("role name cannot be empty").into());
    }
    let role = state
        .service
        .update_role(role_id, changes, permission_ids)
        .await?;
    Ok(Json(role.into()))
}
