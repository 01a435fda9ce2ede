use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};

use latch_core::{AuthRepository, Paginated, PermissionCode};

use crate::dto::{PageQuery, PermissionResponse};
use crate::errors::WebResult;
use crate::state::AppState;

pub async fn list<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> WebResult<Json<Paginated<PermissionResponse>>> {
    state.authorize(&headers, &[PermissionCode::ViewPermission])?;

    let permissions = state.service.list_permissions().await?;
    let page = Paginated::from_items(&permissions, query.page(), query.limit())?;
    Ok(Json(page.map(PermissionResponse::from)))
}
