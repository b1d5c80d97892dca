// src/handlers/rbac.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::rbac::{
        permission_catalog, ChangeRolePayload, PermissionCatalogEntry, PermissionReplaceResponse,
        ReplacePermissionsPayload, RoleChangeResponse,
    },
};

// PUT /api/members/{id}/role
#[utoipa::path(
    put,
    path = "/api/members/{id}/role",
    tag = "RBAC",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path, description = "ID do membro alvo")),
    request_body = ChangeRolePayload,
    responses(
        (status = 200, description = "Role novo + conjunto podado/preservado", body = RoleChangeResponse),
        (status = 403, description = "Alvo de outra igreja ou requester abaixo de ADMINFILIAL"),
    )
)]
pub async fn change_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<ChangeRolePayload>,
) -> Result<Json<RoleChangeResponse>, AppError> {
    let response = app_state
        .membership_service
        .change_role(&ctx, member_id, payload.role)
        .await?;

    Ok(Json(response))
}

// PUT /api/members/{id}/permissions — substituição integral do conjunto.
#[utoipa::path(
    put,
    path = "/api/members/{id}/permissions",
    tag = "RBAC",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path, description = "ID do membro alvo")),
    request_body = ReplacePermissionsPayload,
    responses(
        (status = 200, description = "Conjunto resultante de permissões", body = PermissionReplaceResponse),
        (status = 400, description = "Permissão desconhecida"),
        (status = 403, description = "Tipos restritos rejeitados (mensagem nomeia cada um) ou alvo de outra igreja"),
    )
)]
pub async fn replace_permissions(
    State(app_state): State<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<ReplacePermissionsPayload>,
) -> Result<Json<PermissionReplaceResponse>, AppError> {
    let response = app_state
        .membership_service
        .replace_permissions(&ctx, member_id, &payload.permissions)
        .await?;

    Ok(Json(response))
}

// GET /api/permissions (para o frontend saber o que mostrar na tela)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses((status = 200, body = [PermissionCatalogEntry]))
)]
pub async fn list_permissions() -> Json<Vec<PermissionCatalogEntry>> {
    Json(permission_catalog())
}
