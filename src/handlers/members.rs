// src/handlers/members.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        rbac::{PermMembersManage, RequirePermission},
        tenancy::TenantContext,
    },
    models::church::{AddMemberPayload, Member, MemberWithUser},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListMembersQuery {
    /// Restringe a uma filial específica da igreja do chamador.
    pub branch_id: Option<Uuid>,
}

// GET /api/members — a consulta já sai filtrada pela igreja das claims.
#[utoipa::path(
    get,
    path = "/api/members",
    tag = "Membros",
    security(("api_jwt" = [])),
    params(ListMembersQuery),
    responses((status = 200, body = [MemberWithUser]))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    TenantContext(member): TenantContext,
    Query(query): Query<ListMembersQuery>,
) -> Result<Json<Vec<MemberWithUser>>, AppError> {
    let members = app_state
        .membership_service
        .list_members(&member, query.branch_id)
        .await?;

    Ok(Json(members))
}

// POST /api/members — vincula um usuário existente a uma filial.
#[utoipa::path(
    post,
    path = "/api/members",
    tag = "Membros",
    security(("api_jwt" = [])),
    request_body = AddMemberPayload,
    responses(
        (status = 201, body = Member),
        (status = 403, description = "Sem members_manage, filial de outra igreja ou limite do plano"),
        (status = 409, description = "Usuário já é membro da igreja"),
    )
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    TenantContext(member): TenantContext,
    _guard: RequirePermission<PermMembersManage>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let created = app_state
        .membership_service
        .add_member(&member, &payload.email, payload.branch_id, payload.role)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}
