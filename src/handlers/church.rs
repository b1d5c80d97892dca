// src/handlers/church.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermChurchManage, RequirePermission},
        tenancy::TenantContext,
    },
    models::church::{
        Branch, ChurchCreatedResponse, CreateBranchPayload, CreateChurchPayload, MyChurchResponse,
        OnboardingCompletedResponse, OnboardingStatusResponse,
    },
};

// POST /api/churches — aceita sessão incompleta de propósito: é a rota
// que completa o onboarding do fundador.
#[utoipa::path(
    post,
    path = "/api/churches",
    tag = "Igrejas",
    security(("api_jwt" = [])),
    request_body = CreateChurchPayload,
    responses(
        (status = 200, description = "Igreja (nova ou existente, idempotente por criador) + token de membro", body = ChurchCreatedResponse),
    )
)]
pub async fn create_church(
    State(app_state): State<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    Json(payload): Json<CreateChurchPayload>,
) -> Result<Json<ChurchCreatedResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state
        .church_service
        .create_church(&ctx, &payload.name)
        .await?;

    Ok(Json(response))
}

// GET /api/churches/me
#[utoipa::path(
    get,
    path = "/api/churches/me",
    tag = "Igrejas",
    security(("api_jwt" = [])),
    responses(
        (status = 200, body = MyChurchResponse),
        (status = 403, description = "Sessão sem contexto de tenant"),
    )
)]
pub async fn my_church(
    State(app_state): State<AppState>,
    TenantContext(member): TenantContext,
) -> Result<Json<MyChurchResponse>, AppError> {
    let response = app_state.church_service.my_church(&member).await?;
    Ok(Json(response))
}

// POST /api/branches
#[utoipa::path(
    post,
    path = "/api/branches",
    tag = "Igrejas",
    security(("api_jwt" = [])),
    request_body = CreateBranchPayload,
    responses(
        (status = 201, body = Branch),
        (status = 403, description = "Sem church_manage ou limite do plano atingido"),
    )
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    TenantContext(member): TenantContext,
    _guard: RequirePermission<PermChurchManage>,
    Json(payload): Json<CreateBranchPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let branch = app_state
        .church_service
        .create_branch(&member, &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(branch)))
}

// GET /api/branches
#[utoipa::path(
    get,
    path = "/api/branches",
    tag = "Igrejas",
    security(("api_jwt" = [])),
    responses((status = 200, body = [Branch]))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    TenantContext(member): TenantContext,
) -> Result<Json<Vec<Branch>>, AppError> {
    let branches = app_state.church_service.list_branches(&member).await?;
    Ok(Json(branches))
}

// GET /api/onboarding — aceita sessão incompleta (é o ponto de partida).
#[utoipa::path(
    get,
    path = "/api/onboarding",
    tag = "Onboarding",
    security(("api_jwt" = [])),
    responses((status = 200, body = OnboardingStatusResponse))
)]
pub async fn onboarding_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> Result<Json<OnboardingStatusResponse>, AppError> {
    let response = app_state.church_service.onboarding_status(&ctx).await?;
    Ok(Json(response))
}

// POST /api/onboarding/complete — escrita externa de progresso.
#[utoipa::path(
    post,
    path = "/api/onboarding/complete",
    tag = "Onboarding",
    security(("api_jwt" = [])),
    responses(
        (status = 200, description = "Onboarding concluído; token novo com a claim atualizada", body = OnboardingCompletedResponse),
        (status = 403, description = "Sessão sem Member"),
    )
)]
pub async fn complete_onboarding(
    State(app_state): State<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> Result<Json<OnboardingCompletedResponse>, AppError> {
    let (member, token) = app_state.church_service.complete_onboarding(&ctx).await?;
    Ok(Json(OnboardingCompletedResponse { member, token }))
}
