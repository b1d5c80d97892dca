// src/models/church.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::rbac::Role;

// O que sai do banco (Tabela churches)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Church {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Igreja Batista Central")]
    pub name: String,

    pub created_by_user_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela branches)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: Uuid,
    pub church_id: Uuid,

    #[schema(example = "Sede")]
    pub name: String,

    pub is_main_branch: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela members): a identidade dentro do tenant.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub user_id: Uuid,
    pub church_id: Uuid,
    pub branch_id: Uuid,
    pub role: Role,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linha da listagem de membros: associação + dados básicos do usuário.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub branch_id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

/// Status derivado de onboarding. Visão somente-leitura, nunca
/// armazenada: as transições acontecem por escritas externas de
/// progresso; aqui só classificamos o estado atual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OnboardingStatus {
    New,
    Pending,
    Complete,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatusResponse {
    pub status: OnboardingStatus,
    pub church: Option<Church>,
    pub branch: Option<Branch>,
    pub member: Option<Member>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingCompletedResponse {
    pub member: Member,
    pub token: String,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateChurchPayload {
    #[validate(length(min = 1, message = "O nome da igreja é obrigatório."))]
    #[schema(example = "Igreja Batista Central")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBranchPayload {
    #[validate(length(min = 1, message = "O nome da filial é obrigatório."))]
    #[schema(example = "Filial Zona Norte")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    pub branch_id: Uuid,

    #[schema(example = "MEMBER")]
    pub role: Role,
}

// ---
// Respostas
// ---

// Criação de igreja: a resposta já carrega o token de membro novo,
// para o cliente sair com as claims de ADMINGERAL na mesma chamada.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChurchCreatedResponse {
    pub church: Church,
    pub branch: Branch,
    pub member: Member,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyChurchResponse {
    pub church: Church,
    pub branches: Vec<Branch>,
}
