// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::rbac::{PermissionType, Role};

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

/// Tipo do token: sessão apenas-usuário (onboarding incompleto) ou
/// sessão de membro com contexto de tenant completo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    User,
    Member,
}

/// Estrutura de dados ("claims") dentro do JWT.
///
/// O token é um cache denormalizado do estado de tenant: role, filial,
/// igreja e permissões viajam nas claims, e qualquer mutação que as
/// altere reemite um token novo na mesma resposta. O schema das chaves é
/// contrato externo; a ausência de memberId/role/branchId/churchId
/// sinaliza um contexto incompleto.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub member_id: Option<Uuid>,
    pub role: Option<Role>,
    pub branch_id: Option<Uuid>,
    pub church_id: Option<Uuid>,
    pub permissions: Vec<String>,
    pub onboarding_completed: bool,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

/// Contexto de membro extraído das claims: tudo que o ponto de decisão
/// de acesso precisa para decidir sem tocar no banco.
#[derive(Debug, Clone)]
pub struct MemberContext {
    pub member_id: Uuid,
    pub role: Role,
    pub branch_id: Uuid,
    pub church_id: Uuid,
    pub permissions: Vec<PermissionType>,
    pub onboarding_completed: bool,
}

/// Contexto resolvido de uma requisição autenticada.
/// `membership == None` marca a sessão como incompleta (usuário sem Member).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
    pub membership: Option<MemberContext>,
}
