// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::rbac::{PermissionType, Role};

// Nosso tipo de erro central, com `thiserror` para melhor ergonomia.
// Nada aqui é fatal ao processo: todo erro é por requisição e
// corrigível pelo chamador, então nenhum caminho faz retry.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Membro não encontrado")]
    MemberNotFound,

    #[error("Filial não encontrada")]
    BranchNotFound,

    #[error("Igreja não encontrada")]
    ChurchNotFound,

    // Fronteira de tenant, role insuficiente ou permissão ausente.
    // A mensagem genérica não confirma a existência do recurso alvo.
    #[error("Acesso negado")]
    Forbidden,

    // Sessão autenticada sem Member completo em rota com escopo de tenant.
    // Sempre 403, nunca 404.
    #[error("Cadastro incompleto")]
    IncompleteOnboarding,

    // Permissões restritas pedidas para um membro com rank abaixo de
    // COORDINATOR. A mensagem nomeia TODOS os tipos rejeitados.
    #[error("Permissões restritas rejeitadas")]
    RestrictedPermissions {
        role: Role,
        rejected: Vec<PermissionType>,
    },

    #[error("Permissão desconhecida: {0}")]
    UnknownPermission(String),

    #[error("Este usuário já é membro da igreja")]
    MemberAlreadyExists,

    #[error("Limite de filiais do plano atingido")]
    BranchLimitReached,

    #[error("Limite de membros do plano atingido")]
    MemberLimitReached,

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// "Membros com role MEMBER não podem receber as permissões: finances_manage"
pub fn restricted_permissions_message(role: Role, rejected: &[PermissionType]) -> String {
    let tipos = rejected
        .iter()
        .map(|p| p.slug())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Membros com role {} não podem receber as permissões: {}",
        role, tipos
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "Este e-mail já está em uso.".to_string())
            }
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.".to_string())
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::UserNotFound => {
                (StatusCode::NOT_FOUND, "Usuário não encontrado.".to_string())
            }
            AppError::MemberNotFound => {
                (StatusCode::NOT_FOUND, "Membro não encontrado.".to_string())
            }
            AppError::BranchNotFound => {
                (StatusCode::NOT_FOUND, "Filial não encontrada.".to_string())
            }
            AppError::ChurchNotFound => {
                (StatusCode::NOT_FOUND, "Igreja não encontrada.".to_string())
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Acesso negado.".to_string()),
            AppError::IncompleteOnboarding => (
                StatusCode::FORBIDDEN,
                "Cadastro incompleto: crie ou entre em uma igreja para acessar este recurso."
                    .to_string(),
            ),
            AppError::RestrictedPermissions { role, rejected } => (
                StatusCode::FORBIDDEN,
                restricted_permissions_message(role, &rejected),
            ),
            AppError::UnknownPermission(slug) => (
                StatusCode::BAD_REQUEST,
                format!("Permissão desconhecida: {}", slug),
            ),
            AppError::MemberAlreadyExists => (
                StatusCode::CONFLICT,
                "Este usuário já é membro da igreja.".to_string(),
            ),
            AppError::BranchLimitReached => (
                StatusCode::FORBIDDEN,
                "Limite de filiais do plano atingido.".to_string(),
            ),
            AppError::MemberLimitReached => (
                StatusCode::FORBIDDEN,
                "Limite de membros do plano atingido.".to_string(),
            ),
            AppError::UniqueConstraintViolation(constraint) => (
                StatusCode::CONFLICT,
                format!("Registro duplicado ({}).", constraint),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError...)
            // viram 500. O `tracing` loga a mensagem detalhada que o
            // `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_message_names_every_rejected_type() {
        assert_eq!(
            restricted_permissions_message(Role::Member, &[PermissionType::FinancesManage]),
            "Membros com role MEMBER não podem receber as permissões: finances_manage"
        );
        assert_eq!(
            restricted_permissions_message(
                Role::Member,
                &[
                    PermissionType::FinancesManage,
                    PermissionType::MembersManage
                ]
            ),
            "Membros com role MEMBER não podem receber as permissões: finances_manage, members_manage"
        );
    }
}
