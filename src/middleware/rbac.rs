// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    models::{auth::RequestContext, rbac::PermissionType},
    services::access::{self, Requirement},
};

/// 1. O Trait que define o que é uma Permissão exigível por rota
pub trait PermissionDef: Send + Sync + 'static {
    fn required() -> PermissionType;
}

/// 2. O Extractor (Guardião): nega a rota antes do handler rodar quando
/// o conjunto efetivo do chamador não contém a permissão exigida.
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<RequestContext>()
            .ok_or(AppError::InvalidToken)?;

        // A decisão sai das claims, sem ida ao banco: o token carrega o
        // conjunto de permissões do membro.
        access::authorize(ctx, None, Requirement::Permission(T::required()))?;

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermMembersManage;
impl PermissionDef for PermMembersManage {
    fn required() -> PermissionType {
        PermissionType::MembersManage
    }
}

pub struct PermChurchManage;
impl PermissionDef for PermChurchManage {
    fn required() -> PermissionType {
        PermissionType::ChurchManage
    }
}
