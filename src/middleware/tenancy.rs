// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    models::auth::{MemberContext, RequestContext},
};

// O extrator do contexto de tenant do chamador. O tenant vem das claims
// do token (cache denormalizado do estado de membro), nunca de header.
//
// Sessão incompleta (usuário sem Member) em rota com escopo de tenant é
// rejeitada com 403 — nunca 404, para não vazar existência de recursos.
#[derive(Debug, Clone)]
pub struct TenantContext(pub MemberContext);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<RequestContext>()
            .ok_or(AppError::InvalidToken)?;

        let membership = ctx
            .membership
            .clone()
            .ok_or(AppError::IncompleteOnboarding)?;

        Ok(TenantContext(membership))
    }
}
