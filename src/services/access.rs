// src/services/access.rs

//! Ponto único de decisão de acesso.
//!
//! Todo handler de recurso passa por aqui, diretamente ou via o extrator
//! `RequirePermission`. O tenant do alvo chega como argumento explícito
//! (nunca estado ambiente de requisição), o que mantém o componente
//! testável sem um servidor de pé.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{MemberContext, RequestContext},
        rbac::{PermissionType, Role},
    },
};

/// Identificadores de tenant do recurso alvo.
#[derive(Debug, Clone, Copy)]
pub struct TenantRef {
    pub church_id: Uuid,
    pub branch_id: Option<Uuid>,
}

impl TenantRef {
    pub fn church(church_id: Uuid) -> Self {
        Self {
            church_id,
            branch_id: None,
        }
    }
}

/// O que a operação exige do chamador.
#[derive(Debug, Clone, Copy)]
pub enum Requirement {
    /// Basta pertencer ao tenant.
    Membership,
    /// Exige um tipo de permissão no conjunto efetivo.
    Permission(PermissionType),
    /// Exige role com rank mínimo.
    RoleFloor(Role),
}

/// Conjunto efetivo: concessões explícitas ∪ `members_view` ∪ catálogo
/// inteiro para ADMINFILIAL/ADMINGERAL.
pub fn effective_permissions(member: &MemberContext) -> BTreeSet<PermissionType> {
    if member.role.implies_full_access() {
        return PermissionType::ALL.into_iter().collect();
    }

    let mut set: BTreeSet<PermissionType> = member.permissions.iter().copied().collect();
    set.insert(PermissionType::MembersView);
    set
}

pub fn has_permission(member: &MemberContext, permission: PermissionType) -> bool {
    effective_permissions(member).contains(&permission)
}

/// Decide ALLOW/DENY para uma operação a partir do contexto resolvido.
///
/// A ordem importa: contexto incompleto e fronteira de tenant vêm antes
/// de qualquer permissão. Permissões são locais ao tenant, então ter a
/// permissão certa nunca atravessa a fronteira de outra igreja.
pub fn authorize(
    ctx: &RequestContext,
    target: Option<&TenantRef>,
    requirement: Requirement,
) -> Result<(), AppError> {
    let member = ctx
        .membership
        .as_ref()
        .ok_or(AppError::IncompleteOnboarding)?;

    authorize_member(member, target, requirement)
}

pub fn authorize_member(
    member: &MemberContext,
    target: Option<&TenantRef>,
    requirement: Requirement,
) -> Result<(), AppError> {
    if let Some(target) = target {
        if target.church_id != member.church_id {
            return Err(AppError::Forbidden);
        }
    }

    match requirement {
        Requirement::Membership => Ok(()),
        Requirement::Permission(permission) => {
            if has_permission(member, permission) {
                Ok(())
            } else {
                Err(AppError::Forbidden)
            }
        }
        Requirement::RoleFloor(floor) => {
            if member.role.rank() >= floor.rank() {
                Ok(())
            } else {
                Err(AppError::Forbidden)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn member_ctx(role: Role, church_id: Uuid, permissions: &[PermissionType]) -> MemberContext {
        MemberContext {
            member_id: Uuid::new_v4(),
            role,
            branch_id: Uuid::new_v4(),
            church_id,
            permissions: permissions.to_vec(),
            onboarding_completed: true,
        }
    }

    fn user_only_ctx() -> RequestContext {
        RequestContext {
            user: crate::models::auth::User {
                id: Uuid::new_v4(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                password_hash: "hash".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            membership: None,
        }
    }

    #[test]
    fn tenant_mismatch_beats_permission() {
        // Mesmo ADMINGERAL com acesso total não atravessa outra igreja.
        let member = member_ctx(Role::AdminGeral, Uuid::new_v4(), &[]);
        let other_church = TenantRef::church(Uuid::new_v4());

        let result = authorize_member(
            &member,
            Some(&other_church),
            Requirement::Permission(PermissionType::FinancesManage),
        );
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn incomplete_context_is_forbidden_on_tenant_routes() {
        let ctx = user_only_ctx();
        let result = authorize(&ctx, None, Requirement::Membership);
        assert!(matches!(result, Err(AppError::IncompleteOnboarding)));
    }

    #[test]
    fn admins_have_implied_full_access() {
        let church_id = Uuid::new_v4();
        let member = member_ctx(Role::AdminFilial, church_id, &[]);

        let result = authorize_member(
            &member,
            Some(&TenantRef::church(church_id)),
            Requirement::Permission(PermissionType::FinancesManage),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn members_view_is_always_effective() {
        let member = member_ctx(Role::Member, Uuid::new_v4(), &[]);

        assert!(has_permission(&member, PermissionType::MembersView));
        assert!(!has_permission(&member, PermissionType::FinancesManage));
    }

    #[test]
    fn explicit_grant_allows_a_plain_member() {
        let church_id = Uuid::new_v4();
        let member = member_ctx(Role::Member, church_id, &[PermissionType::EventsManage]);

        let result = authorize_member(
            &member,
            Some(&TenantRef::church(church_id)),
            Requirement::Permission(PermissionType::EventsManage),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn role_floor_blocks_lower_ranks() {
        let coordinator = member_ctx(Role::Coordinator, Uuid::new_v4(), &[]);
        let admin = member_ctx(Role::AdminFilial, Uuid::new_v4(), &[]);

        assert!(matches!(
            authorize_member(&coordinator, None, Requirement::RoleFloor(Role::AdminFilial)),
            Err(AppError::Forbidden)
        ));
        assert!(authorize_member(&admin, None, Requirement::RoleFloor(Role::AdminFilial)).is_ok());
    }
}
