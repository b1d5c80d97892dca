// src/services/membership.rs

//! Resolutor de concessões de permissão e transições de role.
//!
//! As decisões são funções puras sobre o estado carregado (requester,
//! membro alvo, concessões atuais); o serviço só aplica o delta
//! resultante dentro de uma transação. O replace é delete+insert em
//! granularidade de linha: dois admins disputando o mesmo membro é
//! last-writer-wins, com a janela entre leitura e escrita documentada
//! como inconsistência aceita.

use std::collections::BTreeSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::PlanLimits,
    db::{ChurchRepository, MemberRepository, UserRepository},
    models::{
        auth::{MemberContext, RequestContext},
        church::{Member, MemberWithUser},
        rbac::{
            allowed_permissions, PermissionReplaceResponse, PermissionType, Role,
            RoleChangeResponse,
        },
    },
    services::{
        access::{self, Requirement, TenantRef},
        auth::AuthService,
    },
};

/// Concessão cruzando a fronteira do tenant é sempre negada,
/// independente do role; abaixo de ADMINFILIAL ninguém atribui
/// permissões nem roles.
fn ensure_can_manage(requester: &MemberContext, target: &Member) -> Result<(), AppError> {
    if requester.church_id != target.church_id {
        return Err(AppError::Forbidden);
    }
    if requester.role.rank() < Role::AdminFilial.rank() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Delta calculado para uma substituição integral de permissões.
#[derive(Debug, PartialEq, Eq)]
pub struct PermissionReplacePlan {
    pub final_set: BTreeSet<PermissionType>,
    pub to_grant: Vec<PermissionType>,
    pub to_revoke: Vec<PermissionType>,
}

/// Valida e planeja a substituição do conjunto de permissões de um
/// membro. Semântica de substituição integral: o conjunto pedido vira o
/// conjunto final (∪ `members_view`), nunca uma adição incremental.
pub fn plan_permission_replace(
    requester: &MemberContext,
    target: &Member,
    current: &BTreeSet<PermissionType>,
    requested_slugs: &[String],
) -> Result<PermissionReplacePlan, AppError> {
    ensure_can_manage(requester, target)?;

    let mut requested = BTreeSet::new();
    for slug in requested_slugs {
        let permission = PermissionType::from_slug(slug)
            .ok_or_else(|| AppError::UnknownPermission(slug.clone()))?;
        requested.insert(permission);
    }

    // A checagem de restrição olha o role do ALVO, não o do requester.
    let rejected: Vec<PermissionType> = requested
        .iter()
        .copied()
        .filter(|p| p.is_restricted() && target.role.rank() < Role::Coordinator.rank())
        .collect();
    if !rejected.is_empty() {
        return Err(AppError::RestrictedPermissions {
            role: target.role,
            rejected,
        });
    }

    requested.insert(PermissionType::MembersView);

    let to_grant = requested.difference(current).copied().collect();
    let to_revoke = current.difference(&requested).copied().collect();

    Ok(PermissionReplacePlan {
        final_set: requested,
        to_grant,
        to_revoke,
    })
}

/// Delta calculado para uma mudança de role.
#[derive(Debug, PartialEq, Eq)]
pub struct RoleChangePlan {
    pub new_role: Role,
    pub retained: BTreeSet<PermissionType>,
    pub to_revoke: Vec<PermissionType>,
    pub changed: bool,
}

pub fn plan_role_change(
    requester: &MemberContext,
    target: &Member,
    current: &BTreeSet<PermissionType>,
    new_role: Role,
) -> Result<RoleChangePlan, AppError> {
    ensure_can_manage(requester, target)?;

    // O conjunto reportado inclui a implícita `members_view` em todos os
    // ramos; persistida ou não, ela nunca sai do conjunto efetivo.
    let mut retained: BTreeSet<PermissionType> = current.clone();
    retained.insert(PermissionType::MembersView);

    // Mesmo role: no-op idempotente.
    if new_role == target.role {
        return Ok(RoleChangePlan {
            new_role,
            retained,
            to_revoke: Vec::new(),
            changed: false,
        });
    }

    // Upgrade só alarga a elegibilidade; não concede nada novo.
    if new_role.rank() > target.role.rank() {
        return Ok(RoleChangePlan {
            new_role,
            retained,
            to_revoke: Vec::new(),
            changed: true,
        });
    }

    // Downgrade: retém a interseção com o que o role novo permite.
    let allowed = allowed_permissions(new_role);
    let mut kept: BTreeSet<PermissionType> =
        retained.intersection(&allowed).copied().collect();
    kept.insert(PermissionType::MembersView);

    let to_revoke = current.difference(&kept).copied().collect();

    Ok(RoleChangePlan {
        new_role,
        retained: kept,
        to_revoke,
        changed: true,
    })
}

fn slugs(set: &BTreeSet<PermissionType>) -> Vec<String> {
    set.iter().map(|p| p.slug().to_string()).collect()
}

#[derive(Clone)]
pub struct MembershipService {
    member_repo: MemberRepository,
    user_repo: UserRepository,
    church_repo: ChurchRepository,
    auth_service: AuthService,
    plan: PlanLimits,
    pool: PgPool,
}

impl MembershipService {
    pub fn new(
        member_repo: MemberRepository,
        user_repo: UserRepository,
        church_repo: ChurchRepository,
        auth_service: AuthService,
        plan: PlanLimits,
        pool: PgPool,
    ) -> Self {
        Self {
            member_repo,
            user_repo,
            church_repo,
            auth_service,
            plan,
            pool,
        }
    }

    /// Substitui o conjunto de permissões de um membro (diff
    /// create/delete em uma transação) e devolve o conjunto resultante.
    pub async fn replace_permissions(
        &self,
        ctx: &RequestContext,
        target_member_id: Uuid,
        requested: &[String],
    ) -> Result<PermissionReplaceResponse, AppError> {
        let requester = ctx
            .membership
            .as_ref()
            .ok_or(AppError::IncompleteOnboarding)?;

        let target = self
            .member_repo
            .find_by_id(target_member_id)
            .await?
            .ok_or(AppError::MemberNotFound)?;
        let current: BTreeSet<PermissionType> = self
            .member_repo
            .list_permissions(target.id)
            .await?
            .into_iter()
            .collect();

        let plan = plan_permission_replace(requester, &target, &current, requested)?;

        let mut tx = self.pool.begin().await?;
        if !plan.to_revoke.is_empty() {
            self.member_repo
                .revoke_permissions(&mut *tx, target.id, &plan.to_revoke)
                .await?;
        }
        if !plan.to_grant.is_empty() {
            self.member_repo
                .grant_permissions(&mut *tx, target.id, &plan.to_grant)
                .await?;
        }
        tx.commit().await?;

        let token = self.refresh_token_if_self(ctx, &target, &plan.final_set)?;
        Ok(PermissionReplaceResponse {
            permissions: slugs(&plan.final_set),
            token,
        })
    }

    /// Troca o role de um membro, preservando (upgrade) ou podando
    /// (downgrade) o conjunto de permissões na mesma transação.
    pub async fn change_role(
        &self,
        ctx: &RequestContext,
        target_member_id: Uuid,
        new_role: Role,
    ) -> Result<RoleChangeResponse, AppError> {
        let requester = ctx
            .membership
            .as_ref()
            .ok_or(AppError::IncompleteOnboarding)?;

        let target = self
            .member_repo
            .find_by_id(target_member_id)
            .await?
            .ok_or(AppError::MemberNotFound)?;
        let current: BTreeSet<PermissionType> = self
            .member_repo
            .list_permissions(target.id)
            .await?
            .into_iter()
            .collect();

        let plan = plan_role_change(requester, &target, &current, new_role)?;

        let updated = if plan.changed {
            let mut tx = self.pool.begin().await?;
            let updated = self
                .member_repo
                .update_role(&mut *tx, target.id, plan.new_role)
                .await?;
            if !plan.to_revoke.is_empty() {
                self.member_repo
                    .revoke_permissions(&mut *tx, target.id, &plan.to_revoke)
                    .await?;
            }
            tx.commit().await?;
            updated
        } else {
            target
        };

        let token = self.refresh_token_if_self(ctx, &updated, &plan.retained)?;
        Ok(RoleChangeResponse {
            role: updated.role,
            permissions: slugs(&plan.retained),
            token,
        })
    }

    // O token é um cache das claims: mutação na própria membership do
    // requester reemite na mesma resposta; terceiros renovam as claims
    // no próximo login/refresh.
    fn refresh_token_if_self(
        &self,
        ctx: &RequestContext,
        target: &Member,
        permissions: &BTreeSet<PermissionType>,
    ) -> Result<Option<String>, AppError> {
        let requester = match ctx.membership.as_ref() {
            Some(membership) => membership,
            None => return Ok(None),
        };
        if requester.member_id != target.id {
            return Ok(None);
        }

        let permissions: Vec<PermissionType> = permissions.iter().copied().collect();
        let token = self
            .auth_service
            .issue_member_token(&ctx.user, target, &permissions)?;
        Ok(Some(token))
    }

    /// Listagem pré-filtrada pelo tenant do chamador na consulta.
    pub async fn list_members(
        &self,
        requester: &MemberContext,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<MemberWithUser>, AppError> {
        self.member_repo
            .list_by_church(requester.church_id, branch_id)
            .await
    }

    /// Vincula um usuário existente (por e-mail) a uma filial do tenant
    /// do requester.
    pub async fn add_member(
        &self,
        requester: &MemberContext,
        email: &str,
        branch_id: Uuid,
        role: Role,
    ) -> Result<Member, AppError> {
        let branch = self
            .church_repo
            .find_branch(branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;

        // A filial alvo precisa pertencer ao tenant do requester; a
        // decisão passa pelo chokepoint com o alvo explícito.
        access::authorize_member(
            requester,
            Some(&TenantRef::church(branch.church_id)),
            Requirement::Permission(PermissionType::MembersManage),
        )?;

        // Limite do plano: colaborador externo, aqui apenas consultado.
        let member_count = self.member_repo.count_members(requester.church_id).await?;
        if member_count >= self.plan.max_members {
            return Err(AppError::MemberLimitReached);
        }

        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let mut tx = self.pool.begin().await?;
        let member = self
            .member_repo
            .create_member(&mut *tx, user.id, branch.church_id, branch.id, role)
            .await?;
        self.member_repo
            .grant_permissions(&mut *tx, member.id, &[PermissionType::MembersView])
            .await?;
        tx.commit().await?;

        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx_with_role(role: Role, church_id: Uuid) -> MemberContext {
        MemberContext {
            member_id: Uuid::new_v4(),
            role,
            branch_id: Uuid::new_v4(),
            church_id,
            permissions: Vec::new(),
            onboarding_completed: true,
        }
    }

    fn target_member(role: Role, church_id: Uuid) -> Member {
        Member {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            church_id,
            branch_id: Uuid::new_v4(),
            role,
            onboarding_completed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn set(permissions: &[PermissionType]) -> BTreeSet<PermissionType> {
        permissions.iter().copied().collect()
    }

    fn request(slugs: &[&str]) -> Vec<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cross_tenant_grant_is_always_denied() {
        // Independente do role: ADMINGERAL de outra igreja também cai.
        let requester = ctx_with_role(Role::AdminGeral, Uuid::new_v4());
        let target = target_member(Role::Coordinator, Uuid::new_v4());

        let result =
            plan_permission_replace(&requester, &target, &set(&[]), &request(&["events_manage"]));
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn requester_below_adminfilial_cannot_grant() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::Coordinator, church_id);
        let target = target_member(Role::Member, church_id);

        let result =
            plan_permission_replace(&requester, &target, &set(&[]), &request(&["events_manage"]));
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn restricted_grant_to_plain_member_names_rejected_types() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminGeral, church_id);
        let target = target_member(Role::Member, church_id);

        let result = plan_permission_replace(
            &requester,
            &target,
            &set(&[]),
            &request(&["finances_manage", "events_manage"]),
        );
        match result {
            Err(AppError::RestrictedPermissions { role, rejected }) => {
                assert_eq!(role, Role::Member);
                assert_eq!(rejected, vec![PermissionType::FinancesManage]);
            }
            other => panic!("esperava RestrictedPermissions, veio {other:?}"),
        }
    }

    #[test]
    fn unknown_slug_is_rejected_naming_the_value() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminGeral, church_id);
        let target = target_member(Role::Coordinator, church_id);

        let result =
            plan_permission_replace(&requester, &target, &set(&[]), &request(&["finances_admin"]));
        match result {
            Err(AppError::UnknownPermission(slug)) => assert_eq!(slug, "finances_admin"),
            other => panic!("esperava UnknownPermission, veio {other:?}"),
        }
    }

    #[test]
    fn replace_is_full_replace_plus_members_view() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminFilial, church_id);
        let target = target_member(Role::Coordinator, church_id);
        let current = set(&[PermissionType::DevotionalManage, PermissionType::MembersView]);

        let plan =
            plan_permission_replace(&requester, &target, &current, &request(&["events_manage"]))
                .unwrap();

        assert_eq!(
            plan.final_set,
            set(&[PermissionType::EventsManage, PermissionType::MembersView])
        );
        assert_eq!(plan.to_grant, vec![PermissionType::EventsManage]);
        assert_eq!(plan.to_revoke, vec![PermissionType::DevotionalManage]);
    }

    #[test]
    fn downgrade_prunes_to_the_new_role_allowance() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminGeral, church_id);
        let target = target_member(Role::Coordinator, church_id);
        let current = set(&[
            PermissionType::FinancesManage,
            PermissionType::EventsManage,
            PermissionType::MembersView,
        ]);

        let plan = plan_role_change(&requester, &target, &current, Role::Member).unwrap();

        assert!(plan.changed);
        assert_eq!(
            plan.retained,
            set(&[PermissionType::EventsManage, PermissionType::MembersView])
        );
        assert_eq!(plan.to_revoke, vec![PermissionType::FinancesManage]);
    }

    #[test]
    fn members_view_survives_any_downgrade() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminGeral, church_id);
        let target = target_member(Role::AdminFilial, church_id);
        let current = set(&[PermissionType::FinancesManage]);

        let plan = plan_role_change(&requester, &target, &current, Role::Member).unwrap();
        assert!(plan.retained.contains(&PermissionType::MembersView));
        assert!(!plan.to_revoke.contains(&PermissionType::MembersView));
    }

    #[test]
    fn upgrade_preserves_grants_without_adding_any() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminGeral, church_id);
        let target = target_member(Role::Coordinator, church_id);
        let current = set(&[PermissionType::DevotionalManage, PermissionType::MembersView]);

        let plan = plan_role_change(&requester, &target, &current, Role::AdminGeral).unwrap();

        assert!(plan.changed);
        assert_eq!(plan.retained, current);
        assert!(plan.to_revoke.is_empty());
    }

    #[test]
    fn same_role_change_is_an_idempotent_noop() {
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminFilial, church_id);
        let target = target_member(Role::Coordinator, church_id);
        let current = set(&[PermissionType::EventsManage, PermissionType::MembersView]);

        let first = plan_role_change(&requester, &target, &current, Role::Coordinator).unwrap();
        let second = plan_role_change(&requester, &target, &current, Role::Coordinator).unwrap();

        assert!(!first.changed);
        assert_eq!(first, second);
        assert!(first.to_revoke.is_empty());
        assert_eq!(first.retained, current);
    }

    #[test]
    fn elevated_window_grants_do_not_survive_the_round_trip() {
        // COORDINATOR com {devotional, events, members_view} → sobe para
        // ADMINGERAL → desce direto para MEMBER: o conjunto explícito
        // volta exatamente ao original; o acesso implícito da janela
        // elevada não vira concessão.
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminGeral, church_id);
        let mut target = target_member(Role::Coordinator, church_id);
        let granted = set(&[
            PermissionType::DevotionalManage,
            PermissionType::EventsManage,
            PermissionType::MembersView,
        ]);

        let up = plan_role_change(&requester, &target, &granted, Role::AdminGeral).unwrap();
        assert_eq!(up.retained, granted);
        target.role = up.new_role;

        let down = plan_role_change(&requester, &target, &up.retained, Role::Member).unwrap();
        assert_eq!(
            down.retained,
            set(&[
                PermissionType::DevotionalManage,
                PermissionType::EventsManage,
                PermissionType::MembersView,
            ])
        );
    }

    #[test]
    fn finances_grant_succeeds_after_promotion_to_coordinator() {
        // Cenário do fluxo completo: a concessão de finances_manage é
        // rejeitada para MEMBER, o role sobe para COORDINATOR e a mesma
        // concessão passa.
        let church_id = Uuid::new_v4();
        let requester = ctx_with_role(Role::AdminGeral, church_id);
        let mut target = target_member(Role::Member, church_id);
        let current = set(&[PermissionType::MembersView]);

        let denied =
            plan_permission_replace(&requester, &target, &current, &request(&["finances_manage"]));
        assert!(matches!(
            denied,
            Err(AppError::RestrictedPermissions { role: Role::Member, .. })
        ));

        let promotion =
            plan_role_change(&requester, &target, &current, Role::Coordinator).unwrap();
        target.role = promotion.new_role;

        let granted = plan_permission_replace(
            &requester,
            &target,
            &promotion.retained,
            &request(&["finances_manage"]),
        )
        .unwrap();
        assert!(granted.final_set.contains(&PermissionType::FinancesManage));
        assert!(granted.final_set.contains(&PermissionType::MembersView));
    }
}
