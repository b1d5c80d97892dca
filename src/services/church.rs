// src/services/church.rs

//! Criação de igreja/filiais e classificação de onboarding.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::PlanLimits,
    db::{ChurchRepository, MemberRepository},
    models::{
        auth::{MemberContext, RequestContext},
        church::{
            Branch, Church, ChurchCreatedResponse, Member, MyChurchResponse, OnboardingStatus,
            OnboardingStatusResponse,
        },
        rbac::{PermissionType, Role},
    },
    services::auth::AuthService,
};

const MAIN_BRANCH_NAME: &str = "Sede";

/// Classifica o estado derivado de onboarding. Visão somente-leitura:
/// as transições acontecem por escritas externas de progresso.
pub fn classify_onboarding(member: Option<&Member>) -> OnboardingStatus {
    match member {
        None => OnboardingStatus::New,
        Some(m) if m.onboarding_completed => OnboardingStatus::Complete,
        Some(_) => OnboardingStatus::Pending,
    }
}

#[derive(Clone)]
pub struct ChurchService {
    church_repo: ChurchRepository,
    member_repo: MemberRepository,
    auth_service: AuthService,
    plan: PlanLimits,
    pool: PgPool,
}

impl ChurchService {
    pub fn new(
        church_repo: ChurchRepository,
        member_repo: MemberRepository,
        auth_service: AuthService,
        plan: PlanLimits,
        pool: PgPool,
    ) -> Self {
        Self {
            church_repo,
            member_repo,
            auth_service,
            plan,
            pool,
        }
    }

    /// Cria a igreja com a sede e o membro fundador (ADMINGERAL) em uma
    /// transação, e emite o token de membro na mesma resposta.
    ///
    /// Idempotente por criador: repetir a chamada devolve a igreja
    /// existente com um token novo, sem criar linha duplicada.
    pub async fn create_church(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<ChurchCreatedResponse, AppError> {
        if let Some(existing) = self.church_repo.find_by_creator(ctx.user.id).await? {
            let branch = self
                .church_repo
                .find_main_branch(existing.id)
                .await?
                .ok_or(AppError::BranchNotFound)?;
            let member = self
                .member_repo
                .find_by_user(ctx.user.id)
                .await?
                .ok_or(AppError::MemberNotFound)?;
            let permissions = self.member_repo.list_permissions(member.id).await?;
            let token = self
                .auth_service
                .issue_member_token(&ctx.user, &member, &permissions)?;

            return Ok(ChurchCreatedResponse {
                church: existing,
                branch,
                member,
                token,
            });
        }

        let mut tx = self.pool.begin().await?;
        let church = self
            .church_repo
            .create_church(&mut *tx, name, ctx.user.id)
            .await?;
        let branch = self
            .church_repo
            .create_branch(&mut *tx, church.id, MAIN_BRANCH_NAME, true)
            .await?;
        let member = self
            .member_repo
            .create_member(&mut *tx, ctx.user.id, church.id, branch.id, Role::AdminGeral)
            .await?;
        // `members_view` entra como concessão explícita inicial.
        self.member_repo
            .grant_permissions(&mut *tx, member.id, &[PermissionType::MembersView])
            .await?;
        tx.commit().await?;

        tracing::info!("⛪ Igreja '{}' criada por {}", church.name, ctx.user.email);

        let token =
            self.auth_service
                .issue_member_token(&ctx.user, &member, &[PermissionType::MembersView])?;

        Ok(ChurchCreatedResponse {
            church,
            branch,
            member,
            token,
        })
    }

    /// Cria uma filial adicional. O gate de `church_manage` fica na rota;
    /// aqui consultamos o limite do plano (colaborador externo).
    pub async fn create_branch(
        &self,
        requester: &MemberContext,
        name: &str,
    ) -> Result<Branch, AppError> {
        let count = self.church_repo.count_branches(requester.church_id).await?;
        if count >= self.plan.max_branches {
            return Err(AppError::BranchLimitReached);
        }

        let mut tx = self.pool.begin().await?;
        let branch = self
            .church_repo
            .create_branch(&mut *tx, requester.church_id, name, false)
            .await?;
        tx.commit().await?;

        Ok(branch)
    }

    pub async fn list_branches(&self, requester: &MemberContext) -> Result<Vec<Branch>, AppError> {
        self.church_repo.list_branches(requester.church_id).await
    }

    /// Igreja do chamador, sempre resolvida a partir do tenant das claims.
    pub async fn my_church(&self, requester: &MemberContext) -> Result<MyChurchResponse, AppError> {
        let church = self
            .church_repo
            .find_by_id(requester.church_id)
            .await?
            .ok_or(AppError::ChurchNotFound)?;
        let branches = self.church_repo.list_branches(church.id).await?;

        Ok(MyChurchResponse { church, branches })
    }

    pub async fn onboarding_status(
        &self,
        ctx: &RequestContext,
    ) -> Result<OnboardingStatusResponse, AppError> {
        let member = self.member_repo.find_by_user(ctx.user.id).await?;
        let status = classify_onboarding(member.as_ref());

        let (church, branch) = match &member {
            Some(m) => (
                self.church_repo.find_by_id(m.church_id).await?,
                self.church_repo.find_branch(m.branch_id).await?,
            ),
            None => (None, None),
        };

        Ok(OnboardingStatusResponse {
            status,
            church,
            branch,
            member,
        })
    }

    /// Escrita externa de progresso: marca o onboarding como concluído e
    /// reemite o token, já que a claim `onboardingCompleted` muda.
    pub async fn complete_onboarding(
        &self,
        ctx: &RequestContext,
    ) -> Result<(Member, String), AppError> {
        let requester = ctx
            .membership
            .as_ref()
            .ok_or(AppError::IncompleteOnboarding)?;

        let mut tx = self.pool.begin().await?;
        let member = self
            .member_repo
            .set_onboarding_completed(&mut *tx, requester.member_id)
            .await?;
        tx.commit().await?;

        let permissions = self.member_repo.list_permissions(member.id).await?;
        let token = self
            .auth_service
            .issue_member_token(&ctx.user, &member, &permissions)?;

        Ok((member, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn member(onboarding_completed: bool) -> Member {
        Member {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            church_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            role: Role::AdminGeral,
            onboarding_completed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn no_member_classifies_as_new() {
        assert_eq!(classify_onboarding(None), OnboardingStatus::New);
    }

    #[test]
    fn member_without_progress_is_pending() {
        let m = member(false);
        assert_eq!(classify_onboarding(Some(&m)), OnboardingStatus::Pending);
    }

    #[test]
    fn completed_progress_is_complete() {
        let m = member(true);
        assert_eq!(classify_onboarding(Some(&m)), OnboardingStatus::Complete);
    }
}
