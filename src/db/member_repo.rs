// src/db/member_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        church::{Member, MemberWithUser},
        rbac::{PermissionType, Role},
    },
};

const MEMBER_COLUMNS: &str =
    "id, user_id, church_id, branch_id, role, onboarding_completed, created_at, updated_at";

#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>, AppError> {
        let maybe_member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_member)
    }

    // Associação do usuário (no modelo atual, no máximo uma por usuário).
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Member>, AppError> {
        let maybe_member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE user_id = $1 ORDER BY created_at LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_member)
    }

    pub async fn create_member<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        church_id: Uuid,
        branch_id: Uuid,
        role: Role,
    ) -> Result<Member, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (user_id, church_id, branch_id, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(church_id)
        .bind(branch_id)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    // Duas associações para o mesmo (igreja, usuário) nunca
                    // coexistem.
                    return match db_err.constraint() {
                        Some("members_church_user_key") | None => AppError::MemberAlreadyExists,
                        Some(constraint) => {
                            AppError::UniqueConstraintViolation(constraint.to_string())
                        }
                    };
                }
            }
            e.into()
        })?;

        Ok(member)
    }

    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        member_id: Uuid,
        role: Role,
    ) -> Result<Member, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE members
            SET role = $2, updated_at = now()
            WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(member_id)
        .bind(role)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::MemberNotFound)?;

        Ok(member)
    }

    pub async fn set_onboarding_completed<'e, E>(
        &self,
        executor: E,
        member_id: Uuid,
    ) -> Result<Member, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE members
            SET onboarding_completed = true, updated_at = now()
            WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(member_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::MemberNotFound)?;

        Ok(member)
    }

    pub async fn count_members(&self, church_id: Uuid) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE church_id = $1")
                .bind(church_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // Pré-filtro de tenant na consulta: o contrato é zero linhas de outra
    // igreja na resposta, nunca filtragem a jusante no handler.
    pub async fn list_by_church(
        &self,
        church_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<MemberWithUser>, AppError> {
        let members = sqlx::query_as::<_, MemberWithUser>(
            r#"
            SELECT m.id, m.user_id, m.branch_id, m.role, u.name, u.email
            FROM members m
            JOIN users u ON u.id = m.user_id
            WHERE m.church_id = $1
              AND ($2::uuid IS NULL OR m.branch_id = $2)
            ORDER BY u.name
            "#,
        )
        .bind(church_id)
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn list_permissions(
        &self,
        member_id: Uuid,
    ) -> Result<Vec<PermissionType>, AppError> {
        let permissions = sqlx::query_scalar::<_, PermissionType>(
            r#"
            SELECT permission
            FROM member_permissions
            WHERE member_id = $1
            ORDER BY permission
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    // Inserção em massa usando UNNEST; concessões repetidas são inofensivas.
    pub async fn grant_permissions<'e, E>(
        &self,
        executor: E,
        member_id: Uuid,
        permissions: &[PermissionType],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slugs: Vec<String> = permissions.iter().map(|p| p.slug().to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO member_permissions (member_id, permission)
            SELECT $1, unnest($2::text[])::permission_type
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(member_id)
        .bind(slugs)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn revoke_permissions<'e, E>(
        &self,
        executor: E,
        member_id: Uuid,
        permissions: &[PermissionType],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slugs: Vec<String> = permissions.iter().map(|p| p.slug().to_string()).collect();

        sqlx::query(
            r#"
            DELETE FROM member_permissions
            WHERE member_id = $1 AND permission::text = ANY($2)
            "#,
        )
        .bind(member_id)
        .bind(slugs)
        .execute(executor)
        .await?;

        Ok(())
    }
}
