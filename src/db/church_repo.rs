// src/db/church_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::church::{Branch, Church},
};

#[derive(Clone)]
pub struct ChurchRepository {
    pool: PgPool,
}

impl ChurchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sonda de idempotência: a igreja de um fundador, se já existir.
    pub async fn find_by_creator(&self, user_id: Uuid) -> Result<Option<Church>, AppError> {
        let maybe_church = sqlx::query_as::<_, Church>(
            r#"
            SELECT id, name, created_by_user_id, created_at, updated_at
            FROM churches
            WHERE created_by_user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_church)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Church>, AppError> {
        let maybe_church = sqlx::query_as::<_, Church>(
            r#"
            SELECT id, name, created_by_user_id, created_at, updated_at
            FROM churches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_church)
    }

    pub async fn create_church<'e, E>(
        &self,
        executor: E,
        name: &str,
        created_by_user_id: Uuid,
    ) -> Result<Church, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let church = sqlx::query_as::<_, Church>(
            r#"
            INSERT INTO churches (name, created_by_user_id)
            VALUES ($1, $2)
            RETURNING id, name, created_by_user_id, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(created_by_user_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    if let Some(constraint) = db_err.constraint() {
                        return AppError::UniqueConstraintViolation(constraint.to_string());
                    }
                }
            }
            e.into()
        })?;

        Ok(church)
    }

    pub async fn create_branch<'e, E>(
        &self,
        executor: E,
        church_id: Uuid,
        name: &str,
        is_main_branch: bool,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (church_id, name, is_main_branch)
            VALUES ($1, $2, $3)
            RETURNING id, church_id, name, is_main_branch, created_at, updated_at
            "#,
        )
        .bind(church_id)
        .bind(name)
        .bind(is_main_branch)
        .fetch_one(executor)
        .await?;

        Ok(branch)
    }

    pub async fn find_branch(&self, branch_id: Uuid) -> Result<Option<Branch>, AppError> {
        let maybe_branch = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, church_id, name, is_main_branch, created_at, updated_at
            FROM branches
            WHERE id = $1
            "#,
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_branch)
    }

    pub async fn find_main_branch(&self, church_id: Uuid) -> Result<Option<Branch>, AppError> {
        let maybe_branch = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, church_id, name, is_main_branch, created_at, updated_at
            FROM branches
            WHERE church_id = $1 AND is_main_branch
            "#,
        )
        .bind(church_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_branch)
    }

    // Listagem sempre filtrada pelo tenant na própria consulta: nenhuma
    // linha de outra igreja chega ao handler.
    pub async fn list_branches(&self, church_id: Uuid) -> Result<Vec<Branch>, AppError> {
        let branches = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, church_id, name, is_main_branch, created_at, updated_at
            FROM branches
            WHERE church_id = $1
            ORDER BY is_main_branch DESC, name
            "#,
        )
        .bind(church_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(branches)
    }

    pub async fn count_branches(&self, church_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM branches WHERE church_id = $1",
        )
        .bind(church_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
