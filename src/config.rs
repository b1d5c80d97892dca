// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{ChurchRepository, MemberRepository, UserRepository},
    services::{auth::AuthService, church::ChurchService, membership::MembershipService},
};

/// Limites do plano/assinatura. Colaborador externo: este núcleo só
/// consulta os tetos, nunca é dono deles.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub max_branches: i64,
    pub max_members: i64,
}

impl PlanLimits {
    fn from_env() -> Self {
        let max_branches = env::var("PLAN_MAX_BRANCHES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let max_members = env::var("PLAN_MAX_MEMBERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        Self {
            max_branches,
            max_members,
        }
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub church_service: ChurchService,
    pub membership_service: MembershipService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let plan_limits = PlanLimits::from_env();

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let church_repo = ChurchRepository::new(db_pool.clone());
        let member_repo = MemberRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            member_repo.clone(),
            jwt_secret,
            db_pool.clone(),
        );
        let church_service = ChurchService::new(
            church_repo.clone(),
            member_repo.clone(),
            auth_service.clone(),
            plan_limits,
            db_pool.clone(),
        );
        let membership_service = MembershipService::new(
            member_repo,
            user_repo,
            church_repo,
            auth_service.clone(),
            plan_limits,
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            auth_service,
            church_service,
            membership_service,
        })
    }
}
