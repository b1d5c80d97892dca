// src/services/auth.rs

use std::collections::BTreeSet;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{MemberRepository, UserRepository},
    models::{
        auth::{Claims, MemberContext, RequestContext, TokenKind, User},
        church::Member,
        rbac::PermissionType,
    },
};

const TOKEN_TTL_DAYS: i64 = 7;

fn token_window() -> (usize, usize) {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);
    (now.timestamp() as usize, expires_at.timestamp() as usize)
}

/// Claims de uma sessão apenas-usuário (sem Member): os campos de tenant
/// viajam nulos e sinalizam o contexto incompleto.
pub fn user_claims(user: &User) -> Claims {
    let (iat, exp) = token_window();
    Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        kind: TokenKind::User,
        member_id: None,
        role: None,
        branch_id: None,
        church_id: None,
        permissions: Vec::new(),
        onboarding_completed: false,
        exp,
        iat,
    }
}

/// Claims de uma sessão de membro. As concessões explícitas viajam no
/// token junto com a implícita `members_view`.
pub fn member_claims(user: &User, member: &Member, permissions: &[PermissionType]) -> Claims {
    let mut set: BTreeSet<PermissionType> = permissions.iter().copied().collect();
    set.insert(PermissionType::MembersView);

    let (iat, exp) = token_window();
    Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        kind: TokenKind::Member,
        member_id: Some(member.id),
        role: Some(member.role),
        branch_id: Some(member.branch_id),
        church_id: Some(member.church_id),
        permissions: set.iter().map(|p| p.slug().to_string()).collect(),
        onboarding_completed: member.onboarding_completed,
        exp,
        iat,
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    Ok(encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims)
}

/// Contexto de membro a partir das claims; `None` quando o token é de
/// uma sessão apenas-usuário. Slugs que não existem no catálogo são
/// descartados (tokens são emitidos por nós).
pub fn membership_from_claims(claims: &Claims) -> Option<MemberContext> {
    let member_id = claims.member_id?;
    let role = claims.role?;
    let branch_id = claims.branch_id?;
    let church_id = claims.church_id?;

    Some(MemberContext {
        member_id,
        role,
        branch_id,
        church_id,
        permissions: claims
            .permissions
            .iter()
            .filter_map(|slug| PermissionType::from_slug(slug))
            .collect(),
        onboarding_completed: claims.onboarding_completed,
    })
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    member_repo: MemberRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        member_repo: MemberRepository,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            member_repo,
            jwt_secret,
            pool,
        }
    }

    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        // O hashing fica fora da transação, pois não toca no banco.
        let password_clone = password.to_owned();
        let hashed_password =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let mut tx = self.pool.begin().await?;
        let new_user = self
            .user_repo
            .create_user(&mut *tx, name, email, &hashed_password)
            .await?;
        tx.commit().await?;

        // Recém-registrado nunca tem Member: token de sessão apenas-usuário.
        encode_token(&user_claims(&new_user), &self.jwt_secret)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.issue_token_for(&user).await
    }

    /// Reemite um token refletindo o estado ATUAL de membership do
    /// usuário no banco. A emissão é síncrona com a mutação que a
    /// motivou: quem atualizar o token logo depois já observa o estado novo.
    pub async fn issue_token_for(&self, user: &User) -> Result<String, AppError> {
        let claims = match self.member_repo.find_by_user(user.id).await? {
            Some(member) => {
                let permissions = self.member_repo.list_permissions(member.id).await?;
                member_claims(user, &member, &permissions)
            }
            None => user_claims(user),
        };
        encode_token(&claims, &self.jwt_secret)
    }

    pub fn issue_member_token(
        &self,
        user: &User,
        member: &Member,
        permissions: &[PermissionType],
    ) -> Result<String, AppError> {
        encode_token(&member_claims(user, member, permissions), &self.jwt_secret)
    }

    /// Decodifica o token e resolve o contexto da requisição. As claims
    /// são a fonte do contexto de tenant; o banco só confirma que o
    /// usuário ainda existe.
    pub async fn validate_token(&self, token: &str) -> Result<RequestContext, AppError> {
        let claims = decode_token(token, &self.jwt_secret)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(RequestContext {
            user,
            membership: membership_from_claims(&claims),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::Role;
    use serde_json::{json, Value};
    use uuid::Uuid;

    const SECRET: &str = "segredo-de-teste";

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_member(user_id: Uuid, role: Role) -> Member {
        Member {
            id: Uuid::new_v4(),
            user_id,
            church_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            role,
            onboarding_completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn user_token_round_trip_has_incomplete_context() {
        let user = sample_user();
        let token = encode_token(&user_claims(&user), SECRET).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.kind, TokenKind::User);
        assert!(claims.member_id.is_none());
        assert!(membership_from_claims(&claims).is_none());
    }

    #[test]
    fn member_token_carries_tenant_claims() {
        let user = sample_user();
        let member = sample_member(user.id, Role::Coordinator);
        let token = encode_token(
            &member_claims(&user, &member, &[PermissionType::EventsManage]),
            SECRET,
        )
        .unwrap();
        let claims = decode_token(&token, SECRET).unwrap();

        let ctx = membership_from_claims(&claims).expect("contexto de membro");
        assert_eq!(ctx.member_id, member.id);
        assert_eq!(ctx.role, Role::Coordinator);
        assert_eq!(ctx.church_id, member.church_id);
        assert!(ctx.permissions.contains(&PermissionType::EventsManage));
        // `members_view` é implícita e sempre embarca no token.
        assert!(ctx.permissions.contains(&PermissionType::MembersView));
    }

    #[test]
    fn claims_json_shape_is_stable() {
        // O schema das chaves do token é contrato externo.
        let user = sample_user();
        let member = sample_member(user.id, Role::AdminGeral);

        let value: Value =
            serde_json::to_value(member_claims(&user, &member, &[PermissionType::FinancesManage]))
                .unwrap();
        assert_eq!(value["type"], json!("member"));
        assert_eq!(value["memberId"], json!(member.id));
        assert_eq!(value["branchId"], json!(member.branch_id));
        assert_eq!(value["churchId"], json!(member.church_id));
        assert_eq!(value["role"], json!("ADMINGERAL"));
        assert_eq!(value["onboardingCompleted"], json!(false));
        assert!(value["permissions"]
            .as_array()
            .unwrap()
            .contains(&json!("members_view")));

        let value: Value = serde_json::to_value(user_claims(&user)).unwrap();
        assert_eq!(value["type"], json!("user"));
        assert_eq!(value["memberId"], Value::Null);
        assert_eq!(value["role"], Value::Null);
        assert_eq!(value["branchId"], Value::Null);
        assert_eq!(value["churchId"], Value::Null);
        assert_eq!(value["permissions"], json!([]));
    }

    #[test]
    fn expired_token_is_rejected() {
        let user = sample_user();
        let mut claims = user_claims(&user);
        claims.iat = (Utc::now() - chrono::Duration::hours(3)).timestamp() as usize;
        claims.exp = (Utc::now() - chrono::Duration::hours(2)).timestamp() as usize;

        let token = encode_token(&claims, SECRET).unwrap();
        assert!(matches!(
            decode_token(&token, SECRET),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let user = sample_user();
        let token = encode_token(&user_claims(&user), SECRET).unwrap();
        assert!(matches!(
            decode_token(&token, "outro-segredo"),
            Err(AppError::InvalidToken)
        ));
    }
}
