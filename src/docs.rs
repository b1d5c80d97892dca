// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Onboarding ---
        handlers::church::onboarding_status,
        handlers::church::complete_onboarding,

        // --- Igrejas ---
        handlers::church::create_church,
        handlers::church::my_church,
        handlers::church::create_branch,
        handlers::church::list_branches,

        // --- Membros ---
        handlers::members::list_members,
        handlers::members::add_member,

        // --- RBAC ---
        handlers::rbac::change_role,
        handlers::rbac::replace_permissions,
        handlers::rbac::list_permissions,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::TokenKind,

            // --- Igrejas ---
            models::church::Church,
            models::church::Branch,
            models::church::Member,
            models::church::MemberWithUser,
            models::church::OnboardingStatus,
            models::church::OnboardingStatusResponse,
            models::church::OnboardingCompletedResponse,
            models::church::ChurchCreatedResponse,
            models::church::MyChurchResponse,
            models::church::CreateChurchPayload,
            models::church::CreateBranchPayload,
            models::church::AddMemberPayload,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::PermissionType,
            models::rbac::PermissionCatalogEntry,
            models::rbac::ChangeRolePayload,
            models::rbac::ReplacePermissionsPayload,
            models::rbac::RoleChangeResponse,
            models::rbac::PermissionReplaceResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Onboarding", description = "Estado de entrada do usuário na igreja"),
        (name = "Igrejas", description = "Gestão da Igreja e Filiais"),
        (name = "Membros", description = "Gestão de Membros do Tenant"),
        (name = "RBAC", description = "Controle de Acesso (Roles e Permissões)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
