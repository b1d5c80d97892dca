// src/models/rbac.rs

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Roles de membro, ordenados por rank. A hierarquia é linear:
/// comparações de privilégio usam `rank()`, nunca herança.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "member_role", rename_all = "UPPERCASE")]
pub enum Role {
    Member,
    Coordinator,
    AdminFilial,
    AdminGeral,
}

impl Role {
    /// MEMBER=0, COORDINATOR=1, ADMINFILIAL=2, ADMINGERAL=3.
    pub fn rank(self) -> u8 {
        match self {
            Role::Member => 0,
            Role::Coordinator => 1,
            Role::AdminFilial => 2,
            Role::AdminGeral => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "MEMBER",
            Role::Coordinator => "COORDINATOR",
            Role::AdminFilial => "ADMINFILIAL",
            Role::AdminGeral => "ADMINGERAL",
        }
    }

    /// ADMINFILIAL e ADMINGERAL têm acesso implícito ao catálogo inteiro.
    pub fn implies_full_access(self) -> bool {
        self.rank() >= Role::AdminFilial.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catálogo global de permissões: conjunto fechado de constantes com a
/// flag "exige role elevado", centralizado aqui em vez de strings soltas
/// validadas em cada call site.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "permission_type", rename_all = "snake_case")]
pub enum PermissionType {
    MembersView,
    DevotionalManage,
    EventsManage,
    NoticesManage,
    InvitesManage,
    FinancesManage,
    ContributionsManage,
    MembersManage,
    ChurchManage,
}

impl PermissionType {
    pub const ALL: [PermissionType; 9] = [
        PermissionType::MembersView,
        PermissionType::DevotionalManage,
        PermissionType::EventsManage,
        PermissionType::NoticesManage,
        PermissionType::InvitesManage,
        PermissionType::FinancesManage,
        PermissionType::ContributionsManage,
        PermissionType::MembersManage,
        PermissionType::ChurchManage,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            PermissionType::MembersView => "members_view",
            PermissionType::DevotionalManage => "devotional_manage",
            PermissionType::EventsManage => "events_manage",
            PermissionType::NoticesManage => "notices_manage",
            PermissionType::InvitesManage => "invites_manage",
            PermissionType::FinancesManage => "finances_manage",
            PermissionType::ContributionsManage => "contributions_manage",
            PermissionType::MembersManage => "members_manage",
            PermissionType::ChurchManage => "church_manage",
        }
    }

    /// Slug desconhecido não é mapeado silenciosamente: o call site decide
    /// o erro de entrada, nomeando o valor ofensor.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "members_view" => Some(PermissionType::MembersView),
            "devotional_manage" => Some(PermissionType::DevotionalManage),
            "events_manage" => Some(PermissionType::EventsManage),
            "notices_manage" => Some(PermissionType::NoticesManage),
            "invites_manage" => Some(PermissionType::InvitesManage),
            "finances_manage" => Some(PermissionType::FinancesManage),
            "contributions_manage" => Some(PermissionType::ContributionsManage),
            "members_manage" => Some(PermissionType::MembersManage),
            "church_manage" => Some(PermissionType::ChurchManage),
            _ => None,
        }
    }

    /// Permissões restritas só podem ser atribuídas a membros com role
    /// COORDINATOR ou superior.
    pub fn is_restricted(self) -> bool {
        matches!(
            self,
            PermissionType::FinancesManage
                | PermissionType::ContributionsManage
                | PermissionType::MembersManage
                | PermissionType::ChurchManage
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            PermissionType::MembersView => "Visualizar membros da igreja",
            PermissionType::DevotionalManage => "Gerenciar devocionais",
            PermissionType::EventsManage => "Gerenciar eventos",
            PermissionType::NoticesManage => "Gerenciar avisos",
            PermissionType::InvitesManage => "Gerenciar links de convite",
            PermissionType::FinancesManage => "Gerenciar finanças",
            PermissionType::ContributionsManage => "Gerenciar contribuições",
            PermissionType::MembersManage => "Gerenciar membros",
            PermissionType::ChurchManage => "Gerenciar a igreja e filiais",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Tipos de permissão que PODEM ser concedidos a um membro com o role
/// dado. Função pura e total sobre o enum; `members_view` entra sempre.
pub fn allowed_permissions(role: Role) -> BTreeSet<PermissionType> {
    PermissionType::ALL
        .into_iter()
        .filter(|p| !p.is_restricted() || role.rank() >= Role::Coordinator.rank())
        .collect()
}

// O que sai no catálogo público (para o frontend montar a tela)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCatalogEntry {
    #[schema(example = "finances_manage")]
    pub slug: &'static str,

    pub restricted: bool,

    #[schema(example = "Gerenciar finanças")]
    pub description: &'static str,
}

pub fn permission_catalog() -> Vec<PermissionCatalogEntry> {
    PermissionType::ALL
        .into_iter()
        .map(|p| PermissionCatalogEntry {
            slug: p.slug(),
            restricted: p.is_restricted(),
            description: p.description(),
        })
        .collect()
}

// O payload para trocar o role de um membro
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRolePayload {
    #[schema(example = "COORDINATOR")]
    pub role: Role,
}

// O payload de substituição integral do conjunto de permissões
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplacePermissionsPayload {
    #[schema(example = json!(["events_manage", "finances_manage"]))]
    pub permissions: Vec<String>,
}

// Resposta da troca de role (role novo + conjunto podado/preservado)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeResponse {
    pub role: Role,

    #[schema(example = json!(["events_manage", "members_view"]))]
    pub permissions: Vec<String>,

    // Presente apenas quando o alvo é a própria sessão do requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// Resposta da substituição de permissões
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionReplaceResponse {
    #[schema(example = json!(["events_manage", "members_view"]))]
    pub permissions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 4] = [
        Role::Member,
        Role::Coordinator,
        Role::AdminFilial,
        Role::AdminGeral,
    ];

    #[test]
    fn restricted_types_require_coordinator_or_higher() {
        for role in ROLES {
            let allowed = allowed_permissions(role);
            for permission in PermissionType::ALL {
                if permission.is_restricted() {
                    assert_eq!(
                        allowed.contains(&permission),
                        role.rank() >= Role::Coordinator.rank(),
                        "{role} / {permission}"
                    );
                } else {
                    assert!(allowed.contains(&permission), "{role} / {permission}");
                }
            }
        }
    }

    #[test]
    fn members_view_allowed_for_every_role() {
        for role in ROLES {
            assert!(allowed_permissions(role).contains(&PermissionType::MembersView));
        }
    }

    #[test]
    fn role_rank_is_strictly_increasing() {
        assert!(Role::Member.rank() < Role::Coordinator.rank());
        assert!(Role::Coordinator.rank() < Role::AdminFilial.rank());
        assert!(Role::AdminFilial.rank() < Role::AdminGeral.rank());
    }

    #[test]
    fn only_admins_imply_full_access() {
        assert!(!Role::Member.implies_full_access());
        assert!(!Role::Coordinator.implies_full_access());
        assert!(Role::AdminFilial.implies_full_access());
        assert!(Role::AdminGeral.implies_full_access());
    }

    #[test]
    fn slugs_round_trip() {
        for permission in PermissionType::ALL {
            assert_eq!(PermissionType::from_slug(permission.slug()), Some(permission));
        }
        assert_eq!(PermissionType::from_slug("finances_admin"), None);
        assert_eq!(PermissionType::from_slug(""), None);
    }

    #[test]
    fn role_wire_names_match_the_token_schema() {
        assert_eq!(
            serde_json::to_value(Role::AdminFilial).unwrap(),
            serde_json::json!("ADMINFILIAL")
        );
        assert_eq!(
            serde_json::to_value(Role::Member).unwrap(),
            serde_json::json!("MEMBER")
        );
        assert_eq!(
            serde_json::from_value::<Role>(serde_json::json!("ADMINGERAL")).unwrap(),
            Role::AdminGeral
        );
    }
}
