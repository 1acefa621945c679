//! Maps an authenticated principal onto the scope that partitions its data.

use crate::utils::auth::Claims;
use serde::Serialize;
use std::fmt;

/// The caller, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub organization_id: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            organization_id: None,
        }
    }

    pub fn in_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            organization_id: claims.org_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    User,
    Organization,
}

/// Tenant partition. A user and an organization sharing an id are distinct scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    id: String,
    kind: ScopeKind,
}

impl Scope {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ScopeKind::User,
        }
    }

    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ScopeKind::Organization,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Kind-qualified key stored in `scope_id` columns, blob key prefixes and change events.
    pub fn partition_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScopeKind::User => write!(f, "user:{}", self.id),
            ScopeKind::Organization => write!(f, "org:{}", self.id),
        }
    }
}

/// Organization scope when acting inside one, else the user's own scope.
/// `None` means unauthenticated; callers must not query with it.
pub fn resolve_scope(principal: Option<&Principal>) -> Option<Scope> {
    let principal = principal?;

    if let Some(org) = principal
        .organization_id
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
    {
        return Some(Scope::organization(org));
    }

    let user = principal.user_id.trim();
    if user.is_empty() {
        return None;
    }
    Some(Scope::user(user))
}
