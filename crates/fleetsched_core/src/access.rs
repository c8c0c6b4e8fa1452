//! Authorization gate for scheduling mutations.
//!
//! # Responsibility
//! - Model the acting identity supplied by the outer auth layer.
//! - Deny scheduling calls from non-elevated roles before any load.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Role carried by an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Supervisor,
    Tester,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Supervisor => "supervisor",
            Self::Tester => "tester",
            Self::Viewer => "viewer",
        }
    }

    /// Parses one role from its stable string id.
    pub fn parse(value: &str) -> Result<Self, AccessError> {
        match value.trim() {
            "admin" => Ok(Self::Admin),
            "supervisor" => Ok(Self::Supervisor),
            "tester" => Ok(Self::Tester),
            "viewer" => Ok(Self::Viewer),
            other => Err(AccessError::UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Caller role is not allowed to schedule.
    Forbidden { user_id: String, role: Role },
    /// Role string does not name a known role.
    UnknownRole(String),
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden { user_id, role } => write!(
                f,
                "user `{user_id}` with role `{}` may not change assignments",
                role.as_str()
            ),
            Self::UnknownRole(value) => write!(f, "unknown role: `{value}`"),
        }
    }
}

impl Error for AccessError {}

/// Checks that `actor` holds one of `allowed` roles. Deny by default.
pub fn require_role(actor: &Actor, allowed: &[Role]) -> Result<(), AccessError> {
    if allowed.contains(&actor.role) {
        return Ok(());
    }
    Err(AccessError::Forbidden {
        user_id: actor.user_id.clone(),
        role: actor.role,
    })
}

#[cfg(test)]
mod tests {
    use super::{require_role, AccessError, Actor, Role};

    #[test]
    fn denies_roles_outside_allow_list() {
        let actor = Actor::new("qa-7", Role::Tester);
        let err = require_role(&actor, &[Role::Admin, Role::Supervisor])
            .expect_err("tester must be denied");
        assert!(matches!(err, AccessError::Forbidden { role: Role::Tester, .. }));
    }

    #[test]
    fn empty_allow_list_denies_everyone() {
        let actor = Actor::new("root", Role::Admin);
        assert!(require_role(&actor, &[]).is_err());
    }

    #[test]
    fn parses_roles_and_rejects_unknown() {
        assert_eq!(Role::parse(" supervisor ").expect("parse"), Role::Supervisor);
        assert_eq!(
            Role::parse("owner"),
            Err(AccessError::UnknownRole("owner".to_string()))
        );
    }
}
