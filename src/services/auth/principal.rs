use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse-grained role carried in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err("role must be one of: admin, user"),
        }
    }
}

/// The authenticated caller of a request.
///
/// Produced by the token service when an access token validates and attached to the
/// request context by the auth stage. `issued_at` has second precision because it is
/// read back from the token's `iat` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: Uuid,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(subject_id: Uuid, role: Role, issued_at: DateTime<Utc>) -> Self {
        Self {
            subject_id,
            role,
            issued_at,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Admins may act on any user; everyone else only on themselves.
    pub fn can_act_on(&self, user_id: Uuid) -> bool {
        self.is_admin() || self.subject_id == user_id
    }
}
