/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles stored in `user_roles.role` and carried in JWT claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    UserCra,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::UserCra => "user_cra",
            Role::User => "user",
        }
    }

    /// Parse role strings loaded from the database, skipping unknown values
    pub fn parse_all<I, S>(values: I) -> Vec<Role>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .filter_map(|v| match v.as_ref().parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    tracing::warn!("Ignoring unknown role '{}'", v.as_ref());
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user_cra" => Ok(Role::UserCra),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Whether a request reads or writes a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_and_skips_unknown() {
        let roles = Role::parse_all(["admin", "superuser", "user_cra"]);
        assert_eq!(roles, vec![Role::Admin, Role::UserCra]);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::UserCra).unwrap(), "\"user_cra\"");
    }
}
