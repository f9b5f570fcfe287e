//! Table registry and grant resolution for the generic `/api/db/:table` endpoint.
//!
//! Every table reachable through the generic endpoint is declared in
//! [`tables::TABLES`] with its columns (used to validate filter keys and body
//! keys) and the grants for reading and writing. A request resolves to a
//! [`Scope`]: every row, only the caller's rows, or nothing.

pub mod tables;

use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::types::{AccessMode, Role};

pub use tables::{lookup, TABLES};

/// SQL type of a registered column, used to cast text parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    Integer,
    Numeric,
    Boolean,
    Timestamp,
    Date,
}

impl ColumnType {
    pub fn sql_cast(&self) -> &'static str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Numeric => "numeric",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamptz",
            ColumnType::Date => "date",
        }
    }
}

#[derive(Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
}

/// One entry of a table allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Any authenticated user, every row
    Anyone,
    /// Holders of the role, every row
    Role(Role),
    /// Holders of the role, restricted to rows they own
    Own(Role),
    /// Any authenticated user, restricted to rows they own ("self")
    Owner,
}

/// How a row is tied to its owning user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// The column holds the owner's user id
    Column(&'static str),
    /// Day rows belong to whoever owns the parent report
    CraReport,
}

impl OwnerScope {
    /// Condition restricting rows to `$<index>` as owner
    pub fn condition(&self, param_index: usize) -> String {
        match self {
            OwnerScope::Column(column) => format!("\"{}\" = ${}::uuid", column, param_index),
            OwnerScope::CraReport => format!(
                "\"cra_report_id\" IN (SELECT \"id\" FROM \"cra_reports\" WHERE \"user_id\" = ${}::uuid)",
                param_index
            ),
        }
    }
}

#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub read: &'static [Grant],
    pub write: &'static [Grant],
    pub owner: Option<OwnerScope>,
    /// Extra condition on rows an owner-scoped caller may change
    pub owner_guard: Option<&'static str>,
    /// Columns only an unscoped writer may set
    pub owner_locked: &'static [&'static str],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// First body key an owner-scoped caller may not write
    pub fn locked_key<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> Option<&'a str> {
        keys.into_iter()
            .map(String::as_str)
            .find(|key| self.owner_locked.contains(key))
    }

    pub fn grants(&self, mode: AccessMode) -> &'static [Grant] {
        match mode {
            AccessMode::Read => self.read,
            AccessMode::Write => self.write,
        }
    }

    /// Resolve the caller's scope; the widest matching grant wins
    pub fn resolve(&self, user: &AuthUser, mode: AccessMode) -> Scope {
        let mut scope = Scope::Forbidden;
        for grant in self.grants(mode) {
            let granted = match grant {
                Grant::Anyone => Scope::All,
                Grant::Role(role) if user.has_role(*role) => Scope::All,
                Grant::Own(role) if user.has_role(*role) => self.own_scope(user.id),
                Grant::Owner => self.own_scope(user.id),
                _ => Scope::Forbidden,
            };
            scope = scope.widen(granted);
            if scope == Scope::All {
                break;
            }
        }
        scope
    }

    fn own_scope(&self, user_id: Uuid) -> Scope {
        match self.owner {
            Some(owner) => Scope::Own { owner, user_id },
            None => Scope::Forbidden,
        }
    }
}

/// Result of grant resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Own { owner: OwnerScope, user_id: Uuid },
    Forbidden,
}

impl Scope {
    /// Owner restriction to apply, if any
    pub fn owner(&self) -> Option<(OwnerScope, Uuid)> {
        match self {
            Scope::Own { owner, user_id } => Some((*owner, *user_id)),
            _ => None,
        }
    }

    fn widen(self, other: Scope) -> Scope {
        match (self, other) {
            (Scope::All, _) | (_, Scope::All) => Scope::All,
            (own @ Scope::Own { .. }, _) | (_, own @ Scope::Own { .. }) => own,
            _ => Scope::Forbidden,
        }
    }
}
