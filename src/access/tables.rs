use super::{ColumnDef, ColumnType as T, Grant, OwnerScope, TableDef};
use crate::types::Role;

macro_rules! columns {
    ($($name:literal: $ty:ident),* $(,)?) => {
        &[$(ColumnDef { name: $name, ty: T::$ty }),*]
    };
}

const ANYONE: &[Grant] = &[Grant::Anyone];
const ADMIN: &[Grant] = &[Grant::Role(Role::Admin)];
const ADMIN_CRA: &[Grant] = &[Grant::Role(Role::Admin), Grant::Role(Role::UserCra)];
const ADMIN_CRA_SELF: &[Grant] = &[Grant::Role(Role::Admin), Grant::Role(Role::UserCra), Grant::Owner];
const ADMIN_SELF: &[Grant] = &[Grant::Role(Role::Admin), Grant::Owner];
const ADMIN_CRA_OWN: &[Grant] = &[Grant::Role(Role::Admin), Grant::Own(Role::UserCra)];
const NONE: &[Grant] = &[];

const DRAFT_REPORT: &str =
    "\"cra_report_id\" IN (SELECT \"id\" FROM \"cra_reports\" WHERE \"status\" = 'draft')";

pub static TABLES: &[TableDef] = &[
    TableDef {
        name: "jobs",
        columns: columns![
            "id": Uuid, "title": Text, "slug": Text, "description_html": Text,
            "contract_type": Text, "location": Text, "domain": Text, "experience": Text,
            "salary": Text, "status": Text, "featured": Boolean,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ANYONE,
        write: ADMIN,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "trainings",
        columns: columns![
            "id": Uuid, "title": Text, "slug": Text, "modality": Text, "category_id": Uuid,
            "duration_hours": Integer, "price": Numeric, "description_html": Text,
            "goals_html": Text, "program_html": Text, "prerequisites_html": Text,
            "audience_html": Text, "status": Text, "featured": Boolean,
            "published_at": Timestamp, "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ANYONE,
        write: ADMIN,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "categories",
        columns: columns![
            "id": Uuid, "name": Text, "slug": Text, "type": Text,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ANYONE,
        write: ADMIN,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "applications",
        columns: columns![
            "id": Uuid, "job_id": Uuid, "name": Text, "email": Text, "phone": Text,
            "message": Text, "cv_url": Text, "status": Text,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN,
        write: ANYONE,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "training_leads",
        columns: columns![
            "id": Uuid, "training_id": Uuid, "name": Text, "email": Text, "phone": Text,
            "company": Text, "message": Text, "status": Text,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN,
        write: ANYONE,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "contact_messages",
        columns: columns![
            "id": Uuid, "name": Text, "email": Text, "phone": Text, "subject": Text,
            "message": Text, "status": Text, "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN,
        write: ANYONE,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "profiles",
        columns: columns![
            "id": Uuid, "email": Text, "full_name": Text, "phone": Text,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN_CRA_SELF,
        write: ADMIN_SELF,
        owner: Some(OwnerScope::Column("id")),
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "user_roles",
        columns: columns!["id": Uuid, "user_id": Uuid, "role": Text, "created_at": Timestamp],
        read: ADMIN_CRA_SELF,
        write: ADMIN,
        owner: Some(OwnerScope::Column("user_id")),
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "user_invitations",
        columns: columns![
            "id": Uuid, "email": Text, "first_name": Text, "last_name": Text,
            "status": Text, "expires_at": Timestamp, "invited_by": Uuid, "accepted_at": Timestamp,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        // The token is issued by the invitation service only
        read: ANYONE,
        write: ADMIN,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "clients",
        columns: columns![
            "id": Uuid, "name": Text, "contact_email": Text, "contact_name": Text,
            "address": Text, "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN_CRA,
        write: ADMIN,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "client_validators",
        columns: columns![
            "id": Uuid, "client_id": Uuid, "name": Text, "email": Text,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN,
        write: ADMIN,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "user_client_assignments",
        columns: columns![
            "id": Uuid, "user_id": Uuid, "client_id": Uuid, "mission_name": Text,
            "default_validator_id": Uuid, "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN_CRA,
        write: ADMIN,
        owner: None,
        owner_guard: None,
        owner_locked: &[],
    },
    TableDef {
        name: "cra_reports",
        columns: columns![
            "id": Uuid, "user_id": Uuid, "month": Text, "client_id": Uuid, "company_name": Text,
            "worked_days": Numeric, "absent_days": Numeric, "monthly_comment": Text,
            "admin_comment": Text, "status": Text, "client_email": Text,
            "client_validation_status": Text, "token_expires_at": Timestamp,
            "validated_at": Timestamp, "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN_CRA_OWN,
        write: ADMIN_CRA_OWN,
        owner: Some(OwnerScope::Column("user_id")),
        owner_guard: Some("\"status\" = 'draft'"),
        owner_locked: &[
            "status", "client_validation_status", "validated_at", "token_expires_at",
            "admin_comment", "client_email",
        ],
    },
    TableDef {
        name: "cra_day_details",
        columns: columns![
            "id": Uuid, "cra_report_id": Uuid, "date": Date, "state": Text, "comment": Text,
            "created_at": Timestamp, "updated_at": Timestamp,
        ],
        read: ADMIN_CRA_OWN,
        write: ADMIN_CRA_OWN,
        owner: Some(OwnerScope::CraReport),
        owner_guard: Some(DRAFT_REPORT),
        owner_locked: &[],
    },
    TableDef {
        name: "otp_codes",
        columns: columns![
            "id": Uuid, "user_id": Uuid, "code": Text, "used": Boolean,
            "expires_at": Timestamp, "created_at": Timestamp,
        ],
        read: NONE,
        write: NONE,
        owner: Some(OwnerScope::Column("user_id")),
        owner_guard: None,
        owner_locked: &[],
    },
];

pub fn lookup(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}
