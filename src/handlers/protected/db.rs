// handlers/protected/db.rs - generic table passthrough
//
// ALL /api/db/:table. The query string becomes a Filter over a registered
// table, the caller's grants resolve to a Scope, and owner-scoped callers get
// an extra WHERE condition plus owner checks on written rows. Owner-scoped
// writes also stay on draft reports and away from workflow columns.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::Method,
    Extension,
};
use serde_json::{json, Map, Value};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::access::{OwnerScope, Scope, TableDef};
use crate::database::query_builder;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::types::AccessMode;

fn access_mode(method: &Method) -> Result<AccessMode, ApiError> {
    match *method {
        Method::GET => Ok(AccessMode::Read),
        Method::POST | Method::PATCH | Method::DELETE => Ok(AccessMode::Write),
        _ => Err(ApiError::method_not_allowed("Méthode non supportée")),
    }
}

fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Corps JSON requis"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_json(e.to_string()))
}

fn forbidden(user: &AuthUser, table: &str) -> ApiError {
    tracing::warn!("User {} denied on table {}", user.id, table);
    ApiError::forbidden("Accès refusé")
}

/// Owner-scoped writers may not set workflow or admin columns
fn check_locked(user: &AuthUser, table: &TableDef, row: &Map<String, Value>) -> Result<(), ApiError> {
    match table.locked_key(row.keys()) {
        Some(key) => {
            tracing::warn!("User {} tried to set {}.{}", user.id, table.name, key);
            Err(ApiError::forbidden("Accès refusé"))
        }
        None => Ok(()),
    }
}

/// Whether the caller owns the report a day row points at, and it is still a draft
async fn owns_draft_report(conn: &mut PgConnection, report: Option<&Value>, user_id: Uuid) -> Result<bool, ApiError> {
    let Some(report_id) = report.and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok()) else {
        return Ok(false);
    };
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM cra_reports WHERE id = $1 AND user_id = $2 AND status = 'draft')",
    )
    .bind(report_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(owned)
}

/// Owner rule for a row about to be inserted; fills the owner column when absent
async fn claim_row(
    conn: &mut PgConnection,
    row: &mut Map<String, Value>,
    owner: OwnerScope,
    user_id: Uuid,
) -> Result<bool, ApiError> {
    match owner {
        OwnerScope::Column(column) => match row.get(column) {
            None | Some(Value::Null) => {
                row.insert(column.to_string(), json!(user_id));
                Ok(true)
            }
            Some(value) => Ok(value.as_str() == Some(user_id.to_string().as_str())),
        },
        OwnerScope::CraReport => owns_draft_report(conn, row.get("cra_report_id"), user_id).await,
    }
}

/// Owner rule for PATCH bodies: the owner link may not move to someone else
async fn may_patch(
    conn: &mut PgConnection,
    body: &Map<String, Value>,
    owner: OwnerScope,
    user_id: Uuid,
) -> Result<bool, ApiError> {
    match owner {
        OwnerScope::Column(column) => Ok(match body.get(column) {
            None => true,
            Some(value) => value.as_str() == Some(user_id.to_string().as_str()),
        }),
        OwnerScope::CraReport => match body.get("cra_report_id") {
            None => Ok(true),
            Some(report) => owns_draft_report(conn, Some(report), user_id).await,
        },
    }
}

/**
 * ALL /api/db/:table
 *
 * - GET: rows matching the filter
 * - POST: one object or an array of objects, in one transaction (201)
 * - PATCH: filtered update, answers the first updated row or null
 * - DELETE: filtered delete, answers `{deleted}`
 */
pub async fn handle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(table): Path<String>,
    method: Method,
    RawQuery(raw_query): RawQuery,
    body: Bytes,
) -> ApiResult<Value> {
    let pairs = query_pairs(raw_query.as_deref());
    let filter = Filter::from_query(&table, &pairs, state.config.filter.max_limit)?;
    let mode = access_mode(&method)?;

    let scope = filter.table().resolve(&user, mode);
    if scope == Scope::Forbidden {
        return Err(forbidden(&user, &table));
    }
    let owner = scope.owner();

    if state.config.filter.debug_logging {
        tracing::debug!("{} /api/db/{} as {} with {:?}", method, table, user.id, filter.data());
    }

    match method {
        Method::GET => {
            let sql = filter.to_select_sql(owner);
            let rows = query_builder::fetch_json_rows(&state.pool, &sql).await?;
            Ok(ApiResponse::success(Value::Array(rows)))
        }
        Method::POST => {
            let (rows, single) = match json_body(&body)? {
                Value::Object(row) => (vec![row], true),
                Value::Array(items) => {
                    let rows = items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(row) => Ok(row),
                            _ => Err(ApiError::bad_request("Objet JSON attendu")),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    (rows, false)
                }
                _ => return Err(ApiError::bad_request("Objet JSON attendu")),
            };

            if owner.is_some() {
                for row in &rows {
                    check_locked(&user, filter.table(), row)?;
                }
            }

            let mut tx = state.pool.begin().await?;
            let mut inserted = Vec::with_capacity(rows.len());
            for mut row in rows {
                if let Some((scope, user_id)) = owner {
                    if !claim_row(&mut tx, &mut row, scope, user_id).await? {
                        return Err(forbidden(&user, &table));
                    }
                }
                let sql = filter.to_insert_sql(&row)?;
                inserted.push(query_builder::fetch_json_one(&mut *tx, &sql).await?);
            }
            tx.commit().await?;

            tracing::info!("Inserted {} row(s) into {}", inserted.len(), table);
            let data = if single {
                inserted.into_iter().next().unwrap_or(Value::Null)
            } else {
                Value::Array(inserted)
            };
            Ok(ApiResponse::created(data))
        }
        Method::PATCH => {
            let Value::Object(changes) = json_body(&body)? else {
                return Err(ApiError::bad_request("Objet JSON attendu"));
            };
            let sql = filter.to_update_sql(&changes, owner)?;
            if owner.is_some() {
                check_locked(&user, filter.table(), &changes)?;
            }

            let mut conn = state.pool.acquire().await?;
            if let Some((scope, user_id)) = owner {
                if !may_patch(&mut conn, &changes, scope, user_id).await? {
                    return Err(forbidden(&user, &table));
                }
            }
            let rows = query_builder::fetch_json_rows(&mut *conn, &sql).await?;
            Ok(ApiResponse::success(rows.into_iter().next().unwrap_or(Value::Null)))
        }
        Method::DELETE => {
            let sql = filter.to_delete_sql(owner)?;
            let deleted = query_builder::execute(&state.pool, &sql).await?;
            tracing::info!("Deleted {} row(s) from {}", deleted, table);
            Ok(ApiResponse::success(json!({ "deleted": deleted })))
        }
        _ => Err(ApiError::method_not_allowed("Méthode non supportée")),
    }
}
