use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOp, FilterWhereInfo, SqlResult};
use crate::access::{self, OwnerScope, TableDef};

/// Query-string filter bound to one registered table
#[derive(Debug)]
pub struct Filter {
    table: &'static TableDef,
    data: FilterData,
}

impl Filter {
    pub fn new(table_name: &str) -> Result<Self, FilterError> {
        let table = access::lookup(table_name)
            .ok_or_else(|| FilterError::TableNotAllowed(table_name.to_string()))?;
        Ok(Self {
            table,
            data: FilterData::default(),
        })
    }

    /// Build from the ordered query-string pairs of a request.
    /// `select`, `order`, `limit` and `offset` are reserved; any other key is
    /// a filter when its value matches an operator pattern.
    pub fn from_query(
        table_name: &str,
        pairs: &[(String, String)],
        max_limit: Option<i64>,
    ) -> Result<Self, FilterError> {
        let mut filter = Self::new(table_name)?;
        for (key, value) in pairs {
            match key.as_str() {
                "select" => filter.select(value)?,
                "order" => filter.order(value)?,
                "limit" => filter.limit(value, max_limit)?,
                "offset" => filter.offset(value)?,
                _ => filter.where_pair(key, value)?,
            };
        }
        Ok(filter)
    }

    pub fn table(&self) -> &'static TableDef {
        self.table
    }

    pub fn data(&self) -> &FilterData {
        &self.data
    }

    pub fn has_conditions(&self) -> bool {
        !self.data.conditions.is_empty()
    }

    fn where_pair(&mut self, key: &str, value: &str) -> Result<&mut Self, FilterError> {
        let Some((operator, values)) = FilterOp::parse(value) else {
            return Ok(self);
        };
        let column = self.column(key)?;
        self.data.conditions.push(FilterWhereInfo {
            column,
            operator,
            values,
        });
        Ok(self)
    }

    fn select(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let mut columns = Vec::new();
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part == "*" {
                self.data.select = None;
                return Ok(self);
            }
            columns.push(self.column(part)?);
        }
        self.data.select = if columns.is_empty() { None } else { Some(columns) };
        Ok(self)
    }

    fn order(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        if let Some(info) = FilterOrder::parse(value) {
            if !self.table.has_column(&info.column) {
                return Err(FilterError::UnknownColumn(info.column));
            }
            self.data.order = Some(info);
        }
        Ok(self)
    }

    fn limit(&mut self, value: &str, max_limit: Option<i64>) -> Result<&mut Self, FilterError> {
        let limit: i64 = value
            .trim()
            .parse()
            .map_err(|_| FilterError::InvalidLimit(value.to_string()))?;
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }

        // Apply max limit from config
        let applied_limit = match max_limit {
            Some(max) if limit > max => {
                tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max);
                max
            }
            _ => limit,
        };

        self.data.limit = Some(applied_limit);
        Ok(self)
    }

    fn offset(&mut self, value: &str) -> Result<&mut Self, FilterError> {
        let offset: i64 = value
            .trim()
            .parse()
            .map_err(|_| FilterError::InvalidOffset(value.to_string()))?;
        if offset < 0 {
            return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
        }
        self.data.offset = Some(offset);
        Ok(self)
    }

    /// Sanitize to `[a-zA-Z0-9_]` and require a registered column
    fn column(&self, raw: &str) -> Result<String, FilterError> {
        let sanitized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if sanitized.is_empty() || !self.table.has_column(&sanitized) {
            return Err(FilterError::UnknownColumn(raw.to_string()));
        }
        Ok(sanitized)
    }

    pub fn to_select_sql(&self, owner: Option<(OwnerScope, Uuid)>) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(self.table, &self.data.conditions, 0, owner);
        let columns: Vec<&str> = match &self.data.select {
            Some(cols) => cols.iter().map(String::as_str).collect(),
            None => self.table.columns.iter().map(|c| c.name).collect(),
        };

        let query = [
            format!("SELECT {}", json_projection(&columns)),
            format!("FROM \"{}\"", self.table.name),
            where_clause,
            FilterOrder::generate(self.data.order.as_ref()),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    /// SET parameters come first; filter parameters are renumbered after them
    pub fn to_update_sql(
        &self,
        body: &Map<String, Value>,
        owner: Option<(OwnerScope, Uuid)>,
    ) -> Result<SqlResult, FilterError> {
        if !self.has_conditions() {
            return Err(FilterError::MissingFilter("PATCH"));
        }

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (key, value) in body {
            let column = self.body_column(key)?;
            params.push(json_param(value));
            assignments.push(format!("\"{}\" = ${}::{}", column.name, params.len(), column.ty.sql_cast()));
        }
        if self.table.has_column("updated_at") && !body.contains_key("updated_at") {
            assignments.push("\"updated_at\" = NOW()".to_string());
        }
        if assignments.is_empty() {
            return Err(FilterError::InvalidBody("No columns to update".to_string()));
        }

        let (where_clause, where_params) =
            FilterWhere::generate_write(self.table, &self.data.conditions, params.len(), owner);
        params.extend(where_params);

        let query = format!(
            "WITH t AS (UPDATE \"{}\" SET {} {} RETURNING *) SELECT {} FROM t",
            self.table.name,
            assignments.join(", "),
            where_clause,
            self.returning_projection()
        );
        Ok(SqlResult { query, params })
    }

    pub fn to_delete_sql(&self, owner: Option<(OwnerScope, Uuid)>) -> Result<SqlResult, FilterError> {
        if !self.has_conditions() {
            return Err(FilterError::MissingFilter("DELETE"));
        }
        let (where_clause, params) = FilterWhere::generate_write(self.table, &self.data.conditions, 0, owner);
        let query = format!("DELETE FROM \"{}\" {}", self.table.name, where_clause);
        Ok(SqlResult { query, params })
    }

    /// Single-row INSERT returning the stored row as JSON
    pub fn to_insert_sql(&self, row: &Map<String, Value>) -> Result<SqlResult, FilterError> {
        let mut columns = Vec::new();
        let mut placeholders = Vec::new();
        let mut params = Vec::new();
        for (key, value) in row {
            let column = self.body_column(key)?;
            params.push(json_param(value));
            columns.push(format!("\"{}\"", column.name));
            placeholders.push(format!("${}::{}", params.len(), column.ty.sql_cast()));
        }

        let insert = if columns.is_empty() {
            format!("INSERT INTO \"{}\" DEFAULT VALUES", self.table.name)
        } else {
            format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                self.table.name,
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        let query = format!(
            "WITH t AS ({} RETURNING *) SELECT {} FROM t",
            insert,
            self.returning_projection()
        );
        Ok(SqlResult { query, params })
    }

    /// Body keys must name registered columns exactly
    fn body_column(&self, key: &str) -> Result<&'static access::ColumnDef, FilterError> {
        self.table
            .column(key)
            .ok_or_else(|| FilterError::UnknownColumn(key.to_string()))
    }

    fn returning_projection(&self) -> String {
        let columns: Vec<&str> = self.table.columns.iter().map(|c| c.name).collect();
        json_projection(&columns)
    }

    fn build_limit_clause(&self) -> String {
        match (self.data.limit, self.data.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

/// Only registered columns leave the database, so secrets such as the CRA
/// validation token are never returned.
fn json_projection(columns: &[&str]) -> String {
    let pairs: Vec<String> = columns
        .iter()
        .map(|c| format!("'{}', \"{}\"", c, c))
        .collect();
    format!("json_build_object({})", pairs.join(", "))
}

/// JSON body value as a text parameter; the SQL side casts it
pub fn json_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn unknown_table_is_not_allowed() {
        assert!(matches!(Filter::new("users"), Err(FilterError::TableNotAllowed(_))));
        assert!(matches!(Filter::new("pg_shadow"), Err(FilterError::TableNotAllowed(_))));
    }

    #[test]
    fn select_with_filters_order_and_limit() {
        let filter = Filter::from_query(
            "jobs",
            &pairs(&[("status", "eq.published"), ("order", "created_at:desc"), ("limit", "10")]),
            Some(100),
        )
        .unwrap();
        let sql = filter.to_select_sql(None);
        assert!(sql.query.starts_with("SELECT json_build_object('id', \"id\""));
        assert!(sql.query.ends_with(
            "FROM \"jobs\" WHERE \"status\"::text = $1 ORDER BY \"created_at\" DESC LIMIT 10"
        ));
        assert_eq!(sql.params, vec![Some("published".to_string())]);
    }

    #[test]
    fn reserved_and_unmatched_keys_are_ignored() {
        let filter = Filter::from_query(
            "jobs",
            &pairs(&[("status", "published"), ("featured", "eq.true"), ("order", "sideways")]),
            None,
        )
        .unwrap();
        assert_eq!(filter.data().conditions.len(), 1);
        assert!(filter.data().order.is_none());
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = Filter::from_query("jobs", &pairs(&[("password", "eq.x")]), None).unwrap_err();
        assert!(matches!(err, FilterError::UnknownColumn(_)));

        let err = Filter::from_query("jobs", &pairs(&[("select", "id,secret")]), None).unwrap_err();
        assert!(matches!(err, FilterError::UnknownColumn(_)));
    }

    #[test]
    fn column_names_are_sanitized() {
        let filter = Filter::from_query("jobs", &pairs(&[("sta\"tus;", "eq.x")]), None).unwrap();
        assert_eq!(filter.data().conditions[0].column, "status");
    }

    #[test]
    fn limit_is_capped_and_offset_applied() {
        let filter =
            Filter::from_query("jobs", &pairs(&[("limit", "5000"), ("offset", "20")]), Some(500)).unwrap();
        assert!(filter.to_select_sql(None).query.ends_with("LIMIT 500 OFFSET 20"));

        assert!(matches!(
            Filter::from_query("jobs", &pairs(&[("limit", "abc")]), None),
            Err(FilterError::InvalidLimit(_))
        ));
        assert!(matches!(
            Filter::from_query("jobs", &pairs(&[("offset", "-1")]), None),
            Err(FilterError::InvalidOffset(_))
        ));
    }

    #[test]
    fn select_restricts_projection() {
        let filter = Filter::from_query("jobs", &pairs(&[("select", "id,title")]), None).unwrap();
        assert!(filter
            .to_select_sql(None)
            .query
            .starts_with("SELECT json_build_object('id', \"id\", 'title', \"title\") FROM \"jobs\""));
    }

    #[test]
    fn projection_never_exposes_validation_token() {
        let filter = Filter::new("cra_reports").unwrap();
        assert!(!filter.to_select_sql(None).query.contains("validation_token"));
        assert!(Filter::from_query("cra_reports", &pairs(&[("validation_token", "eq.x")]), None).is_err());
    }

    #[test]
    fn update_renumbers_filter_params_after_set() {
        let filter = Filter::from_query("jobs", &pairs(&[("id", "eq.abc")]), None).unwrap();
        let body = json!({"title": "Dev", "featured": true});
        let sql = filter.to_update_sql(body.as_object().unwrap(), None).unwrap();
        assert!(sql.query.contains(
            "SET \"featured\" = $1::boolean, \"title\" = $2::text, \"updated_at\" = NOW() WHERE \"id\"::text = $3"
        ));
        assert_eq!(
            sql.params,
            vec![Some("true".to_string()), Some("Dev".to_string()), Some("abc".to_string())]
        );
    }

    #[test]
    fn update_and_delete_require_a_filter() {
        let filter = Filter::new("jobs").unwrap();
        let body = json!({"title": "x"});
        assert!(matches!(
            filter.to_update_sql(body.as_object().unwrap(), None),
            Err(FilterError::MissingFilter(_))
        ));
        assert!(matches!(filter.to_delete_sql(None), Err(FilterError::MissingFilter(_))));
    }

    #[test]
    fn update_without_updated_at_column() {
        let filter = Filter::from_query("user_roles", &pairs(&[("id", "eq.x")]), None).unwrap();
        let body = json!({"role": "admin"});
        let sql = filter.to_update_sql(body.as_object().unwrap(), None).unwrap();
        assert!(!sql.query.contains("updated_at"));
    }

    #[test]
    fn insert_casts_and_rejects_unknown_keys() {
        let filter = Filter::new("cra_day_details").unwrap();
        let row = json!({"cra_report_id": "r1", "date": "2024-03-01", "state": "worked", "comment": null});
        let sql = filter.to_insert_sql(row.as_object().unwrap()).unwrap();
        assert!(sql.query.contains("(\"comment\", \"cra_report_id\", \"date\", \"state\")"));
        assert!(sql.query.contains("VALUES ($1::text, $2::uuid, $3::date, $4::text)"));
        assert_eq!(sql.params[0], None);

        let bad = json!({"nope": 1});
        assert!(matches!(
            filter.to_insert_sql(bad.as_object().unwrap()),
            Err(FilterError::UnknownColumn(_))
        ));
    }

    #[test]
    fn delete_with_owner_scope() {
        let user_id = Uuid::new_v4();
        let filter = Filter::from_query("cra_reports", &pairs(&[("id", "eq.r1")]), None).unwrap();
        let sql = filter
            .to_delete_sql(Some((OwnerScope::Column("user_id"), user_id)))
            .unwrap();
        assert_eq!(
            sql.query,
            "DELETE FROM \"cra_reports\" WHERE \"id\"::text = $1 AND \"user_id\" = $2::uuid \
             AND \"status\" = 'draft'"
        );

        let admin = filter.to_delete_sql(None).unwrap();
        assert!(!admin.query.contains("draft"));
    }

    #[test]
    fn owner_update_only_touches_drafts() {
        let user_id = Uuid::new_v4();
        let filter = Filter::from_query("cra_day_details", &pairs(&[("id", "eq.d1")]), None).unwrap();
        let body = json!({"comment": "client"});
        let sql = filter
            .to_update_sql(body.as_object().unwrap(), Some((OwnerScope::CraReport, user_id)))
            .unwrap();
        assert!(sql.query.contains(
            "WHERE \"id\"::text = $2 \
             AND \"cra_report_id\" IN (SELECT \"id\" FROM \"cra_reports\" WHERE \"user_id\" = $3::uuid) \
             AND \"cra_report_id\" IN (SELECT \"id\" FROM \"cra_reports\" WHERE \"status\" = 'draft') RETURNING *"
        ));
        assert_eq!(sql.params, vec![Some("client".to_string()), Some("d1".to_string()), Some(user_id.to_string())]);

        // Reads are not restricted to drafts
        assert!(!filter.to_select_sql(Some((OwnerScope::CraReport, user_id))).query.contains("draft"));
    }
}
