use uuid::Uuid;

use super::types::{FilterOp, FilterWhereInfo};
use crate::access::{OwnerScope, TableDef};

/// Accumulates WHERE conditions and their positional parameters.
///
/// Parameters are numbered from `starting_param_index + 1`, so the clause can
/// follow the SET parameters of an UPDATE.
pub struct FilterWhere {
    table: &'static TableDef,
    param_values: Vec<Option<String>>,
    param_index: usize,
    conditions: Vec<String>,
}

impl FilterWhere {
    pub fn new(table: &'static TableDef, starting_param_index: usize) -> Self {
        Self {
            table,
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn generate(
        table: &'static TableDef,
        conditions: &[FilterWhereInfo],
        starting_param_index: usize,
        owner: Option<(OwnerScope, Uuid)>,
    ) -> (String, Vec<Option<String>>) {
        let mut filter_where = Self::new(table, starting_param_index);
        for condition in conditions {
            filter_where.condition(condition);
        }
        if let Some((scope, user_id)) = owner {
            filter_where.owner(scope, user_id);
        }
        filter_where.finish()
    }

    /// UPDATE/DELETE variant: owner-scoped callers are also held to the
    /// table's owner guard
    pub fn generate_write(
        table: &'static TableDef,
        conditions: &[FilterWhereInfo],
        starting_param_index: usize,
        owner: Option<(OwnerScope, Uuid)>,
    ) -> (String, Vec<Option<String>>) {
        let mut filter_where = Self::new(table, starting_param_index);
        for condition in conditions {
            filter_where.condition(condition);
        }
        if let Some((scope, user_id)) = owner {
            filter_where.owner(scope, user_id);
            if let Some(guard) = table.owner_guard {
                filter_where.conditions.push(guard.to_string());
            }
        }
        filter_where.finish()
    }

    /// Columns are validated when the filter is parsed
    pub fn condition(&mut self, info: &FilterWhereInfo) {
        let quoted_column = format!("\"{}\"", info.column);
        let sql = match info.operator {
            // Text comparison keeps enum-like columns transparent
            FilterOp::Eq => format!("{}::text = {}", quoted_column, self.param(info.values[0].clone())),
            FilterOp::Neq => format!("{}::text != {}", quoted_column, self.param(info.values[0].clone())),
            FilterOp::Gt => format!("{} > {}", quoted_column, self.typed_param(&info.column, &info.values[0])),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.typed_param(&info.column, &info.values[0])),
            FilterOp::In => {
                let params: Vec<String> = info.values.iter().map(|v| self.param(v.clone())).collect();
                format!("{}::text = ANY(ARRAY[{}])", quoted_column, params.join(","))
            }
        };
        self.conditions.push(sql);
    }

    pub fn owner(&mut self, scope: OwnerScope, user_id: Uuid) {
        let placeholder = self.next_index();
        self.param_values.push(Some(user_id.to_string()));
        self.conditions.push(scope.condition(placeholder));
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// `(clause, params)`; the clause is empty when nothing was added
    pub fn finish(self) -> (String, Vec<Option<String>>) {
        let clause = if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        };
        (clause, self.param_values)
    }

    fn typed_param(&mut self, column: &str, value: &str) -> String {
        let cast = self
            .table
            .column(column)
            .map(|c| c.ty.sql_cast())
            .unwrap_or("text");
        format!("{}::{}", self.param(value.to_string()), cast)
    }

    fn param(&mut self, value: String) -> String {
        let placeholder = self.next_index();
        self.param_values.push(Some(value));
        format!("${}", placeholder)
    }

    fn next_index(&mut self) -> usize {
        self.param_index += 1;
        self.param_index
    }
}
