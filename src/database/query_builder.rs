use serde_json::Value;
use sqlx::{postgres::PgArguments, query::QueryScalar, PgExecutor, Postgres};

use crate::filter::SqlResult;

/// Bind the text parameters of a generated statement that yields one JSON
/// value per row
fn json_query(sql: &SqlResult) -> QueryScalar<'_, Postgres, Value, PgArguments> {
    let mut q = sqlx::query_scalar::<_, Value>(&sql.query);
    for p in sql.params.iter() {
        q = q.bind(p.as_deref());
    }
    q
}

pub async fn fetch_json_rows<'c, E>(executor: E, sql: &SqlResult) -> Result<Vec<Value>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    json_query(sql).fetch_all(executor).await
}

pub async fn fetch_json_one<'c, E>(executor: E, sql: &SqlResult) -> Result<Value, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    json_query(sql).fetch_one(executor).await
}

/// Rows affected by a generated statement
pub async fn execute<'c, E>(executor: E, sql: &SqlResult) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    let mut q = sqlx::query(&sql.query);
    for p in sql.params.iter() {
        q = q.bind(p.as_deref());
    }
    Ok(q.execute(executor).await?.rows_affected())
}
