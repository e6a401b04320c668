use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::{PgArguments, PgPoolOptions}, PgPool, Row as _};
use tracing::info;

use crate::database::store::{expect_row, Store, StoreError};
use crate::filter::{filter::validate_identifier, Filter, FilterError, SqlValue};
use crate::types::{Operation, Row, Table};

/// Direct Postgres connection to the store's database.
///
/// Rows travel as JSON: inserts and updates pass the row as one `jsonb`
/// parameter expanded with `jsonb_populate_record`, results come back through
/// `row_to_json`, so column typing stays with the table definition.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds a lazily connecting pool so startup never blocks on the database.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;
        info!("Created lazy Postgres pool (max {} connections)", max_connections);
        Ok(Self { pool })
    }

    async fn fetch_rows(&self, sql: &str, params: &[SqlValue], json: Option<Value>) -> Result<Vec<Row>, StoreError> {
        let mut q = sqlx::query(sql);
        if let Some(json) = json {
            q = q.bind(json);
        }
        for p in params.iter() {
            q = bind_param_query(q, p);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| {
                let v: Value = r.try_get("row")?;
                expect_row(v)
            })
            .collect()
    }
}

fn column_list(row: &Row) -> Result<Vec<String>, FilterError> {
    row.keys()
        .map(|k| {
            validate_identifier(k)?;
            Ok(format!("\"{}\"", k))
        })
        .collect()
}

/// `WITH t AS (INSERT ... RETURNING *) SELECT row_to_json(t) ...`
pub(crate) fn insert_sql(table: Table, row: &Row) -> Result<String, FilterError> {
    let columns = column_list(row)?.join(", ");
    Ok(format!(
        "WITH t AS (INSERT INTO \"{table}\" ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::\"{table}\", $1) RETURNING *) SELECT row_to_json(t) AS row FROM t",
        table = table.as_str(),
        columns = columns,
    ))
}

/// Update with `$1` the JSON changes and `$2..` the filter values.
pub(crate) fn update_sql(table: Table, changes: &Row, filter: &Filter) -> Result<(String, Vec<SqlValue>), FilterError> {
    let assignments = changes
        .keys()
        .map(|k| {
            validate_identifier(k)?;
            Ok(format!("\"{k}\" = r.\"{k}\"", k = k))
        })
        .collect::<Result<Vec<_>, FilterError>>()?
        .join(", ");
    let where_sql = filter.to_where_sql(table.as_str(), 2)?;

    let sql = format!(
        "WITH t AS (UPDATE \"{table}\" SET {assignments} FROM jsonb_populate_record(NULL::\"{table}\", $1) AS r WHERE {where_clause} RETURNING \"{table}\".*) SELECT row_to_json(t) AS row FROM t",
        table = table.as_str(),
        assignments = assignments,
        where_clause = where_sql.query,
    );
    Ok((sql, where_sql.params))
}

pub(crate) fn delete_sql(table: Table, filter: &Filter) -> Result<(String, Vec<SqlValue>), FilterError> {
    let where_sql = filter.to_where_sql(table.as_str(), 1)?;
    let sql = format!("DELETE FROM \"{}\" WHERE {}", table.as_str(), where_sql.query);
    Ok((sql, where_sql.params))
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Vec<Row>, StoreError> {
        let sql = insert_sql(table, &row)?;
        self.fetch_rows(&sql, &[], Some(Value::Object(row))).await
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let sql = filter.to_select_sql(table.as_str())?;
        self.fetch_rows(&sql.query, &sql.params, None).await
    }

    async fn update(&self, table: Table, changes: Row, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        if filter.conditions().is_empty() {
            return Err(StoreError::Unfiltered { table, operation: Operation::Update });
        }
        let (sql, params) = update_sql(table, &changes, filter)?;
        self.fetch_rows(&sql, &params, Some(Value::Object(changes))).await
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        if filter.conditions().is_empty() {
            return Err(StoreError::Unfiltered { table, operation: Operation::Delete });
        }
        let (sql, params) = delete_sql(table, filter)?;
        let mut q = sqlx::query(&sql);
        for p in params.iter() {
            q = bind_param_query(q, p);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q SqlValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        SqlValue::Text(s) => q.bind(s.as_str()),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Uuid(u) => q.bind(*u),
        SqlValue::Timestamp(ts) => q.bind(*ts),
    }
}
