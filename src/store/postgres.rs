use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use sqlx::{postgres::PgArguments, types::Json, FromRow, PgPool, Postgres};
use uuid::Uuid;

use super::{ensure_object, Document, DocumentStore, FieldUpdate, Filter, Query};
use crate::error::{Error, Result};

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    data: JsonValue,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            data: row.data,
        }
    }
}

enum Bind {
    Text(String),
    Json(JsonValue),
    Int(i64),
}

type PgQuery<'q> = sqlx::query::QueryAs<'q, Postgres, DocumentRow, PgArguments>;

fn bind_all<'q>(mut statement: PgQuery<'q>, binds: Vec<Bind>) -> PgQuery<'q> {
    for value in binds {
        statement = match value {
            Bind::Text(v) => statement.bind(v),
            Bind::Json(v) => statement.bind(Json(v)),
            Bind::Int(v) => statement.bind(v),
        };
    }
    statement
}

/// Documents live in a single `documents` table keyed by
/// `(collection, id)` with a JSONB body.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn without_id(mut data: JsonValue) -> JsonValue {
    if let JsonValue::Object(map) = &mut data {
        map.remove("id");
    }
    data
}

/// Builds the SELECT for `query`. Field names and values are always bound;
/// only operator and direction keywords are interpolated.
fn select_sql(collection: &str, query: &Query) -> (String, Vec<Bind>) {
    let mut binds = vec![Bind::Text(collection.to_string())];
    let mut sql = String::from("SELECT id, data FROM documents WHERE collection = $1");

    for filter in &query.filters {
        let field_idx = binds.len() + 1;
        let value_idx = field_idx + 1;
        binds.push(Bind::Text(filter.field().to_string()));
        match filter {
            Filter::Eq { value, .. } => {
                sql.push_str(&format!(" AND data -> ${}::text = ${}::jsonb", field_idx, value_idx));
                binds.push(Bind::Json(value.clone()));
            }
            Filter::Range { op, value, .. } => {
                sql.push_str(&format!(
                    " AND data -> ${}::text {} ${}::jsonb",
                    field_idx,
                    op.sql(),
                    value_idx
                ));
                binds.push(Bind::Json(value.clone()));
            }
            Filter::ArrayContains { value, .. } => {
                sql.push_str(&format!(
                    " AND data -> ${}::text @> ${}::jsonb",
                    field_idx, value_idx
                ));
                binds.push(Bind::Json(json!([value])));
            }
        }
    }

    if query.order_by.is_empty() {
        sql.push_str(" ORDER BY created_at ASC");
    } else {
        let mut clauses = Vec::with_capacity(query.order_by.len());
        for order in &query.order_by {
            binds.push(Bind::Text(order.field.clone()));
            clauses.push(format!(
                "data -> ${}::text {}",
                binds.len(),
                order.direction.sql()
            ));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.join(", "));
    }

    if let Some(limit) = query.limit {
        binds.push(Bind::Int(limit as i64));
        sql.push_str(&format!(" LIMIT ${}", binds.len()));
    }

    (sql, binds)
}

/// Folds every change into nested `jsonb_set` calls so the whole batch is a
/// single UPDATE statement. Increments read the pre-update row value, which
/// Postgres evaluates under the row lock.
fn update_sql(collection: &str, id: &str, changes: &[FieldUpdate]) -> (String, Vec<Bind>) {
    let mut binds = vec![Bind::Text(collection.to_string()), Bind::Text(id.to_string())];
    let mut expr = String::from("data");

    for change in changes {
        binds.push(Bind::Text(change.field().to_string()));
        let field_idx = binds.len();
        match change {
            FieldUpdate::Set(_, value) => {
                binds.push(Bind::Json(value.clone()));
                expr = format!(
                    "jsonb_set({}, ARRAY[${}::text], COALESCE(${}::jsonb, 'null'::jsonb), true)",
                    expr,
                    field_idx,
                    binds.len()
                );
            }
            FieldUpdate::Increment(_, by) => {
                binds.push(Bind::Int(*by));
                expr = format!(
                    "jsonb_set({}, ARRAY[${f}::text], to_jsonb(COALESCE((data ->> ${f}::text)::bigint, 0) + ${v}::bigint), true)",
                    expr,
                    f = field_idx,
                    v = binds.len()
                );
            }
        }
    }

    let sql = format!(
        "UPDATE documents SET data = {}, updated_at = NOW() WHERE collection = $1 AND id = $2 RETURNING id, data",
        expr
    );
    (sql, binds)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let (sql, binds) = select_sql(collection, query);
        let rows = bind_all(sqlx::query_as::<_, DocumentRow>(&sql), binds)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"SELECT id, data FROM documents WHERE collection = $1 AND id = $2"#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn create(&self, collection: &str, data: JsonValue) -> Result<Document> {
        ensure_object(&data)?;
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            RETURNING id, data
            "#,
        )
        .bind(collection)
        .bind(Uuid::new_v4().to_string())
        .bind(Json(without_id(data)))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn set(&self, collection: &str, id: &str, data: JsonValue) -> Result<Document> {
        ensure_object(&data)?;
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            RETURNING id, data
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(without_id(data)))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Vec<FieldUpdate>,
    ) -> Result<Document> {
        let (sql, binds) = update_sql(collection, id, &changes);
        let row = bind_all(sqlx::query_as::<_, DocumentRow>(&sql), binds)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Document::from)
            .ok_or_else(|| Error::NotFound(format!("{}/{} not found", collection, id)))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let res = sqlx::query(r#"DELETE FROM documents WHERE collection = $1 AND id = $2"#)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{OrderBy, RangeOp};

    #[test]
    fn select_binds_fields_and_values() {
        let query = Query::new()
            .eq("is_active", true)
            .array_contains("events", "ride.created")
            .range("failure_count", RangeOp::Lt, 5)
            .order_by(OrderBy::desc("created_at"))
            .limit(10);
        let (sql, binds) = select_sql("webhooks", &query);

        assert_eq!(
            sql,
            "SELECT id, data FROM documents WHERE collection = $1 \
             AND data -> $2::text = $3::jsonb \
             AND data -> $4::text @> $5::jsonb \
             AND data -> $6::text < $7::jsonb \
             ORDER BY data -> $8::text DESC LIMIT $9"
        );
        assert_eq!(binds.len(), 9);
        assert!(matches!(&binds[4], Bind::Json(v) if *v == json!(["ride.created"])));
    }

    #[test]
    fn update_nests_jsonb_set_per_change() {
        let (sql, binds) = update_sql(
            "webhooks",
            "abc",
            &[
                FieldUpdate::increment("total_deliveries", 1),
                FieldUpdate::set("last_error", JsonValue::Null),
            ],
        );
        assert!(sql.starts_with(
            "UPDATE documents SET data = jsonb_set(jsonb_set(data, ARRAY[$3::text], \
             to_jsonb(COALESCE((data ->> $3::text)::bigint, 0) + $4::bigint), true), \
             ARRAY[$5::text], COALESCE($6::jsonb, 'null'::jsonb), true)"
        ));
        assert!(sql.ends_with("WHERE collection = $1 AND id = $2 RETURNING id, data"));
        assert_eq!(binds.len(), 6);
    }
}
