//! PostgreSQL-backed `DocumentStore`.
//!
//! Every collection lives in one `documents` table keyed by `(collection, id)` with the
//! document body in a JSONB column. Filters are compiled with `sqlx::QueryBuilder`; field
//! names and values are always bound, never spliced into the SQL text.
//!
//! `update_one` is one statement: the target row is locked, the new body is computed from
//! the locked body, and the matched/modified counts come back in the same round trip.
//!
//! Fields listed in `UNIQUE_FIELDS` get a partial unique index; a violation on insert
//! surfaces as `RepoError::Duplicate`.
//!
//! Every call is bounded by the configured operation timeout.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::{QueryBuilder, types::Json};

use crate::repos::document::{
    Accumulator, Condition, Document, Filter, FindOptions, Group, ID_FIELD, Pipeline, Transition,
    TransitionResult, UNIQUE_FIELDS, Update, timestamp,
};
use crate::repos::error::{RepoError, RepoResult};
use crate::repos::store::DocumentStore;
use crate::services::record_id::RecordId;

const TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body JSONB NOT NULL,
    PRIMARY KEY (collection, id)
)
"#;

/// Table plus one partial unique index per entry in `UNIQUE_FIELDS`.
fn schema_statements() -> Vec<String> {
    let mut statements = vec![TABLE.to_string()];
    statements.extend(UNIQUE_FIELDS.iter().map(|(collection, field)| {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS documents_{collection}_{field}_key \
             ON documents ((body ->> '{field}')) WHERE collection = '{collection}'"
        )
    }));
    statements
}

#[derive(Clone, Debug)]
pub struct PgDocumentStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgDocumentStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        op_timeout: Duration,
    ) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(op_timeout)
            .connect(database_url)
            .await?;

        let store = Self { pool, op_timeout };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> RepoResult<()> {
        for statement in schema_statements() {
            self.timed(sqlx::query(&statement).execute(&self.pool)).await?;
        }
        Ok(())
    }

    async fn timed<T>(&self, fut: impl Future<Output = Result<T, sqlx::Error>>) -> RepoResult<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(res) => res.map_err(RepoError::from),
            Err(_) => Err(RepoError::Timeout(self.op_timeout)),
        }
    }

    async fn upsert(&self, filter: &Filter, update: &Update) -> RepoResult<TransitionResult> {
        let mut qb = upsert_query(filter, update)?;
        let inserted: Option<bool> = self
            .timed(qb.build_query_scalar().fetch_optional(&self.pool))
            .await?;

        Ok(match inserted {
            Some(true) => TransitionResult::CREATED,
            Some(false) => TransitionResult::CHANGED,
            None => TransitionResult::UNCHANGED,
        })
    }
}

fn find_query(filter: &Filter, options: &FindOptions) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT body FROM documents WHERE ");
    push_filter(&mut qb, filter, "");

    if let Some(sort) = options.sort {
        qb.push(" ORDER BY (body ->> ")
            .push_bind(sort.field)
            .push(") COLLATE \"C\"")
            .push(if sort.descending { " DESC" } else { " ASC" });
    }
    if let Some(limit) = options.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }
    qb
}

/// Locks the first match, applies the transition only if it changes the body and
/// returns `(matched, modified)` counts.
fn update_query(filter: &Filter, update: &Update) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("WITH target AS (SELECT id, body FROM documents WHERE ");
    push_filter(&mut qb, filter, "");
    qb.push(" LIMIT 1 FOR UPDATE), changed AS (UPDATE documents d SET body = ");
    push_next_body(&mut qb, &update.transition, "t.body");
    qb.push(" || jsonb_build_object('updatedAt', ")
        .push_bind(timestamp(update.at))
        .push("::text) FROM target t WHERE d.collection = ")
        .push_bind(filter.collection)
        .push(" AND d.id = t.id AND ");
    push_changed(&mut qb, &update.transition, "t.body");
    qb.push(
        " RETURNING d.id) \
         SELECT (SELECT count(*) FROM target) AS matched, \
         (SELECT count(*) FROM changed) AS modified",
    );
    qb
}

/// Returns one row (`inserted`) when a row was written and none when the existing
/// body already satisfies the transition.
fn upsert_query(filter: &Filter, update: &Update) -> RepoResult<QueryBuilder<'static, Postgres>> {
    let Some(id) = &filter.id else {
        return Err(RepoError::Unsupported("upsert requires an id-only filter"));
    };
    if !filter.conditions.is_empty() {
        return Err(RepoError::Unsupported("upsert requires an id-only filter"));
    }

    let mut qb = QueryBuilder::new("INSERT INTO documents (collection, id, body) VALUES (");
    qb.push_bind(filter.collection)
        .push(", ")
        .push_bind(id.to_string())
        .push(", ")
        .push_bind(Json(update.initial_document(id)))
        .push(") ON CONFLICT (collection, id) DO UPDATE SET body = ");
    push_next_body(&mut qb, &update.transition, "documents.body");
    qb.push(" || jsonb_build_object('updatedAt', ")
        .push_bind(timestamp(update.at))
        .push("::text) WHERE ");
    push_changed(&mut qb, &update.transition, "documents.body");
    qb.push(" RETURNING (xmax = 0) AS inserted");
    Ok(qb)
}

fn delete_query(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("DELETE FROM documents WHERE ");
    push_filter(&mut qb, filter, "");
    qb
}

fn aggregate_query(pipeline: &Pipeline) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT src -> ");
    qb.push_bind(pipeline.group_by)
        .push(" AS key, jsonb_build_object(");
    for (i, (name, accumulator)) in pipeline.accumulators.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push_bind(*name).push(", ");
        push_accumulator(&mut qb, *accumulator);
    }
    qb.push(") AS metrics FROM (SELECT ");

    match pipeline.unwind {
        Some(field) => {
            qb.push("elem AS src FROM documents d CROSS JOIN LATERAL jsonb_array_elements(")
                .push("CASE WHEN jsonb_typeof(d.body -> ")
                .push_bind(field)
                .push(") = 'array' THEN d.body -> ")
                .push_bind(field)
                .push(" ELSE '[]'::jsonb END) AS elem WHERE ");
        }
        None => {
            qb.push("d.body AS src FROM documents d WHERE ");
        }
    }
    push_filter(&mut qb, &pipeline.filter, "d.");
    qb.push(") s GROUP BY 1");
    qb
}

/// `WHERE` body for `filter`. `t` is the table qualifier ("" or "d.").
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter, t: &str) {
    qb.push(format!("{t}collection = ")).push_bind(filter.collection);

    if let Some(id) = &filter.id {
        qb.push(format!(" AND {t}id = ")).push_bind(id.to_string());
    }

    for condition in &filter.conditions {
        qb.push(" AND ");
        match condition {
            Condition::Eq(field, value) => {
                qb.push(format!("{t}body -> "))
                    .push_bind(*field)
                    .push(" = ")
                    .push_bind(Json(value.clone()));
            }
            Condition::In(field, values) => {
                qb.push_bind(Json(Value::Array(values.clone())))
                    .push(format!(" @> jsonb_build_array({t}body -> "))
                    .push_bind(*field)
                    .push(")");
            }
            Condition::Lt(field, Value::String(bound)) => {
                qb.push(format!("({t}body ->> "))
                    .push_bind(*field)
                    .push(") COLLATE \"C\" < ")
                    .push_bind(bound.clone());
            }
            Condition::Lt(field, Value::Number(bound)) => {
                qb.push(format!("CASE WHEN jsonb_typeof({t}body -> "))
                    .push_bind(*field)
                    .push(format!(") = 'number' THEN ({t}body ->> "))
                    .push_bind(*field)
                    .push(")::float8 < ")
                    .push_bind(bound.as_f64().unwrap_or(f64::NAN))
                    .push(" ELSE false END");
            }
            Condition::Lt(..) => {
                qb.push("false");
            }
            Condition::Contains(field, value) => {
                qb.push(format!("COALESCE({t}body -> "))
                    .push_bind(*field)
                    .push(", '[]'::jsonb) @> jsonb_build_array(")
                    .push_bind(Json(value.clone()))
                    .push("::jsonb)");
            }
        }
    }
}

/// Expression for the body after `transition`, computed from `body`.
fn push_next_body(qb: &mut QueryBuilder<'_, Postgres>, transition: &Transition, body: &str) {
    match transition {
        Transition::Set(fields) => {
            qb.push(format!("({body} || "))
                .push_bind(Json(fields.clone()))
                .push("::jsonb)");
        }
        Transition::Push { field, value } | Transition::AddToSet { field, value } => {
            qb.push(format!("jsonb_set({body}, ARRAY["))
                .push_bind(*field)
                .push("]::text[], ")
                .push(format!("COALESCE({body} -> "))
                .push_bind(*field)
                .push(", '[]'::jsonb) || jsonb_build_array(")
                .push_bind(Json(value.clone()))
                .push("::jsonb))");
        }
    }
}

/// Predicate that holds when applying `transition` to `body` changes it.
fn push_changed(qb: &mut QueryBuilder<'_, Postgres>, transition: &Transition, body: &str) {
    match transition {
        Transition::Set(fields) => {
            qb.push(format!("({body} || "))
                .push_bind(Json(fields.clone()))
                .push(format!("::jsonb) IS DISTINCT FROM {body}"));
        }
        Transition::Push { .. } => {
            qb.push("true");
        }
        Transition::AddToSet { field, value } => {
            qb.push(format!("NOT (COALESCE({body} -> "))
                .push_bind(*field)
                .push(", '[]'::jsonb) @> jsonb_build_array(")
                .push_bind(Json(value.clone()))
                .push("::jsonb))");
        }
    }
}

fn push_accumulator(qb: &mut QueryBuilder<'_, Postgres>, accumulator: Accumulator) {
    match accumulator {
        Accumulator::Count => {
            qb.push("count(*)");
        }
        Accumulator::Max(field) | Accumulator::Avg(field) => {
            let func = if matches!(accumulator, Accumulator::Max(_)) { "max" } else { "avg" };
            qb.push(format!("{func}(CASE WHEN jsonb_typeof(src -> "))
                .push_bind(field)
                .push(") = 'number' THEN (src ->> ")
                .push_bind(field)
                .push(")::float8 END)");
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find_one(&self, filter: &Filter) -> RepoResult<Option<Document>> {
        let options = FindOptions {
            sort: None,
            limit: Some(1),
        };
        let mut qb = find_query(filter, &options);
        let row: Option<Json<Document>> = self
            .timed(qb.build_query_scalar().fetch_optional(&self.pool))
            .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn find_many(&self, filter: &Filter, options: &FindOptions) -> RepoResult<Vec<Document>> {
        let mut qb = find_query(filter, options);
        let rows: Vec<Json<Document>> = self
            .timed(qb.build_query_scalar().fetch_all(&self.pool))
            .await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn insert_one(&self, collection: &'static str, mut doc: Document) -> RepoResult<RecordId> {
        let id = RecordId::generate();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let inserted = self
            .timed(
                sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
                    .bind(collection)
                    .bind(id.to_string())
                    .bind(Json(doc))
                    .execute(&self.pool),
            )
            .await;

        match inserted {
            Ok(_) => Ok(id),
            Err(RepoError::Db(sqlx::Error::Database(err))) if err.is_unique_violation() => {
                Err(RepoError::Duplicate(collection))
            }
            Err(err) => Err(err),
        }
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> RepoResult<TransitionResult> {
        if update.on_insert.is_some() {
            return self.upsert(filter, update).await;
        }

        let mut qb = update_query(filter, update);
        let (matched, modified): (i64, i64) = self
            .timed(qb.build_query_as().fetch_one(&self.pool))
            .await?;

        Ok(TransitionResult {
            matched: matched > 0,
            modified: modified > 0,
            upserted: false,
        })
    }

    async fn delete_many(&self, filter: &Filter) -> RepoResult<u64> {
        let mut qb = delete_query(filter);
        let res = self.timed(qb.build().execute(&self.pool)).await?;
        Ok(res.rows_affected())
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> RepoResult<Vec<Group>> {
        let mut qb = aggregate_query(pipeline);
        let rows: Vec<(Option<Json<Value>>, Json<Document>)> = self
            .timed(qb.build_query_as().fetch_all(&self.pool))
            .await?;

        Ok(rows
            .into_iter()
            .map(|(key, Json(values))| Group {
                key: key.map(|Json(k)| k).unwrap_or(Value::Null),
                values,
            })
            .collect())
    }
}
