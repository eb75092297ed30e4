//! SQLite store backend
//!
//! Runtime-query style over a SqlitePool. Grouped writes run inside one
//! transaction per call so a batch costs a bounded number of round trips
//! regardless of message count.

use chrono::{DateTime, Utc};
use contracts::{
    Binding, CurationError, CurationStore, LineageRecord, Mapping, MessageRecord, TopicEdge,
    TopicNode,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Row, SqlitePool};
use tracing::{debug, instrument, warn};

/// SQLite-backed CurationStore
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database at `path` (":memory:" for ephemeral) and
    /// initialize tables.
    #[instrument(name = "sqlite_store_connect", skip(path))]
    pub async fn connect(path: &str) -> Result<Self, CurationError> {
        let (url, max_connections) = if path == ":memory:" {
            // A pooled :memory: database must stay on one connection or
            // every connection sees its own empty database.
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite://{path}?mode=rwc"), 5)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await
            .map_err(|e| CurationError::StoreQuery {
                message: format!("failed to open database at '{path}': {e}"),
                source: Some(Box::new(e)),
            })?;

        init_tables(&pool).await?;
        debug!(path = %path, "sqlite store ready");

        Ok(Self { pool })
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert or replace an approved mapping (admin/test surface)
    pub async fn seed_mapping(&self, mapping: &Mapping) -> Result<(), CurationError> {
        let key_mapping = serde_json::to_string(&mapping.key_mapping)
            .map_err(|e| CurationError::store_write("seed_mapping", e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO mappings (raw_topic, curated_topic, key_mapping, mapping_id, approved)
            VALUES (?, ?, ?, ?, 1)
            ON CONFLICT(raw_topic) DO UPDATE SET
                curated_topic = excluded.curated_topic,
                key_mapping = excluded.key_mapping,
                mapping_id = excluded.mapping_id,
                approved = 1
            "#,
        )
        .bind(mapping.raw_topic.as_str())
        .bind(mapping.curated_topic.as_str())
        .bind(key_mapping)
        .bind(&mapping.mapping_id)
        .execute(&self.pool)
        .await
        .map_err(|e| CurationError::store_write("seed_mapping", e.to_string()))?;
        Ok(())
    }

    /// Insert or replace an approved binding (admin/test surface)
    pub async fn seed_binding(&self, binding: &Binding) -> Result<(), CurationError> {
        let schema = serde_json::to_string(&binding.expected_schema)
            .map_err(|e| CurationError::store_write("seed_binding", e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO bindings (topic, expected_schema, proposal_id, approved)
            VALUES (?, ?, ?, 1)
            ON CONFLICT(topic) DO UPDATE SET
                expected_schema = excluded.expected_schema,
                proposal_id = excluded.proposal_id,
                approved = 1
            "#,
        )
        .bind(binding.topic.as_str())
        .bind(schema)
        .bind(&binding.proposal_id)
        .execute(&self.pool)
        .await
        .map_err(|e| CurationError::store_write("seed_binding", e.to_string()))?;
        Ok(())
    }

    /// Count of persisted message records (health/test surface)
    pub async fn message_record_count(&self) -> Result<u64, CurationError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM message_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CurationError::store_query(e.to_string()))?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }

    /// Count of persisted lineage rows (test surface)
    pub async fn lineage_count(&self) -> Result<u64, CurationError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM lineage")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CurationError::store_query(e.to_string()))?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}

/// Create tables if they do not exist
async fn init_tables(pool: &SqlitePool) -> Result<(), CurationError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS mappings (
            raw_topic TEXT PRIMARY KEY,
            curated_topic TEXT NOT NULL,
            key_mapping TEXT NOT NULL DEFAULT '{}',
            mapping_id TEXT NOT NULL,
            approved INTEGER NOT NULL DEFAULT 1
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS bindings (
            topic TEXT PRIMARY KEY,
            expected_schema TEXT NOT NULL DEFAULT '[]',
            proposal_id TEXT NOT NULL,
            approved INTEGER NOT NULL DEFAULT 1
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topic_nodes (
            path TEXT PRIMARY KEY,
            segment TEXT NOT NULL,
            depth INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topic_edges (
            parent TEXT NOT NULL,
            child TEXT NOT NULL,
            PRIMARY KEY (parent, child)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS message_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic TEXT NOT NULL,
            publisher_id TEXT NOT NULL,
            canonical_text TEXT NOT NULL,
            payload_bytes INTEGER NOT NULL,
            conformance TEXT NOT NULL,
            violations TEXT NOT NULL DEFAULT '[]',
            received_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS lineage (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            raw_topic TEXT NOT NULL,
            curated_topic TEXT NOT NULL,
            mapping_id TEXT NOT NULL,
            produced_at TEXT NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| CurationError::StoreQuery {
                message: format!("table init failed: {e}"),
                source: Some(Box::new(e)),
            })?;
    }
    Ok(())
}

impl CurationStore for SqliteStore {
    async fn fetch_mappings(&self) -> Result<Vec<Mapping>, CurationError> {
        let rows = sqlx::query(
            "SELECT raw_topic, curated_topic, key_mapping, mapping_id FROM mappings WHERE approved = 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CurationError::store_query(e.to_string()))?;

        let mut mappings = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_topic: String = row.get("raw_topic");
            let key_mapping: String = row.get("key_mapping");
            let key_mapping = serde_json::from_str(&key_mapping).unwrap_or_else(|e| {
                warn!(raw_topic = %raw_topic, error = %e, "malformed key_mapping, using empty table");
                Default::default()
            });
            mappings.push(Mapping {
                raw_topic: raw_topic.into(),
                curated_topic: row.get::<String, _>("curated_topic").into(),
                key_mapping,
                mapping_id: row.get("mapping_id"),
            });
        }
        Ok(mappings)
    }

    async fn fetch_bindings(&self) -> Result<Vec<Binding>, CurationError> {
        let rows =
            sqlx::query("SELECT topic, expected_schema, proposal_id FROM bindings WHERE approved = 1")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CurationError::store_query(e.to_string()))?;

        let mut bindings = Vec::with_capacity(rows.len());
        for row in rows {
            let topic: String = row.get("topic");
            let schema: String = row.get("expected_schema");
            let expected_schema = serde_json::from_str(&schema).unwrap_or_else(|e| {
                warn!(topic = %topic, error = %e, "malformed expected_schema, using empty set");
                Default::default()
            });
            bindings.push(Binding {
                topic: topic.into(),
                expected_schema,
                proposal_id: row.get("proposal_id"),
            });
        }
        Ok(bindings)
    }

    async fn upsert_topic_nodes(&self, nodes: &[TopicNode]) -> Result<(), CurationError> {
        if nodes.is_empty() {
            return Ok(());
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CurationError::store_write("upsert_topic_nodes", e.to_string()))?;
        for node in nodes {
            sqlx::query(
                "INSERT INTO topic_nodes (path, segment, depth) VALUES (?, ?, ?) \
                 ON CONFLICT(path) DO NOTHING",
            )
            .bind(&node.path)
            .bind(&node.segment)
            .bind(node.depth as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| CurationError::store_write("upsert_topic_nodes", e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| CurationError::store_write("upsert_topic_nodes", e.to_string()))
    }

    async fn upsert_topic_edges(&self, edges: &[TopicEdge]) -> Result<(), CurationError> {
        if edges.is_empty() {
            return Ok(());
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CurationError::store_write("upsert_topic_edges", e.to_string()))?;
        for edge in edges {
            sqlx::query(
                "INSERT INTO topic_edges (parent, child) VALUES (?, ?) \
                 ON CONFLICT(parent, child) DO NOTHING",
            )
            .bind(&edge.parent)
            .bind(&edge.child)
            .execute(&mut *tx)
            .await
            .map_err(|e| CurationError::store_write("upsert_topic_edges", e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| CurationError::store_write("upsert_topic_edges", e.to_string()))
    }

    async fn insert_message_records(&self, records: &[MessageRecord]) -> Result<(), CurationError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut builder = QueryBuilder::new(
            "INSERT INTO message_records \
             (topic, publisher_id, canonical_text, payload_bytes, conformance, violations, received_at) ",
        );
        builder.push_values(records, |mut row, record| {
            let violations =
                serde_json::to_string(&record.violations).unwrap_or_else(|_| "[]".to_string());
            row.push_bind(record.topic.as_str())
                .push_bind(&record.publisher_id)
                .push_bind(&record.canonical_text)
                .push_bind(record.payload_bytes as i64)
                .push_bind(record.conformance.as_str())
                .push_bind(violations)
                .push_bind(record.received_at);
        });
        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| CurationError::store_write("insert_message_records", e.to_string()))?;
        Ok(())
    }

    async fn insert_lineage(&self, record: &LineageRecord) -> Result<(), CurationError> {
        sqlx::query(
            "INSERT INTO lineage (raw_topic, curated_topic, mapping_id, produced_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(record.raw_topic.as_str())
        .bind(record.curated_topic.as_str())
        .bind(&record.mapping_id)
        .bind(record.produced_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CurationError::store_write("insert_lineage", e.to_string()))?;
        Ok(())
    }

    async fn purge_message_records_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CurationError> {
        let result = sqlx::query("DELETE FROM message_records WHERE received_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| CurationError::store_write("purge_message_records", e.to_string()))?;
        Ok(result.rows_affected())
    }
}
