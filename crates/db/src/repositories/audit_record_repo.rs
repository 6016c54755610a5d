//! Read access to the audit destination table.
//!
//! The table name is configured at runtime, so queries are built with the
//! schema-qualified name rather than checked at compile time.

use satori_sync_core::audit_schema::column_list;

use crate::models::audit_record::AuditRecord;
use crate::DbPool;

/// Provides lookups against the destination table and the catalog.
pub struct AuditRecordRepo;

impl AuditRecordRepo {
    /// Find an entry by its `flow_id`.
    pub async fn find_by_flow_id(
        pool: &DbPool,
        table: &str,
        flow_id: &str,
    ) -> Result<Option<AuditRecord>, sqlx::Error> {
        let query = format!("SELECT {} FROM {table} WHERE flow_id = $1", column_list());
        sqlx::query_as::<_, AuditRecord>(&query)
            .bind(flow_id)
            .fetch_optional(pool)
            .await
    }

    /// Count all entries in the table.
    pub async fn count(pool: &DbPool, table: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*)::BIGINT FROM {table}"))
            .fetch_one(pool)
            .await
    }

    /// Whether a schema-qualified table currently exists.
    pub async fn table_exists(pool: &DbPool, table: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT to_regclass($1) IS NOT NULL")
            .bind(table)
            .fetch_one(pool)
            .await
    }
}
