//! Column schema of the audit destination table.
//!
//! The Satori data-flow CSV export lists its columns in exactly this order,
//! so the same list drives the destination DDL, the staging DDL, the COPY
//! column list and the merge statement.

// ---------------------------------------------------------------------------
// Column definitions
// ---------------------------------------------------------------------------

/// SQL type of an audit column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Timestamp,
    Varchar,
    Bigint,
}

impl ColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Timestamp => "timestamp",
            ColumnType::Varchar => "varchar",
            ColumnType::Bigint => "bigint",
        }
    }
}

/// One column of the audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditColumn {
    pub name: &'static str,
    pub sql_type: ColumnType,
}

const fn col(name: &'static str, sql_type: ColumnType) -> AuditColumn {
    AuditColumn { name, sql_type }
}

use ColumnType::{Bigint, Timestamp, Varchar};

/// Name of the natural key column.
pub const FLOW_ID: &str = "flow_id";

/// All audit columns in export order.
pub const AUDIT_COLUMNS: [AuditColumn; 34] = [
    col("flow_timestamp", Timestamp),
    col("account_id", Varchar),
    col("data_store_id", Varchar),
    col(FLOW_ID, Varchar),
    col("data_store_type", Varchar),
    col("data_store_name", Varchar),
    col("identity_name", Varchar),
    col("identity_role", Varchar),
    col("tool", Varchar),
    col("locations_location", Varchar),
    col("queries_value", Bigint),
    col("volume_value", Bigint),
    col("incident_ids", Varchar),
    col("tags_name", Varchar),
    col("source", Varchar),
    col("records_value", Bigint),
    col("result_set", Varchar),
    col("result_set_column_name", Varchar),
    col("query_original_query", Varchar),
    col("datasets_id", Varchar),
    col("datasets_name", Varchar),
    col("query_query_type", Varchar),
    col("query_meta_data", Varchar),
    col("query_meta_data_error", Varchar),
    col("actions_type", Varchar),
    col("snowflake_query_id", Varchar),
    col("snowflake_warehouse_name", Varchar),
    col("athena_query_execution_id", Varchar),
    col("actions_policy_names", Varchar),
    col("geo_location_attrs_country_name", Varchar),
    col("geo_location_attrs_city_name", Varchar),
    col("geo_location_attrs_timezone", Varchar),
    col("geo_location_attrs_client_ip_str", Varchar),
    col("identity_authentication_method", Varchar),
];

/// Staging-only column recording COPY order, used to make the merge
/// keep the first occurrence of a duplicated `flow_id`.
pub const STAGED_SEQ: &str = "staged_seq";

// ---------------------------------------------------------------------------
// SQL fragments
// ---------------------------------------------------------------------------

/// Comma-separated column names in export order.
pub fn column_list() -> String {
    AUDIT_COLUMNS
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Column definitions for the destination table, including the primary key
/// constraint on `flow_id`.
///
/// `table` is only used to name the constraint.
pub fn destination_definitions(table: &str) -> String {
    AUDIT_COLUMNS
        .iter()
        .map(|c| {
            if c.name == FLOW_ID {
                format!(
                    "{} {} CONSTRAINT {table}_flow_id_pk PRIMARY KEY",
                    c.name,
                    c.sql_type.as_sql()
                )
            } else {
                format!("{} {}", c.name, c.sql_type.as_sql())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Column definitions for a staging table: the audit columns without any key,
/// followed by the identity column [`STAGED_SEQ`].
pub fn staging_definitions() -> String {
    let mut defs: Vec<String> = AUDIT_COLUMNS
        .iter()
        .map(|c| format!("{} {}", c.name, c.sql_type.as_sql()))
        .collect();
    defs.push(format!("{STAGED_SEQ} bigint GENERATED ALWAYS AS IDENTITY"));
    defs.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_are_unique() {
        let mut names: Vec<_> = AUDIT_COLUMNS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), AUDIT_COLUMNS.len());
    }

    #[test]
    fn flow_id_is_fourth_column() {
        assert_eq!(AUDIT_COLUMNS[3].name, FLOW_ID);
    }

    #[test]
    fn column_list_starts_and_ends_as_exported() {
        let list = column_list();
        assert!(list.starts_with("flow_timestamp, account_id, data_store_id, flow_id,"));
        assert!(list.ends_with("identity_authentication_method"));
        assert_eq!(list.split(", ").count(), 34);
    }

    #[test]
    fn destination_definitions_key_flow_id_only() {
        let defs = destination_definitions("audit_data");
        assert!(defs.contains("flow_id varchar CONSTRAINT audit_data_flow_id_pk PRIMARY KEY"));
        assert_eq!(defs.matches("PRIMARY KEY").count(), 1);
        assert!(defs.starts_with("flow_timestamp timestamp"));
        assert!(defs.contains("queries_value bigint"));
    }

    #[test]
    fn staging_definitions_have_no_key() {
        let defs = staging_definitions();
        assert!(!defs.contains("PRIMARY KEY"));
        assert!(defs.contains("flow_id varchar,"));
        assert!(defs.ends_with("staged_seq bigint GENERATED ALWAYS AS IDENTITY"));
    }
}
