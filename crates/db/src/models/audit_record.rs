//! Audit entry model matching the destination table.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// One Satori data-flow entry as stored in the destination table.
///
/// `flow_id` is globally unique; every other field is descriptive and
/// nullable in practice.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AuditRecord {
    pub flow_timestamp: Option<NaiveDateTime>,
    pub account_id: Option<String>,
    pub data_store_id: Option<String>,
    pub flow_id: String,
    pub data_store_type: Option<String>,
    pub data_store_name: Option<String>,
    pub identity_name: Option<String>,
    pub identity_role: Option<String>,
    pub tool: Option<String>,
    pub locations_location: Option<String>,
    pub queries_value: Option<i64>,
    pub volume_value: Option<i64>,
    pub incident_ids: Option<String>,
    pub tags_name: Option<String>,
    pub source: Option<String>,
    pub records_value: Option<i64>,
    pub result_set: Option<String>,
    pub result_set_column_name: Option<String>,
    pub query_original_query: Option<String>,
    pub datasets_id: Option<String>,
    pub datasets_name: Option<String>,
    pub query_query_type: Option<String>,
    pub query_meta_data: Option<String>,
    pub query_meta_data_error: Option<String>,
    pub actions_type: Option<String>,
    pub snowflake_query_id: Option<String>,
    pub snowflake_warehouse_name: Option<String>,
    pub athena_query_execution_id: Option<String>,
    pub actions_policy_names: Option<String>,
    pub geo_location_attrs_country_name: Option<String>,
    pub geo_location_attrs_city_name: Option<String>,
    pub geo_location_attrs_timezone: Option<String>,
    pub geo_location_attrs_client_ip_str: Option<String>,
    pub identity_authentication_method: Option<String>,
}
