//! Naming of the transient staging table.
//!
//! Each invocation stages into its own table so concurrent or redelivered
//! invocations never drop or read each other's rows.

use std::fmt;

use uuid::Uuid;

/// Base name shared by every staging table.
pub const STAGING_BASE_NAME: &str = "satori_audit_tempbuffer";

/// A schema-qualified staging table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTable {
    schema: String,
    name: String,
}

impl StagingTable {
    /// Staging table unique to one invocation: `satori_audit_tempbuffer_<uuid>`.
    pub fn for_invocation(schema: &str, invocation_id: Uuid) -> Self {
        Self {
            schema: schema.to_string(),
            name: format!("{STAGING_BASE_NAME}_{}", invocation_id.simple()),
        }
    }

    /// The single staging table name used by older deployments.
    pub fn shared(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            name: STAGING_BASE_NAME.to_string(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Unqualified table name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StagingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
