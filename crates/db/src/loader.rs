//! Staged, idempotent load of an audit CSV export into the destination table.
//!
//! A load runs five steps against one session:
//!
//! ```text
//! Init -> TableEnsured -> StagingCreated -> Staged -> Merged -> CleanedUp -> Done
//! ```
//!
//! Each step returns a [`LoadError`] naming the step that failed; the stage
//! only advances on success. Deduplication is left to the destination's
//! primary key: the merge inserts with `ON CONFLICT (flow_id) DO NOTHING`, so
//! existing rows are never updated or deleted.

use satori_sync_core::audit_schema::{
    column_list, destination_definitions, staging_definitions, FLOW_ID, STAGED_SEQ,
};
use satori_sync_core::config::DbConfig;

use crate::staging::StagingTable;
use crate::DbPool;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Progress of a load, advanced after each successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    Init,
    TableEnsured,
    StagingCreated,
    Staged,
    Merged,
    CleanedUp,
    Done,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows copied into the staging table.
    pub staged: u64,
    /// Rows newly inserted into the destination (conflicts excluded).
    pub inserted: u64,
    pub stage: LoadStage,
}

/// A failed load step.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to ensure destination table {table}: {source}")]
    EnsureSchema {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to create staging table {table}: {source}")]
    CreateStaging {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to copy export into {table}: {source}")]
    Stage {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to merge {staging} into {table}: {source}")]
    Merge {
        table: String,
        staging: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to drop staging table {table}: {source}")]
    Cleanup {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

impl LoadError {
    /// The stage the load had reached when this error occurred.
    pub fn reached(&self) -> LoadStage {
        match self {
            LoadError::EnsureSchema { .. } => LoadStage::Init,
            LoadError::CreateStaging { .. } => LoadStage::TableEnsured,
            LoadError::Stage { .. } => LoadStage::StagingCreated,
            LoadError::Merge { .. } => LoadStage::Staged,
            LoadError::Cleanup { .. } => LoadStage::Merged,
        }
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Owns the database session and both tables' lifecycle for one invocation.
pub struct Loader {
    pool: DbPool,
    /// Unqualified destination table name.
    table: String,
    /// `schema.table`.
    destination: String,
    staging: StagingTable,
}

impl Loader {
    pub fn new(pool: DbPool, config: &DbConfig, staging: StagingTable) -> Self {
        Self {
            pool,
            table: config.table.clone(),
            destination: config.qualified_table(),
            staging,
        }
    }

    pub fn staging(&self) -> &StagingTable {
        &self.staging
    }

    /// Run all steps for one CSV export.
    ///
    /// Once the staging table may exist it is dropped before returning, even
    /// when an earlier step failed. The first error wins.
    pub async fn load(&self, csv: &str) -> Result<LoadReport, LoadError> {
        let mut stage = LoadStage::Init;

        self.ensure_schema().await?;
        stage = advance(stage, LoadStage::TableEnsured);

        let outcome = self.load_staged(csv, &mut stage).await;

        let cleanup = self.cleanup().await;
        match (outcome, cleanup) {
            (Ok((staged, inserted)), Ok(())) => {
                stage = advance(stage, LoadStage::CleanedUp);
                stage = advance(stage, LoadStage::Done);
                Ok(LoadReport {
                    staged,
                    inserted,
                    stage,
                })
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                tracing::warn!(
                    error = %cleanup_err,
                    "Staging cleanup also failed after load error",
                );
                Err(e)
            }
        }
    }

    async fn load_staged(&self, csv: &str, stage: &mut LoadStage) -> Result<(u64, u64), LoadError> {
        self.create_staging().await?;
        *stage = advance(*stage, LoadStage::StagingCreated);

        let staged = self.stage(csv).await?;
        *stage = advance(*stage, LoadStage::Staged);

        let inserted = self.merge().await?;
        *stage = advance(*stage, LoadStage::Merged);

        Ok((staged, inserted))
    }

    /// Create the destination table with its `flow_id` primary key if absent.
    pub async fn ensure_schema(&self) -> Result<(), LoadError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.destination,
            destination_definitions(&self.table)
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|source| {
                tracing::error!(table = %self.destination, error = %source, "Create destination table failed");
                LoadError::EnsureSchema {
                    table: self.destination.clone(),
                    source,
                }
            })?;
        tracing::debug!(table = %self.destination, "Destination table ensured");
        Ok(())
    }

    /// Create the unkeyed staging table if absent.
    pub async fn create_staging(&self) -> Result<(), LoadError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.staging,
            staging_definitions()
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|source| {
                tracing::error!(staging_table = %self.staging, error = %source, "Create staging table failed");
                LoadError::CreateStaging {
                    table: self.staging.to_string(),
                    source,
                }
            })?;
        tracing::debug!(staging_table = %self.staging, "Staging table created");
        Ok(())
    }

    /// Bulk copy CSV text (header row, comma delimited) into the staging table.
    ///
    /// Returns the number of rows copied. A blank body copies nothing. On
    /// failure the staging table is dropped so no partial data survives.
    pub async fn stage(&self, csv: &str) -> Result<u64, LoadError> {
        if csv.trim().is_empty() {
            tracing::info!(staging_table = %self.staging, "Export is empty, nothing to stage");
            return Ok(0);
        }

        match self.copy_in(csv).await {
            Ok(rows) => {
                tracing::info!(staging_table = %self.staging, rows, "Export staged");
                Ok(rows)
            }
            Err(source) => {
                tracing::error!(staging_table = %self.staging, error = %source, "Copy into staging table failed");
                if let Err(drop_err) = self.drop_staging().await {
                    tracing::warn!(
                        staging_table = %self.staging,
                        error = %drop_err,
                        "Could not drop staging table after failed copy",
                    );
                }
                Err(LoadError::Stage {
                    table: self.staging.to_string(),
                    source,
                })
            }
        }
    }

    /// Insert staged rows into the destination, skipping existing `flow_id`s.
    ///
    /// Rows are inserted in COPY order so the first occurrence of a duplicated
    /// `flow_id` within one export is the one kept. The statement runs under a
    /// transaction-scoped advisory lock keyed on the destination name, which
    /// serialises concurrent merges into the same table.
    ///
    /// Returns the number of rows inserted.
    pub async fn merge(&self) -> Result<u64, LoadError> {
        let merge_err = |source: sqlx::Error| {
            tracing::error!(
                table = %self.destination,
                staging_table = %self.staging,
                error = %source,
                "Merge into destination failed",
            );
            LoadError::Merge {
                table: self.destination.clone(),
                staging: self.staging.to_string(),
                source,
            }
        };

        let columns = column_list();
        let sql = format!(
            "INSERT INTO {dest} ({columns}) \
             SELECT {columns} FROM {staging} ORDER BY {STAGED_SEQ} \
             ON CONFLICT ({FLOW_ID}) DO NOTHING",
            dest = self.destination,
            staging = self.staging,
        );

        let mut tx = self.pool.begin().await.map_err(merge_err)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&self.destination)
            .execute(&mut *tx)
            .await
            .map_err(merge_err)?;

        let result = sqlx::query(&sql).execute(&mut *tx).await.map_err(merge_err)?;
        tx.commit().await.map_err(merge_err)?;

        let inserted = result.rows_affected();
        tracing::info!(table = %self.destination, inserted, "Staged rows merged");
        Ok(inserted)
    }

    /// Drop the staging table.
    pub async fn cleanup(&self) -> Result<(), LoadError> {
        self.drop_staging().await.map_err(|source| {
            tracing::error!(staging_table = %self.staging, error = %source, "Drop staging table failed");
            LoadError::Cleanup {
                table: self.staging.to_string(),
                source,
            }
        })?;
        tracing::debug!(staging_table = %self.staging, "Staging table dropped");
        Ok(())
    }

    /// Close the session. Safe to call after any outcome.
    pub async fn close(self) {
        self.pool.close().await;
    }

    // ---- private helpers ----

    async fn copy_in(&self, csv: &str) -> Result<u64, sqlx::Error> {
        let statement = format!(
            "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true, DELIMITER ',')",
            self.staging,
            column_list()
        );

        let mut conn = self.pool.acquire().await?;
        let mut copy = conn.copy_in_raw(&statement).await?;
        let sent = copy.send(csv.as_bytes()).await.map(|_| ());
        if let Err(e) = sent {
            // The server may already have rejected the copy.
            let _ = copy.abort(e.to_string()).await;
            return Err(e);
        }
        copy.finish().await
    }

    async fn drop_staging(&self) -> Result<(), sqlx::Error> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.staging))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn advance(from: LoadStage, to: LoadStage) -> LoadStage {
    tracing::debug!(from = ?from, to = ?to, "Load stage advanced");
    to
}
