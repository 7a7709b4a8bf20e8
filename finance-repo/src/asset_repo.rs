use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Column name to cell value. Cells absent from an upload are stored as `None`.
pub type AssetValues = HashMap<String, Option<String>>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetRow {
    pub id: i32,
    pub values: AssetValues,
    pub uploaded_at: DateTime<Utc>,
}

/// Everything a user has uploaded, together with the columns fixed by their first upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetTable {
    pub columns: Vec<String>,
    pub rows: Vec<AssetRow>,
}

#[derive(Error, Debug)]
pub enum AssetRepoError {
    #[error("Asset columns for user {0} do not match the stored schema")]
    SchemaConflict(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait AssetRepo: Sync + Send {
    async fn get_schema(&self, user_id: &str) -> Result<Option<Vec<String>>, AssetRepoError>;

    /// Stores `rows` for the user in one unit. If the user has no schema yet, `columns` becomes
    /// their schema. If a schema exists and differs from `columns`, nothing is stored and
    /// [AssetRepoError::SchemaConflict] is returned.
    async fn append_rows(
        &self,
        user_id: &str,
        columns: &[String],
        rows: Vec<AssetValues>,
    ) -> Result<usize, AssetRepoError>;

    /// Returns `None` when the user has never uploaded anything.
    async fn get_rows(&self, user_id: &str) -> Result<Option<AssetTable>, AssetRepoError>;
}
