use crate::asset_repo::{AssetRepo, AssetRepoError, AssetRow, AssetTable, AssetValues};
use crate::sqlx_repo::SQLxRepo;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{query, query_as, query_scalar, Executor, Postgres};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct AssetRowEntry {
    id: i32,
    data: Json<AssetValues>,
    uploaded_at: DateTime<Utc>,
}

impl From<AssetRowEntry> for AssetRow {
    fn from(value: AssetRowEntry) -> Self {
        AssetRow {
            id: value.id,
            values: value.data.0,
            uploaded_at: value.uploaded_at,
        }
    }
}

impl SQLxRepo {
    async fn select_schema<'e, E>(
        db_executor: E,
        user_id: &str,
    ) -> Result<Option<Vec<String>>, AssetRepoError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let columns = query_scalar::<_, Vec<String>>(
            "SELECT columns FROM asset_schemas WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(db_executor)
        .await
        .with_context(|| format!("Unable to get asset schema for user {}", user_id))?;
        Ok(columns)
    }
}

#[async_trait]
impl AssetRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_schema(&self, user_id: &str) -> Result<Option<Vec<String>>, AssetRepoError> {
        Self::select_schema(&self.pool, user_id).await
    }

    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    async fn append_rows(
        &self,
        user_id: &str,
        columns: &[String],
        rows: Vec<AssetValues>,
    ) -> Result<usize, AssetRepoError> {
        let mut db_transaction = self
            .pool
            .begin()
            .await
            .context("Unable to begin transaction")?;

        // Concurrent first uploads race here; whichever schema lands first is kept.
        query("INSERT INTO asset_schemas(user_id, columns) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(columns)
            .execute(&mut *db_transaction)
            .await
            .with_context(|| format!("Unable to create asset schema for user {}", user_id))?;

        let stored = Self::select_schema(&mut *db_transaction, user_id).await?;
        if stored.as_deref() != Some(columns) {
            return Err(AssetRepoError::SchemaConflict(user_id.to_owned()));
        }

        let count = rows.len();
        for values in rows {
            query("INSERT INTO asset_rows(user_id, data) VALUES ($1, $2)")
                .bind(user_id)
                .bind(Json(values))
                .execute(&mut *db_transaction)
                .await
                .with_context(|| format!("Unable to insert asset row for user {}", user_id))?;
        }

        db_transaction
            .commit()
            .await
            .context("Unable to commit transaction")?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn get_rows(&self, user_id: &str) -> Result<Option<AssetTable>, AssetRepoError> {
        let Some(columns) = Self::select_schema(&self.pool, user_id).await? else {
            return Ok(None);
        };

        let rows: Vec<AssetRowEntry> = query_as::<_, AssetRowEntry>(
            "SELECT id, data, uploaded_at FROM asset_rows WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Unable to get asset rows for user {}", user_id))?;

        Ok(Some(AssetTable {
            columns,
            rows: rows.into_iter().map(AssetRow::from).collect(),
        }))
    }
}
