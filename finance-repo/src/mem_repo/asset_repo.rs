use crate::asset_repo::{AssetRepo, AssetRepoError, AssetRow, AssetTable, AssetValues};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct State {
    schemas: HashMap<String, Vec<String>>,
    rows: HashMap<String, Vec<AssetRow>>,
    next_id: i32,
}

pub struct MemAssetRepo {
    state: RwLock<State>,
}

impl MemAssetRepo {
    pub fn new() -> Self {
        let state = State {
            schemas: HashMap::new(),
            rows: HashMap::new(),
            next_id: 1,
        };
        MemAssetRepo {
            state: RwLock::new(state),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<State>, anyhow::Error> {
        self.state
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<State>, anyhow::Error> {
        self.state
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl AssetRepo for MemAssetRepo {
    async fn get_schema(&self, user_id: &str) -> Result<Option<Vec<String>>, AssetRepoError> {
        let read_guard = self.read_lock()?;
        Ok(read_guard.schemas.get(user_id).cloned())
    }

    async fn append_rows(
        &self,
        user_id: &str,
        columns: &[String],
        rows: Vec<AssetValues>,
    ) -> Result<usize, AssetRepoError> {
        let mut write_guard = self.write_lock()?;

        let schema = write_guard
            .schemas
            .entry(user_id.to_owned())
            .or_insert_with(|| columns.to_vec());
        if schema.as_slice() != columns {
            return Err(AssetRepoError::SchemaConflict(user_id.to_owned()));
        }

        let uploaded_at = Utc::now();
        let mut new_rows = Vec::with_capacity(rows.len());
        for values in rows {
            new_rows.push(AssetRow {
                id: write_guard.next_id,
                values,
                uploaded_at,
            });
            write_guard.next_id += 1;
        }

        let count = new_rows.len();
        write_guard
            .rows
            .entry(user_id.to_owned())
            .or_default()
            .extend(new_rows);
        Ok(count)
    }

    async fn get_rows(&self, user_id: &str) -> Result<Option<AssetTable>, AssetRepoError> {
        let read_guard = self.read_lock()?;

        let Some(columns) = read_guard.schemas.get(user_id) else {
            return Ok(None);
        };
        let rows = read_guard.rows.get(user_id).cloned().unwrap_or_default();
        Ok(Some(AssetTable {
            columns: columns.clone(),
            rows,
        }))
    }
}
