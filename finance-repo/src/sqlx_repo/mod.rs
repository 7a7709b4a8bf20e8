mod asset_repo;
mod user_repo;

use crate::asset_repo::AssetRepo;
use crate::user_repo::UserRepo;
use crate::HealthCheck;
use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{query, PgPool};
use std::sync::Arc;
use tracing::{error, info};

pub struct SQLxRepo {
    pool: PgPool,
}

impl SQLxRepo {
    pub fn new(pool: PgPool) -> SQLxRepo {
        SQLxRepo { pool }
    }
}

#[async_trait]
impl HealthCheck for SQLxRepo {
    async fn check(&self) -> bool {
        match query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                error!(%e, "Database health check failed");
                false
            }
        }
    }
}

/// Connects to the database and brings its schema up to date.
pub async fn connect(database_url: &str, max_pool_size: u32) -> Result<PgPool, anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_pool_size)
        .connect(database_url)
        .await
        .context("Unable to connect to database")?;

    info!("Running migrations");
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Unable to run migrations")?;

    Ok(pool)
}

pub fn create_repos(pool: PgPool) -> (Arc<dyn UserRepo>, Arc<dyn AssetRepo>, Arc<dyn HealthCheck>) {
    let repo = Arc::new(SQLxRepo::new(pool));
    (repo.clone(), repo.clone(), repo)
}
