use crate::asset_repo::AssetRepo;
use crate::user_repo::UserRepo;
use crate::HealthCheck;
use async_trait::async_trait;
use std::sync::Arc;

mod asset_repo;
mod user_repo;

pub struct MemHealthCheck;

#[async_trait]
impl HealthCheck for MemHealthCheck {
    async fn check(&self) -> bool {
        true
    }
}

pub fn create_repos() -> (Arc<dyn UserRepo>, Arc<dyn AssetRepo>, Arc<dyn HealthCheck>) {
    let user_repo = user_repo::MemUserRepo::new();
    let asset_repo = asset_repo::MemAssetRepo::new();

    (
        Arc::new(user_repo),
        Arc::new(asset_repo),
        Arc::new(MemHealthCheck),
    )
}
