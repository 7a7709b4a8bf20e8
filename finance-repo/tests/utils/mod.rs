use finance_repo::asset_repo::AssetRepo;
use finance_repo::user_repo::UserRepo;
use std::env;
use std::sync::Arc;

pub mod test_user;

#[derive(Debug)]
pub enum RepoType {
    SQLx,
    Mem,
}

/// Builds the repos under test. The SQLx repos need a database, so they are only built when
/// `TEST_DATABASE_URL` is set.
pub async fn build_repos(repo_type: RepoType) -> Option<(Arc<dyn UserRepo>, Arc<dyn AssetRepo>)> {
    match repo_type {
        RepoType::SQLx => {
            let database_url = env::var("TEST_DATABASE_URL").ok()?;
            let pool = finance_repo::sqlx_repo::connect(&database_url, 1)
                .await
                .unwrap();
            let (user_repo, asset_repo, _health_check) =
                finance_repo::sqlx_repo::create_repos(pool);
            Some((user_repo, asset_repo))
        }
        RepoType::Mem => {
            let (user_repo, asset_repo, _health_check) = finance_repo::mem_repo::create_repos();
            Some((user_repo, asset_repo))
        }
    }
}
