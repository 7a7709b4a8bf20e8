#![allow(dead_code)]

use std::sync::Arc;

use fake::faker::name::en::Name;
use fake::Fake;
use finance_lib::advisor::LanguageModel;
use finance_lib::auth::jwt::JWTAuth;
use finance_lib::plaid::sync::SyncOptions;
use finance_lib::plaid::Aggregator;
use finance_lib::user::UserId;
use finance_lib::AppDependencies;
use rstest::*;
use tracing::info;
use tracing::Level;
use uuid::Uuid;

use finance_repo::asset_repo::AssetRepo;
use finance_repo::user_repo::User;
use finance_repo::user_repo::UserRepo;
use finance_repo::HealthCheck;

pub mod mock;

/// Builds an app serving only the asset routes, authenticated as `$user_id`.
macro_rules! build_app {
    ($asset_repo:ident, $user_id:expr) => {{
        let app = App::new()
            .app_data(Data::new($asset_repo))
            .app_data(finance_lib::json_config())
            .wrap(finance_lib::tracing::create_middleware())
            .service(
                finance_lib::assets::asset_service()
                    .wrap(MockAuthentication { user_id: $user_id }),
            );
        tracing::info!("Built app");
        app
    }};
}

/// Builds the full app, including bearer token authentication.
macro_rules! build_full_app {
    ($dependencies:expr) => {{
        let app = App::new()
            .wrap(finance_lib::tracing::create_middleware())
            .configure(finance_lib::app_config_func($dependencies));
        tracing::info!("Built app");
        test::init_service(app).await
    }};
}

pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestUser {
    pub user_id: UserId,
    repo: Arc<dyn UserRepo>,
}

impl TestUser {
    pub async fn new(user_repo: Arc<dyn UserRepo>) -> TestUser {
        let user_id = format!("test-user-{}@example.com", Uuid::new_v4());
        let name: String = Name().fake();
        let user = User::new(
            user_id.clone(),
            name,
            finance_lib::auth::password::encode_password(PASSWORD).unwrap(),
        );
        user_repo.create_user(user).await.unwrap();
        info!(%user_id, "Created user");
        TestUser {
            user_id,
            repo: user_repo,
        }
    }

    pub fn bearer(&self, jwt_auth: &JWTAuth) -> (&'static str, String) {
        let token = jwt_auth.create_token(self.user_id.clone()).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }

    /// Stores an access token as if the user had linked a bank.
    pub async fn link(&self, access_token: &str) {
        self.repo
            .set_access_token(&self.user_id, access_token)
            .await
            .unwrap()
    }

    pub async fn delete(&self) {
        self.repo.delete_user(&self.user_id).await.unwrap()
    }
}

#[fixture]
#[once]
pub fn tracing_setup() -> () {
    tracing_subscriber::fmt()
        .pretty()
        .with_max_level(Level::DEBUG)
        .init();
    info!("tracing initialized");
}

#[fixture]
pub fn repos() -> (Arc<dyn UserRepo>, Arc<dyn AssetRepo>, Arc<dyn HealthCheck>) {
    finance_repo::mem_repo::create_repos()
}

#[fixture]
pub fn jwt_auth() -> JWTAuth {
    let secret: [u8; 32] = rand::random();
    JWTAuth::from_secret(secret.to_vec())
}

pub fn dependencies(
    jwt_auth: &JWTAuth,
    repos: (Arc<dyn UserRepo>, Arc<dyn AssetRepo>, Arc<dyn HealthCheck>),
    aggregator: Arc<dyn Aggregator>,
    language_model: Option<Arc<dyn LanguageModel>>,
) -> AppDependencies {
    let (user_repo, asset_repo, health_check) = repos;
    AppDependencies {
        jwt_auth: jwt_auth.clone(),
        user_repo,
        asset_repo,
        health_check,
        aggregator,
        language_model,
        sync_options: SyncOptions {
            max_pages: 5,
            ..SyncOptions::default()
        },
        signups_enabled: true,
    }
}
