#[macro_use]
extern crate actix_web;

use std::sync::Arc;

use actix_web::error::JsonPayloadError;
use actix_web::web::{self, Data, ServiceConfig};
use actix_web::HttpResponse;
use actix_web_httpauth::middleware::HttpAuthentication;
use finance_repo::asset_repo::AssetRepo;
use finance_repo::user_repo::UserRepo;
use finance_repo::HealthCheck;
use ::tracing::error;

use crate::advisor::LanguageModel;
use crate::auth::jwt::JWTAuth;
use crate::plaid::sync::SyncOptions;
use crate::plaid::Aggregator;

pub mod advisor;
pub mod assets;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod plaid;
pub mod tracing;
pub mod user;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Everything the HTTP layer needs. Built once at startup and cloned into each worker.
#[derive(Clone)]
pub struct AppDependencies {
    pub jwt_auth: JWTAuth,
    pub user_repo: Arc<dyn UserRepo>,
    pub asset_repo: Arc<dyn AssetRepo>,
    pub health_check: Arc<dyn HealthCheck>,
    pub aggregator: Arc<dyn Aggregator>,
    pub language_model: Option<Arc<dyn LanguageModel>>,
    pub sync_options: SyncOptions,
    pub signups_enabled: bool,
}

pub fn app_config_func(dependencies: AppDependencies) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let bearer_auth_middleware = HttpAuthentication::bearer(auth::credentials_validator);

        let mut api = web::scope("/api")
            .configure(plaid::configure)
            .service(assets::asset_service());
        if let Some(language_model) = dependencies.language_model {
            api = api
                .app_data(Data::new(language_model))
                .service(advisor::advisor_service());
        }

        cfg.app_data(dependencies.jwt_auth)
            .app_data(Data::new(dependencies.user_repo))
            .app_data(Data::new(dependencies.asset_repo))
            .app_data(Data::new(dependencies.health_check))
            .app_data(Data::new(dependencies.aggregator))
            .app_data(Data::new(dependencies.sync_options))
            .app_data(json_config())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .service(health::health_check);
        auth::configure(cfg, dependencies.signups_enabled);
        cfg.service(api.wrap(bearer_auth_middleware));
    }
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_UPLOAD_BYTES)
        .error_handler(|err, req| {
            error!(req_path = req.path(), %err);
            match err {
                JsonPayloadError::Deserialize(deserialize_err) => {
                    let error_body = serde_json::json!({
                        "error": "Unable to parse JSON payload",
                        "detail": format!("{}", deserialize_err),
                    });
                    actix_web::error::InternalError::from_response(
                        deserialize_err,
                        HttpResponse::BadRequest()
                            .content_type("application/json")
                            .body(error_body.to_string()),
                    )
                    .into()
                }
                _ => err.into(),
            }
        })
}
