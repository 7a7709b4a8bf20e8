use actix_web::body::BoxBody;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use finance_repo::asset_repo::AssetRepoError;
use finance_repo::user_repo::UserRepoError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::advisor::LanguageModelError;
use crate::assets::IngestError;
use crate::plaid::AggregatorError;

/// Errors returned by request handlers. Server side failures are logged and reported to the
/// client without their details.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    BadRequest(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    UserRepo(#[from] UserRepoError),
    #[error(transparent)]
    AssetRepo(#[from] AssetRepoError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
    #[error(transparent)]
    LanguageModel(#[from] LanguageModelError),
    #[error(transparent)]
    Password(#[from] argon2::Error),
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            HandlerError::BadRequest(_) | HandlerError::Ingest(_) => StatusCode::BAD_REQUEST,
            HandlerError::Forbidden => StatusCode::FORBIDDEN,
            HandlerError::NotFound(_) | HandlerError::UserRepo(UserRepoError::UserNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            HandlerError::UserRepo(UserRepoError::UserAlreadyExists(_))
            | HandlerError::AssetRepo(AssetRepoError::SchemaConflict(_)) => StatusCode::CONFLICT,
            HandlerError::Aggregator(_) | HandlerError::LanguageModel(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        let status = self.status_code();
        if status.is_server_error() {
            error!(err = %self, "Request failed");
        }

        let body = match self {
            HandlerError::InvalidCredentials
            | HandlerError::BadRequest(_)
            | HandlerError::Forbidden
            | HandlerError::NotFound(_)
            | HandlerError::Ingest(_) => json!({ "error": self.to_string() }),
            HandlerError::UserRepo(UserRepoError::UserNotFound(_)) => {
                json!({ "error": "User not found" })
            }
            HandlerError::UserRepo(UserRepoError::UserAlreadyExists(_)) => {
                json!({ "message": "User already exists" })
            }
            HandlerError::AssetRepo(AssetRepoError::SchemaConflict(_)) => json!({
                "error": "Uploaded columns do not match the columns of earlier uploads",
            }),
            HandlerError::Aggregator(e) => json!({
                "error": "Bank data provider request failed",
                "error_code": e.error_code(),
            }),
            HandlerError::LanguageModel(_) => json!({ "error": "Language model request failed" }),
            _ => json!({ "error": "Server Error" }),
        };
        HttpResponse::build(status).json(body)
    }
}
