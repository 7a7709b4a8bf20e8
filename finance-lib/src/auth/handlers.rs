use crate::auth::jwt::JWTAuth;
use crate::auth::password;
use crate::error::HandlerError;
use crate::user::UserId;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use anyhow::anyhow;
use finance_repo::user_repo::{User, UserRepo, UserRepoError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: UserId,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct UserCredentials {
    pub email: UserId,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[post("/api/signup")]
pub async fn signup(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    request: web::Json<SignupRequest>,
) -> Result<impl Responder, HandlerError> {
    let request = request.into_inner();
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(HandlerError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let password_hash = password::encode_password(&request.password)?;
    user_repo
        .create_user(User::new(request.email.clone(), request.name, password_hash))
        .await?;
    info!(user_id = %request.email, "Registered user");

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully",
    })))
}

#[post("/api/login")]
pub async fn login(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    credentials: web::Json<UserCredentials>,
    req: HttpRequest,
) -> Result<impl Responder, HandlerError> {
    let credentials = credentials.into_inner();

    let user = match user_repo.get_user(&credentials.email).await {
        Ok(user) => user,
        Err(UserRepoError::UserNotFound(_)) => return Err(HandlerError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    if !password::verify_password(&credentials.password, &user.password_hash)? {
        return Err(HandlerError::InvalidCredentials);
    }

    let jwt_auth = req
        .app_data::<JWTAuth>()
        .ok_or_else(|| anyhow!("JWTAuth is not configured"))?;
    let token = jwt_auth.create_token(user.id)?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}
