use crate::error::HandlerError;
use crate::plaid::sync::{self, IncompleteReason, SyncOptions, SyncStatus};
use crate::plaid::{Aggregator, Transaction};
use crate::user::{ensure_same_user, UserId};
use actix_web::{web, HttpResponse, Responder};
use finance_repo::user_repo::UserRepo;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub cursor: Option<String>,
}

#[derive(Deserialize)]
pub struct ExchangeRequest {
    pub public_token: String,
    pub email: Option<String>,
}

#[derive(Serialize)]
struct TransactionsResponse {
    transactions: Vec<Transaction>,
    next_cursor: Option<String>,
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    incomplete_reason: Option<IncompleteReason>,
}

/// The access token stored when the user linked their bank. Tokens are never taken from the
/// request, so they stay out of request logs.
async fn stored_access_token(
    user_repo: &dyn UserRepo,
    user_id: &str,
) -> Result<String, HandlerError> {
    let user = user_repo.get_user(user_id).await?;
    user.access_token
        .ok_or_else(|| HandlerError::NotFound("No bank account linked".to_string()))
}

fn incomplete_reason(status: SyncStatus) -> Option<IncompleteReason> {
    match status {
        SyncStatus::Complete => None,
        SyncStatus::Incomplete(reason) => Some(reason),
    }
}

#[post("/create_link_token")]
pub async fn create_link_token(
    aggregator: web::Data<Arc<dyn Aggregator>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let link_token = aggregator.create_link_token(&user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(link_token))
}

#[post("/exchange_public_token")]
pub async fn exchange_public_token(
    aggregator: web::Data<Arc<dyn Aggregator>>,
    user_repo: web::Data<Arc<dyn UserRepo>>,
    user_id: web::ReqData<UserId>,
    request: web::Json<ExchangeRequest>,
) -> Result<impl Responder, HandlerError> {
    let user_id = user_id.into_inner();
    let request = request.into_inner();
    ensure_same_user(&user_id, request.email.as_deref())?;

    let access_token = aggregator
        .exchange_public_token(&request.public_token)
        .await?;
    user_repo.set_access_token(&user_id, &access_token).await?;
    info!(%user_id, "Linked bank account");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "access_token": access_token })))
}

#[get("/balance")]
pub async fn get_balances(
    aggregator: web::Data<Arc<dyn Aggregator>>,
    user_repo: web::Data<Arc<dyn UserRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let access_token = stored_access_token(user_repo.get_ref().as_ref(), &user_id).await?;
    let accounts = aggregator.get_balances(&access_token).await?;
    Ok(HttpResponse::Ok().json(accounts))
}

#[get("/details")]
pub async fn get_account_details(
    aggregator: web::Data<Arc<dyn Aggregator>>,
    user_repo: web::Data<Arc<dyn UserRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let access_token = stored_access_token(user_repo.get_ref().as_ref(), &user_id).await?;
    let details = aggregator.get_account_details(&access_token).await?;
    Ok(HttpResponse::Ok().json(details))
}

#[get("")]
pub async fn get_transactions(
    aggregator: web::Data<Arc<dyn Aggregator>>,
    user_repo: web::Data<Arc<dyn UserRepo>>,
    sync_options: web::Data<SyncOptions>,
    user_id: web::ReqData<UserId>,
    query: web::Query<TransactionsQuery>,
) -> Result<impl Responder, HandlerError> {
    let access_token = stored_access_token(user_repo.get_ref().as_ref(), &user_id).await?;

    let synced = sync::sync_transactions(
        aggregator.get_ref().as_ref(),
        &access_token,
        query.into_inner().cursor,
        &sync_options,
    )
    .await?;

    Ok(HttpResponse::Ok().json(TransactionsResponse {
        complete: synced.is_complete(),
        incomplete_reason: incomplete_reason(synced.status),
        transactions: synced.transactions,
        next_cursor: synced.next_cursor,
    }))
}

#[get("/summary")]
pub async fn get_transaction_summary(
    aggregator: web::Data<Arc<dyn Aggregator>>,
    user_repo: web::Data<Arc<dyn UserRepo>>,
    sync_options: web::Data<SyncOptions>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let access_token = stored_access_token(user_repo.get_ref().as_ref(), &user_id).await?;

    let synced =
        sync::sync_transactions(aggregator.get_ref().as_ref(), &access_token, None, &sync_options)
            .await?;
    let summary = sync::summarize(&synced.transactions);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "by_merchant": summary.by_merchant,
        "by_category": summary.by_category,
        "complete": synced.is_complete(),
    })))
}
