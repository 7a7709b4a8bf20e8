use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::advisor::{advice_prompt, reply_lines, LanguageModel};
use crate::error::HandlerError;
use crate::user::UserId;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    lines: Vec<String>,
}

#[post("/chat")]
pub async fn chat(
    language_model: web::Data<Arc<dyn LanguageModel>>,
    user_id: web::ReqData<UserId>,
    request: web::Json<ChatRequest>,
) -> Result<impl Responder, HandlerError> {
    let message = request.into_inner().message;
    if message.trim().is_empty() {
        return Err(HandlerError::BadRequest("Message must not be empty".to_string()));
    }

    let reply = language_model.generate(&advice_prompt(message.trim())).await?;
    let lines = reply_lines(&reply);
    info!(user_id = %user_id.as_str(), lines = lines.len(), "Generated advice");
    Ok(HttpResponse::Ok().json(ChatResponse { reply, lines }))
}
