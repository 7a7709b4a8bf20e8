use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use finance_repo::asset_repo::AssetRepo;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::assets::{csv_import, prepare_upload, row_to_json, UploadRow};
use crate::error::HandlerError;
use crate::user::{ensure_same_user, UserId};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsQuery {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicUpload {
    pub user_id: Option<String>,
    pub csv_data: Vec<UploadRow>,
}

#[get("")]
pub async fn get_assets(
    asset_repo: web::Data<Arc<dyn AssetRepo>>,
    user_id: web::ReqData<UserId>,
    query: web::Query<AssetsQuery>,
) -> Result<impl Responder, HandlerError> {
    let user_id = user_id.into_inner();
    ensure_same_user(&user_id, query.user_id.as_deref())?;

    match asset_repo.get_rows(&user_id).await? {
        Some(table) => {
            let rows: Vec<Value> = table
                .rows
                .into_iter()
                .map(|row| row_to_json(&table.columns, row))
                .collect();
            Ok(HttpResponse::Ok().json(rows))
        }
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "No data found for this user" }))),
    }
}

#[post("/upload-dynamic")]
pub async fn upload_dynamic(
    asset_repo: web::Data<Arc<dyn AssetRepo>>,
    user_id: web::ReqData<UserId>,
    upload: web::Json<DynamicUpload>,
) -> Result<impl Responder, HandlerError> {
    let user_id = user_id.into_inner();
    let upload = upload.into_inner();
    ensure_same_user(&user_id, upload.user_id.as_deref())?;

    store_rows(asset_repo.get_ref().as_ref(), &user_id, upload.csv_data).await
}

#[post("/upload-csv")]
pub async fn upload_csv(
    asset_repo: web::Data<Arc<dyn AssetRepo>>,
    user_id: web::ReqData<UserId>,
    body: String,
) -> Result<impl Responder, HandlerError> {
    let rows = csv_import::parse_rows(body.as_bytes())?;
    store_rows(asset_repo.get_ref().as_ref(), &user_id.into_inner(), rows).await
}

async fn store_rows(
    asset_repo: &dyn AssetRepo,
    user_id: &str,
    rows: Vec<UploadRow>,
) -> Result<HttpResponse, HandlerError> {
    let schema = asset_repo.get_schema(user_id).await?;
    let prepared = prepare_upload(schema, rows)?;
    let stored = asset_repo
        .append_rows(user_id, &prepared.columns, prepared.rows)
        .await?;
    info!(%user_id, rows = stored, "Stored asset rows");

    Ok(HttpResponse::Created().json(json!({
        "message": "CSV Data Saved Successfully",
        "rows": stored,
    })))
}
