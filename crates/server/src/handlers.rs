//! Route handlers.

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::orchestrator::DatabaseAction;
use crate::session;
use dbexport_core::ExportError;

/// Query parameter carrying the signed export token.
pub const TOKEN_PARAM: &str = "s";

/// First `s` value in `query`, or empty.
///
/// Repeated or malformed parameters fall through to the token check
/// instead of failing extraction.
pub fn export_token(query: &str) -> String {
    web::Query::<Vec<(String, String)>>::from_query(query)
        .map(|q| q.into_inner())
        .unwrap_or_default()
        .into_iter()
        .find(|(key, _)| key == TOKEN_PARAM)
        .map(|(_, value)| value)
        .unwrap_or_default()
}

/// Body of `GET /{database}`.
#[derive(Debug, Serialize)]
pub struct DatabasePage {
    pub database: String,
    pub actions: Vec<DatabaseAction>,
}

/// `GET /{database}/-/export-database?s=<token>`
pub async fn export_database(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let database = path.into_inner();
    let token = export_token(req.query_string());
    let csrf = session::csrf_token(&req).unwrap_or_default();

    let export = state
        .orchestrator
        .prepare(&database, &token, &csrf)
        .await?;
    let filename = export.download_name().to_string();
    let size = export.size();
    let stream = export.into_stream(state.chunk_size).await?;

    info!(database = %database, file = %filename, size, "streaming export");
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .streaming(stream))
}

/// `GET /{database}`: the export link, if the caller may see it.
pub async fn database_page(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let database = path.into_inner();
    if state.orchestrator.registry().get(&database).is_none() {
        return Err(ExportError::DatabaseNotFound { name: database }.into());
    }

    let (csrf, is_new) = session::csrf_token_or_new(&req);
    let actor = session::actor(&req, state.orchestrator.signer());
    let actions = state
        .orchestrator
        .database_actions(actor.as_ref(), &database, &csrf)
        .await;

    let mut resp = HttpResponse::Ok();
    if is_new {
        resp.cookie(session::csrf_cookie(csrf));
    }
    Ok(resp.json(DatabasePage { database, actions }))
}
