//! Image upload route

use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{authorize, json_response, parse_query, read_body, FullBody};
use crate::auth::Action;
use crate::server::AppState;
use crate::types::{BoardError, Result};

#[derive(Debug, Deserialize)]
struct UploadQuery {
    name: Option<String>,
}

/// POST /images?name=
///
/// The raw request body is the image; its `Content-Type` is forwarded.
pub async fn handle_upload(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::CreatePost)?;

    let images = state
        .board
        .images
        .clone()
        .ok_or_else(|| BoardError::BadRequest("Image uploads are not configured".into()))?;

    let query: UploadQuery = parse_query(req.uri().query())?;
    let file_name = query.name.unwrap_or_else(|| "upload".to_string());
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let body = read_body(req, state.args.max_body_bytes).await?;
    let url = images.upload(&file_name, &content_type, body.to_vec()).await?;

    Ok(json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "url": url }),
    ))
}
