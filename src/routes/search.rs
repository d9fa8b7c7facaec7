//! Full-text search route

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{authorize, json_response, parse_query, FullBody};
use crate::auth::Action;
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// GET /search?q=
///
/// Index failures never surface here; they read as no results.
pub async fn handle_search(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::Search)?;

    let query: SearchQuery = parse_query(req.uri().query())?;
    let hits = state.board.search.search(&query.q).await;
    Ok(json_response(StatusCode::OK, &hits))
}
