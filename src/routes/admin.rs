//! Admin directory routes

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{authorize, json_response, read_json, FullBody};
use crate::auth::Action;
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct DisabledRequest {
    disabled: bool,
}

/// GET /admin/principals
pub async fn handle_list_principals(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::ListPrincipals)?;

    let principals = state.board.directory.principals().await?;
    Ok(json_response(StatusCode::OK, &principals))
}

/// PUT /admin/principals/{id}/disabled
pub async fn handle_set_disabled(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::ToggleDisabled)?;

    let body: DisabledRequest = read_json(req, state.args.max_body_bytes).await?;
    state.board.directory.set_disabled(id, body.disabled).await?;
    info!(
        "{} set disabled={} on principal {}",
        caller.email(),
        body.disabled,
        id
    );

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "id": id, "disabled": body.disabled }),
    ))
}
