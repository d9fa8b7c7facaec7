//! Request authentication
//!
//! Bearer session tokens are verified, then the session is resolved against
//! the directory with the same rules the identity gate applies. A disabled
//! principal is rejected on its next request.

use hyper::body::Incoming;
use hyper::header::AUTHORIZATION;
use hyper::{HeaderMap, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{json_response, read_json, FullBody};
use crate::auth::{extract_token_from_header, is_action_allowed, Action};
use crate::identity::{resolve, Session};
use crate::model::{Principal, Role};
use crate::server::AppState;
use crate::store::Stored;
use crate::types::{BoardError, Result};

/// An authenticated, active principal
#[derive(Debug, Clone)]
pub struct Caller {
    pub session: Session,
    pub principal: Stored<Principal>,
}

impl Caller {
    pub fn email(&self) -> &str {
        &self.principal.email
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn can(&self, action: Action) -> bool {
        is_action_allowed(self.role(), action)
    }

    pub fn require(&self, action: Action) -> Result<()> {
        if self.can(action) {
            return Ok(());
        }
        debug!("{} ({}) denied: {}", self.email(), self.role(), action);
        Err(BoardError::Forbidden(format!(
            "{} requires another role",
            action
        )))
    }
}

fn get_auth_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Verify the bearer token; does not consult the directory
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Session> {
    let token = extract_token_from_header(get_auth_header(headers))
        .ok_or_else(|| BoardError::Unauthorized("No token provided".into()))?;
    state.sessions.verify(token)
}

/// Verify the token and resolve an active principal
pub async fn authorize(headers: &HeaderMap, state: &AppState) -> Result<Caller> {
    let session = authenticate(headers, state)?;
    let principal = resolve(&state.board.directory, &session)
        .await
        .into_active()?;
    Ok(Caller { session, principal })
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// POST /auth/register
pub async fn handle_register(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let session = authenticate(req.headers(), &state)?;
    let body: RegisterRequest = read_json(req, state.args.max_body_bytes).await?;

    let principal = state
        .board
        .directory
        .register(&session.uid, &session.email, body.role)
        .await?;

    Ok(json_response(StatusCode::CREATED, &principal))
}

/// GET /me
pub async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    Ok(json_response(
        StatusCode::OK,
        &MeResponse {
            id: caller.principal.id.clone(),
            email: caller.email().to_string(),
            role: caller.role(),
        },
    ))
}
