//! Subscription and notification routes

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{authorize, json_response, read_json, FullBody};
use crate::auth::Action;
use crate::model::{Category, Notification};
use crate::server::AppState;
use crate::store::Stored;
use crate::types::{BoardError, Result};

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
struct NotificationsResponse {
    notifications: Vec<Stored<Notification>>,
    unread: usize,
}

/// GET /subscriptions
pub async fn handle_list_subscriptions(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::Subscribe)?;

    let subscriptions = state.board.notifications.subscriptions(caller.email()).await?;
    Ok(json_response(StatusCode::OK, &subscriptions))
}

/// POST /subscriptions
pub async fn handle_subscribe(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::Subscribe)?;

    let body: SubscribeRequest = read_json(req, state.args.max_body_bytes).await?;
    if body.categories.is_empty() {
        return Err(BoardError::BadRequest("Select at least one category".into()));
    }

    let outcome = state
        .board
        .notifications
        .subscribe(caller.email(), &body.categories)
        .await?;
    Ok(json_response(StatusCode::OK, &outcome))
}

/// GET /notifications
pub async fn handle_list_notifications(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::ReadNotifications)?;

    let notifications = state.board.notifications.notifications(caller.email()).await?;
    let unread = notifications.iter().filter(|n| !n.read).count();
    Ok(json_response(
        StatusCode::OK,
        &NotificationsResponse {
            notifications,
            unread,
        },
    ))
}

/// POST /notifications/{id}/read
pub async fn handle_mark_read(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::ReadNotifications)?;

    // Someone else's notification looks the same as a missing one
    let notification = state.board.notifications.notification(id).await?;
    if notification.recipient_email != caller.email() {
        return Err(BoardError::not_found("notification", id));
    }

    state.board.notifications.mark_read(id).await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "id": id, "read": true }),
    ))
}
