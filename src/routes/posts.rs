//! Post and comment routes

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{authorize, json_response, parse_query, read_json, FullBody};
use crate::auth::Action;
use crate::model::{Category, NewPost, PostUpdate};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct ListPostsQuery {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    id: String,
    indexed: bool,
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct DeletedResponse<'a> {
    deleted: &'a str,
}

/// GET /posts[?category=]
pub async fn handle_list_posts(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::ReadPosts)?;

    let query: ListPostsQuery = parse_query(req.uri().query())?;
    let posts = match query.category {
        Some(name) => {
            let category: Category = name.parse()?;
            state.board.content.posts_by_category(category).await?
        }
        None => state.board.content.posts().await?,
    };

    Ok(json_response(StatusCode::OK, &posts))
}

/// POST /posts
pub async fn handle_create_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::CreatePost)?;

    let draft: NewPost = read_json(req, state.args.max_body_bytes).await?;
    let created = state.board.create_post(caller.email(), draft).await?;

    Ok(json_response(
        StatusCode::CREATED,
        &CreatedResponse {
            id: created.post.id,
            indexed: created.indexed,
        },
    ))
}

/// GET /posts/{id}
pub async fn handle_get_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::ReadPosts)?;

    let post = state.board.content.get_post(id).await?;
    Ok(json_response(StatusCode::OK, &post))
}

/// PATCH /posts/{id}; the author or a moderator
pub async fn handle_update_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;

    let post = state.board.content.get_post(id).await?;
    if post.created_by != caller.email() {
        caller.require(Action::EditAnyPost)?;
    }

    let update: PostUpdate = read_json(req, state.args.max_body_bytes).await?;
    let updated = state.board.content.update_post(id, update).await?;
    Ok(json_response(StatusCode::OK, &updated))
}

/// DELETE /posts/{id}
pub async fn handle_delete_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::DeletePost)?;

    state.board.content.delete_post(id).await?;
    Ok(json_response(StatusCode::OK, &DeletedResponse { deleted: id }))
}

/// GET /posts/{id}/comments
pub async fn handle_list_comments(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::ReadPosts)?;

    let comments = state.board.content.comments(post_id).await?;
    Ok(json_response(StatusCode::OK, &comments))
}

/// POST /posts/{id}/comments
pub async fn handle_add_comment(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
) -> Result<Response<FullBody>> {
    let caller = authorize(req.headers(), &state).await?;
    caller.require(Action::Comment)?;

    let body: CommentRequest = read_json(req, state.args.max_body_bytes).await?;
    let comment = state.board.content.add_comment(post_id, &body.text).await?;
    Ok(json_response(StatusCode::CREATED, &comment))
}
