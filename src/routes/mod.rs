//! HTTP routes for Campus Board
//!
//! Every handler returns `Result<Response<FullBody>>`; the server turns
//! errors into `{"error", "code"}` bodies with the mapped status.

pub mod admin;
pub mod auth;
pub mod health;
pub mod images;
pub mod notifications;
pub mod posts;
pub mod search;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{BoardError, Result};

pub use admin::{handle_list_principals, handle_set_disabled};
pub use auth::{authenticate, authorize, handle_me, handle_register, Caller};
pub use health::{handle_categories, health_check};
pub use images::handle_upload;
pub use notifications::{
    handle_list_notifications, handle_list_subscriptions, handle_mark_read, handle_subscribe,
};
pub use posts::{
    handle_add_comment, handle_create_post, handle_delete_post, handle_get_post,
    handle_list_comments, handle_list_posts, handle_update_post,
};
pub use search::handle_search;

pub type FullBody = Full<Bytes>;

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    code: &'a str,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

pub fn error_response(err: &BoardError) -> Response<FullBody> {
    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.to_string(),
            code: err.code(),
        },
    )
}

/// Read the whole body, refusing anything over `limit` bytes
pub async fn read_body(req: Request<Incoming>, limit: usize) -> Result<Bytes> {
    Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| BoardError::BadRequest(format!("Failed to read request body: {}", e)))
}

pub async fn read_json<T: DeserializeOwned>(req: Request<Incoming>, limit: usize) -> Result<T> {
    let body = read_body(req, limit).await?;
    serde_json::from_slice(&body)
        .map_err(|e| BoardError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Decode the query string, treating a missing one as empty
pub fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| BoardError::BadRequest(format!("Invalid query string: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Q {
        q: Option<String>,
    }

    #[test]
    fn test_parse_query() {
        let q: Q = parse_query(Some("q=soccer%20tryouts")).unwrap();
        assert_eq!(q.q.as_deref(), Some("soccer tryouts"));
        let empty: Q = parse_query(None).unwrap();
        assert!(empty.q.is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(&BoardError::Forbidden("nope".into()));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
