//! HTTP server implementation
//!
//! hyper http1 with TokioIo; one task per connection.

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::SessionValidator;
use crate::board::Board;
use crate::config::Args;
use crate::routes::{self, FullBody};
use crate::types::{BoardError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub board: Board,
    pub sessions: SessionValidator,
    /// Name of the document store backend, reported by /health
    pub backend: &'static str,
}

impl AppState {
    pub fn new(
        args: Args,
        board: Board,
        sessions: SessionValidator,
        backend: &'static str,
    ) -> Self {
        Self {
            args,
            board,
            sessions,
            backend,
        }
    }
}

/// Bind the configured address and serve until `shutdown` resolves
pub async fn run(state: Arc<AppState>, shutdown: impl Future<Output = ()>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Campus Board listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - in-memory fallbacks and default secret allowed");
    }

    serve(listener, state, shutdown).await
}

/// Accept connections on an already bound listener
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle_request(state, addr, req).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            debug!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    Ok(())
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (&method, segments.as_slice()) {
        // Health and reference data
        (&Method::GET, ["health"]) | (&Method::GET, ["healthz"]) => {
            Ok(routes::health_check(&state))
        }
        (&Method::GET, ["categories"]) => Ok(routes::handle_categories()),

        // CORS preflight
        (&Method::OPTIONS, _) => Ok(preflight_response()),

        // Principal
        (&Method::POST, ["auth", "register"]) => routes::handle_register(req, state).await,
        (&Method::GET, ["me"]) => routes::handle_me(req, state).await,

        // Posts and comments
        (&Method::GET, ["posts"]) => routes::handle_list_posts(req, state).await,
        (&Method::POST, ["posts"]) => routes::handle_create_post(req, state).await,
        (&Method::GET, ["posts", id]) => routes::handle_get_post(req, state, id).await,
        (&Method::PATCH, ["posts", id]) => routes::handle_update_post(req, state, id).await,
        (&Method::DELETE, ["posts", id]) => routes::handle_delete_post(req, state, id).await,
        (&Method::GET, ["posts", id, "comments"]) => {
            routes::handle_list_comments(req, state, id).await
        }
        (&Method::POST, ["posts", id, "comments"]) => {
            routes::handle_add_comment(req, state, id).await
        }

        // Subscriptions and notifications
        (&Method::GET, ["subscriptions"]) => routes::handle_list_subscriptions(req, state).await,
        (&Method::POST, ["subscriptions"]) => routes::handle_subscribe(req, state).await,
        (&Method::GET, ["notifications"]) => routes::handle_list_notifications(req, state).await,
        (&Method::POST, ["notifications", id, "read"]) => {
            routes::handle_mark_read(req, state, id).await
        }

        // Search
        (&Method::GET, ["search"]) => routes::handle_search(req, state).await,

        // Admin directory
        (&Method::GET, ["admin", "principals"]) => {
            routes::handle_list_principals(req, state).await
        }
        (&Method::PUT, ["admin", "principals", id, "disabled"]) => {
            routes::handle_set_disabled(req, state, id).await
        }

        // Images
        (&Method::POST, ["images"]) => routes::handle_upload(req, state).await,

        _ => Err(BoardError::NotFound(format!("No route for {} {}", method, path))),
    };

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            if err.status_code().is_server_error() {
                error!("{} {} failed: {}", method, path, err);
            } else {
                debug!("{} {} rejected: {}", method, path, err);
            }
            routes::error_response(&err)
        }
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(FullBody::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    response
}
