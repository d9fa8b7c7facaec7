//! HTTP server for Campus Board

pub mod http;

pub use http::{run, serve, AppState};
