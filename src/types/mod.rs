//! Shared types for Campus Board

mod error;

pub use error::{BoardError, Result};
