//! Updraft API Library
//!
//! This crate provides the HTTP API handlers, middleware, and application setup.

// Module declarations
mod api_doc;
mod handlers;
mod telemetry;

// Public modules
pub mod access;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, FailedResponse, HttpAppError};
