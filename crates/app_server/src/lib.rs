//! File manager HTTP server
//!
//! The JSON API under `/file-manager` plus read-only access to stored files.

pub mod app;
mod error;
pub mod routes;

pub use routes::router;
