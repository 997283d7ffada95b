//! Single-video showcase site.
//!
//! An admin uploads videos and marks one as current; anonymous visitors see
//! the current video on the landing page. Metadata lives in SQLite
//! (`services::catalog_service`), video bytes on local disk
//! (`services::file_store`).

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;
