pub mod auth;
pub mod checklist;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod reporting;
pub mod routes;
pub mod schema;
pub mod state;
pub mod utils;
