pub mod catalog;
pub mod config;
pub mod db;
pub mod editor;
pub mod error;
pub mod ident;
pub mod ingest;
pub mod models;
pub mod search;
pub mod store;
pub mod utils;
