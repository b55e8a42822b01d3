pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod grid;
pub mod locales;
pub mod models;
pub mod profiler;
pub mod security;
pub mod server;
pub mod stats;
