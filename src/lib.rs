//! Warehouse Dash - rolling temperature and humidity charts per sensor
//!
//! This library exposes the core modules for testing and reuse.

pub mod common;
pub mod config;
pub mod error;
pub mod history;
pub mod refresh;
pub mod render;
pub mod routes;
pub mod source;
