pub mod api;
pub mod config;
pub mod models;
pub mod queue;
pub mod transports;
