//! Library crate for ipintel-client exposing the batch lookup pipeline.
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod export;
pub mod input;
pub mod pipeline;
pub mod reconcile;
pub mod server;
pub mod table;
pub mod types;
