// src/services/mod.rs
pub mod api_server;
pub mod event_log;
pub mod verifier;
