pub mod auth;
pub mod commands;
pub mod config;
pub mod fingerprint;
pub mod job;
pub mod pipeline;
pub mod remote;
pub mod store;
pub mod walk;
