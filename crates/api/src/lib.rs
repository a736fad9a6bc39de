//! HTTP service for benefit notifications: in-app inbox, device token
//! registry and push delivery through Firebase Cloud Messaging.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
