//! API handlers for the auth namespaces and service health.

pub mod auth;
pub mod health;
