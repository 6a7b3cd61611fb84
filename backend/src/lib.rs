//! In-Paw-Dia Backend Library
//!
//! This library exports the core modules for the In-Paw-Dia API server:
//! token-based authentication with refresh rotation, role-gated routes and
//! the breed catalog.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
