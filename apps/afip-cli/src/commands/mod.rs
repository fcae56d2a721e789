//! CLI command implementations

pub mod auth;
pub mod status;
pub mod ticket;
