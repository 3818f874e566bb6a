//! Tag Controller - tailnet device tag reconciliation with an approval API.

pub mod config;
pub mod handlers;
pub mod models;
pub mod reconciler;
pub mod services;
pub mod startup;
