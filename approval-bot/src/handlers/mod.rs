//! HTTP handlers for approval-bot.

pub mod health;
pub mod interactions;

pub use health::health_check;
pub use interactions::{interactions, COMMAND_NAME};
