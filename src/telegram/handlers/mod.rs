//! Message handlers for the bot: commands, menu buttons, and the
//! budget dialogue.

pub mod commands;
pub mod exchange;
pub mod finances;
pub mod registration;
pub mod schema;
pub mod tips;
pub mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError, HandlerResult};
