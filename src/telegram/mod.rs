//! Telegram side of the application: the bot itself, chat handlers,
//! the budget dialogue state and the web mini-app HTTP API.

pub mod bot;
pub mod dialogue;
pub mod handlers;
pub mod keyboards;
pub mod webapp;
pub mod webapp_auth;

// Re-exports for convenience
pub use bot::{Command, create_bot, setup_bot_commands};
pub use dialogue::{BudgetDialogue, BudgetForm};
pub use handlers::{HandlerDeps, schema};
pub use webapp::{WebAppState, create_webapp_router, run_webapp_server};
