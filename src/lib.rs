//! Kopilka — Telegram bot for personal budgeting.
//!
//! Two loosely coupled halves share one SQLite database: the chat bot
//! (registration, a three-step budget dialogue, currency rates, saving
//! tips) and the web mini-app REST backend (per-user categories and
//! expenses with ownership checks on every operation).

pub mod core;
pub mod storage;
pub mod telegram;

// Re-exports for convenience
pub use crate::core::config;
pub use crate::core::error::{AppError, AppResult};
