//! Shared types for handlers.

use crate::core::rates::RatesClient;
use crate::storage::db::DbPool;
use std::sync::Arc;
use teloxide::types::Message;

/// Boxed error for the dptree handler chain
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used by all handlers
pub type HandlerResult = Result<(), HandlerError>;

/// Dependencies shared by every handler
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub rates: Arc<RatesClient>,
}

impl HandlerDeps {
    pub fn new(db_pool: Arc<DbPool>, rates: Arc<RatesClient>) -> Self {
        Self { db_pool, rates }
    }
}

/// Sender identity extracted from an incoming message
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub telegram_id: i64,
    pub full_name: String,
}

impl UserInfo {
    /// Returns None for messages without a sender (channel posts).
    pub fn from_message(msg: &Message) -> Option<Self> {
        let from = msg.from.as_ref()?;
        let telegram_id = i64::try_from(from.id.0).ok()?;
        Some(Self {
            telegram_id,
            full_name: from.full_name(),
        })
    }
}
