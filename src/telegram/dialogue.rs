//! State of the "Личные финансы" budget dialogue.
//!
//! A strict linear chain: three (category, amount) pairs in a row, with
//! the database written only at the very end. Partial input lives in
//! the in-memory dialogue state, keyed by chat, and is lost on /cancel
//! or a process restart.

use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// Dialogue steps. Each step carries everything collected before it,
/// so an interrupted chain cannot leak stale data between users.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BudgetForm {
    /// No dialogue in progress
    #[default]
    Idle,
    /// Waiting for the first category name
    Category1,
    /// Waiting for the first amount
    Expenses1 { category1: String },
    /// Waiting for the second category name
    Category2 { category1: String, expenses1: f64 },
    /// Waiting for the second amount
    Expenses2 {
        category1: String,
        expenses1: f64,
        category2: String,
    },
    /// Waiting for the third category name
    Category3 {
        category1: String,
        expenses1: f64,
        category2: String,
        expenses2: f64,
    },
    /// Waiting for the third amount; commit and reset follow
    Expenses3 {
        category1: String,
        expenses1: f64,
        category2: String,
        expenses2: f64,
        category3: String,
    },
}

/// Per-chat dialogue handle over process-local storage
pub type BudgetDialogue = Dialogue<BudgetForm, InMemStorage<BudgetForm>>;
