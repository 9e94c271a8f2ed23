//! Reply keyboards shown in the chat.

use teloxide::types::{KeyboardButton, KeyboardMarkup};

/// "Регистрация в телеграм-боте" button text
pub const BTN_REGISTER: &str = "Регистрация в телеграм-боте";
/// "Курс валют" button text
pub const BTN_RATES: &str = "Курс валют";
/// "Советы по экономии" button text
pub const BTN_TIPS: &str = "Советы по экономии";
/// "Личные финансы" button text
pub const BTN_FINANCES: &str = "Личные финансы";

/// Main keyboard, two rows of two buttons. Stays on screen after use.
pub fn main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new([
        [
            KeyboardButton::new(BTN_REGISTER),
            KeyboardButton::new(BTN_RATES),
        ],
        [
            KeyboardButton::new(BTN_TIPS),
            KeyboardButton::new(BTN_FINANCES),
        ],
    ])
    .resize_keyboard()
}
