//! "Личные финансы" budget dialogue: three категория/сумма pairs
//! collected step by step, then committed in one transaction.

use crate::core::validation;
use crate::storage::db::{self, BudgetSaveOutcome};
use crate::telegram::dialogue::{BudgetDialogue, BudgetForm};
use crate::telegram::handlers::types::{HandlerDeps, HandlerError, HandlerResult, UserInfo};
use crate::telegram::keyboards;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;

const INVALID_AMOUNT_MSG: &str = "Некорректный ввод. Пожалуйста, введите числовое значение для расходов (например, 100.50). Расходы не могут быть отрицательными.";
const NOT_REGISTERED_MSG: &str =
    "Ошибка: Пользователь не найден в базе данных. Пожалуйста, сначала зарегистрируйтесь.";
const SAVE_FAILED_MSG: &str =
    "Произошла непредвиденная ошибка при сохранении данных. Попробуйте позже.";

/// Entry point, triggered by the menu button. Only reachable from the
/// idle state.
pub async fn start_budget_dialogue(
    bot: &Bot,
    dialogue: &BudgetDialogue,
    msg: &Message,
) -> HandlerResult {
    log::info!("Chat {} started the budget dialogue", msg.chat.id);
    dialogue.update(BudgetForm::Category1).await?;
    bot.send_message(
        msg.chat.id,
        "Введите <b>первую</b> категорию расходов (например, 'Продукты', или /cancel для отмены):",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

/// Category names are stored verbatim. Messages without text are
/// ignored without advancing the state.
pub async fn receive_category1(
    bot: &Bot,
    dialogue: &BudgetDialogue,
    msg: &Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    dialogue
        .update(BudgetForm::Expenses1 {
            category1: text.to_string(),
        })
        .await?;
    bot.send_message(
        msg.chat.id,
        "Введите сумму расходов для <b>первой</b> категории (например, 1500.75):",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

pub async fn receive_expenses1(
    bot: &Bot,
    dialogue: &BudgetDialogue,
    category1: String,
    msg: &Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(expenses1) = parse_or_retry(bot, msg, text).await? else {
        return Ok(());
    };
    dialogue
        .update(BudgetForm::Category2 {
            category1,
            expenses1,
        })
        .await?;
    bot.send_message(msg.chat.id, "Введите <b>вторую</b> категорию расходов:")
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn receive_category2(
    bot: &Bot,
    dialogue: &BudgetDialogue,
    (category1, expenses1): (String, f64),
    msg: &Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    dialogue
        .update(BudgetForm::Expenses2 {
            category1,
            expenses1,
            category2: text.to_string(),
        })
        .await?;
    bot.send_message(
        msg.chat.id,
        "Введите сумму расходов для <b>второй</b> категории:",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

pub async fn receive_expenses2(
    bot: &Bot,
    dialogue: &BudgetDialogue,
    (category1, expenses1, category2): (String, f64, String),
    msg: &Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(expenses2) = parse_or_retry(bot, msg, text).await? else {
        return Ok(());
    };
    dialogue
        .update(BudgetForm::Category3 {
            category1,
            expenses1,
            category2,
            expenses2,
        })
        .await?;
    bot.send_message(msg.chat.id, "Введите <b>третью</b> категорию расходов:")
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn receive_category3(
    bot: &Bot,
    dialogue: &BudgetDialogue,
    (category1, expenses1, category2, expenses2): (String, f64, String, f64),
    msg: &Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    dialogue
        .update(BudgetForm::Expenses3 {
            category1,
            expenses1,
            category2,
            expenses2,
            category3: text.to_string(),
        })
        .await?;
    bot.send_message(
        msg.chat.id,
        "Введите сумму расходов для <b>третьей</b> категории:",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

/// Final step: validates the last amount, stores all three slots, and
/// reports back. Registration is checked before anything is written or
/// confirmed. The dialogue ends here whatever the outcome.
pub async fn receive_expenses3(
    bot: &Bot,
    deps: &HandlerDeps,
    dialogue: &BudgetDialogue,
    (category1, expenses1, category2, expenses2, category3): (String, f64, String, f64, String),
    msg: &Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(expenses3) = parse_or_retry(bot, msg, text).await? else {
        return Ok(());
    };
    let Some(user) = UserInfo::from_message(msg) else {
        return Ok(());
    };

    let slots = [
        (category1, expenses1),
        (category2, expenses2),
        (category3, expenses3),
    ];
    let outcome = match db::get_connection(&deps.db_pool) {
        Ok(mut conn) => {
            db::save_budget(&mut conn, user.telegram_id, &slots).map_err(crate::AppError::from)
        }
        Err(e) => Err(crate::AppError::from(e)),
    };

    match outcome {
        Ok(BudgetSaveOutcome::Saved) => {
            log::info!("Saved budget for user {}", user.telegram_id);
            bot.send_message(msg.chat.id, budget_report(&slots))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::main_keyboard())
                .await?;
        }
        Ok(BudgetSaveOutcome::NotRegistered) => {
            log::warn!(
                "User {} tried to save a budget without registering",
                user.telegram_id
            );
            bot.send_message(msg.chat.id, NOT_REGISTERED_MSG)
                .reply_markup(keyboards::main_keyboard())
                .await?;
        }
        Err(e) => {
            log::error!("Failed to save budget for user {}: {}", user.telegram_id, e);
            bot.send_message(msg.chat.id, SAVE_FAILED_MSG)
                .reply_markup(keyboards::main_keyboard())
                .await?;
        }
    }
    dialogue.exit().await?;
    Ok(())
}

/// /cancel and the "отмена" text, usable in any state.
pub async fn cancel_dialogue(
    bot: &Bot,
    dialogue: &BudgetDialogue,
    chat_id: ChatId,
) -> HandlerResult {
    let state = dialogue.get().await?.unwrap_or_default();
    if matches!(state, BudgetForm::Idle) {
        bot.send_message(chat_id, "Нет активного диалога для отмены.")
            .await?;
        return Ok(());
    }

    log::info!("Chat {} cancelled the budget dialogue", chat_id);
    dialogue.exit().await?;
    bot.send_message(chat_id, "Действие отменено. Вы вернулись в главное меню.")
        .reply_markup(keyboards::main_keyboard())
        .await?;
    Ok(())
}

/// Returns the parsed amount, or None after sending the retry prompt.
async fn parse_or_retry(bot: &Bot, msg: &Message, text: &str) -> Result<Option<f64>, HandlerError> {
    match validation::parse_amount(text) {
        Ok(amount) => Ok(Some(amount)),
        Err(e) => {
            log::warn!("Chat {} sent an invalid amount: {}", msg.chat.id, e);
            bot.send_message(msg.chat.id, INVALID_AMOUNT_MSG).await?;
            Ok(None)
        }
    }
}

fn budget_report(slots: &[(String, f64); 3]) -> String {
    format!(
        "<b>Ваши расходы:</b>\nКатегория 1: {} - {:.2} RUB\nКатегория 2: {} - {:.2} RUB\nКатегория 3: {} - {:.2} RUB\n\nДанные сохранены!",
        html::escape(&slots[0].0),
        slots[0].1,
        html::escape(&slots[1].0),
        slots[1].1,
        html::escape(&slots[2].0),
        slots[2].1,
    )
}
