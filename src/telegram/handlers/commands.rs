//! /start, /help, /cancel and the fallback for unrecognized input.

use crate::telegram::bot::Command;
use crate::telegram::dialogue::BudgetDialogue;
use crate::telegram::handlers::types::{HandlerDeps, HandlerResult};
use crate::telegram::keyboards;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Routes a parsed command to its handler. Commands work in any
/// dialogue state.
pub async fn handle_command(
    bot: &Bot,
    _deps: &HandlerDeps,
    dialogue: &BudgetDialogue,
    msg: &Message,
    cmd: Command,
) -> HandlerResult {
    match cmd {
        Command::Start => handle_start(bot, msg).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Cancel => {
            crate::telegram::handlers::finances::cancel_dialogue(bot, dialogue, msg.chat.id).await
        }
    }
}

/// Greets the user and shows the main menu.
pub async fn handle_start(bot: &Bot, msg: &Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Привет! Я ваш личный финансовый помощник. Выберите одну из опций в меню:",
    )
    .reply_markup(keyboards::main_keyboard())
    .await?;
    Ok(())
}

pub async fn handle_help(bot: &Bot, msg: &Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Anything that is not a command, menu button, or dialogue reply.
pub async fn handle_unknown(bot: &Bot, msg: &Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Извините, я не понял вашу команду. Пожалуйста, выберите одну из опций в меню.",
    )
    .reply_markup(keyboards::main_keyboard())
    .await?;
    Ok(())
}
