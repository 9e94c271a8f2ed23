//! Bot construction and command registration.

use crate::core::config;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

/// Slash commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "показать справку")]
    Help,
    #[command(description = "отменить текущее действие")]
    Cancel,
}

/// Creates the bot with an explicit HTTP timeout.
///
/// BOT_API_URL switches the bot to a local API server or a test mock.
pub fn create_bot() -> Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set. Add it to .env or the environment");
    }

    let client = reqwest::Client::builder()
        .timeout(config::network::telegram_timeout())
        .build()?;

    let mut bot = Bot::with_client(token, client);
    if let Ok(api_url) = std::env::var("BOT_API_URL") {
        bot = bot.set_api_url(api_url.parse()?);
    }
    Ok(bot)
}

/// Registers the command list Telegram shows in the chat menu.
pub async fn setup_bot_commands(bot: &Bot) -> Result<()> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "Начать работу с ботом"),
        BotCommand::new("help", "Показать справку"),
        BotCommand::new("cancel", "Отменить текущее действие"),
    ])
    .await?;
    Ok(())
}
