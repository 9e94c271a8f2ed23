//! "Курс валют" menu button.

use crate::core::rates::RatesError;
use crate::telegram::handlers::types::{HandlerDeps, HandlerResult};
use teloxide::prelude::*;
use teloxide::types::ParseMode;

pub async fn handle_rates(bot: &Bot, deps: &HandlerDeps, msg: &Message) -> HandlerResult {
    match deps.rates.fetch_usd_rates().await {
        Ok(rates) => {
            let text = format!(
                "<b>Курсы валют:</b>\n1 USD = {:.2} RUB\n1 EUR = {:.2} RUB",
                rates.usd_to_rub, rates.eur_to_rub
            );
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(e) => {
            log::error!("Exchange rates request failed: {}", e);
            bot.send_message(msg.chat.id, rates_error_text(&e)).await?;
        }
    }
    Ok(())
}

/// Подбирает текст сообщения под класс сбоя.
fn rates_error_text(error: &RatesError) -> String {
    match error {
        RatesError::NotConfigured => {
            "Ошибка конфигурации: ключ API для курсов валют не найден.".to_string()
        }
        RatesError::Api(code) => format!(
            "Не удалось получить данные о курсе валют. Ошибка: {}",
            code.as_deref().unwrap_or("Неизвестная ошибка API")
        ),
        RatesError::Network(_) => {
            "Произошла ошибка при подключении к сервису курсов валют. Проверьте ваше интернет-соединение."
                .to_string()
        }
        RatesError::Malformed(_) => {
            "Произошла ошибка при обработке данных курсов валют. Пожалуйста, сообщите разработчику."
                .to_string()
        }
    }
}
