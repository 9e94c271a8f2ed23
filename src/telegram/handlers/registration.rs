//! "Регистрация в телеграм-боте" menu button.

use crate::storage::db::{self, RegistrationOutcome};
use crate::telegram::handlers::types::{HandlerDeps, HandlerResult, UserInfo};
use teloxide::prelude::*;

pub async fn handle_register(bot: &Bot, deps: &HandlerDeps, msg: &Message) -> HandlerResult {
    let Some(user) = UserInfo::from_message(msg) else {
        return Ok(());
    };

    let outcome = match db::get_connection(&deps.db_pool) {
        Ok(mut conn) => db::register_user(&mut conn, user.telegram_id, &user.full_name)
            .map_err(crate::AppError::from),
        Err(e) => Err(crate::AppError::from(e)),
    };

    let text = match outcome {
        Ok(RegistrationOutcome::Created) => {
            log::info!("Registered user {}", user.telegram_id);
            "Вы успешно зарегистрированы!"
        }
        Ok(RegistrationOutcome::AlreadyRegistered) => "Вы уже зарегистрированы!",
        Err(e) => {
            log::error!("Registration failed for {}: {}", user.telegram_id, e);
            "Произошла ошибка при регистрации. Пожалуйста, попробуйте позже."
        }
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
