//! "Советы по экономии" menu button.

use crate::telegram::handlers::types::HandlerResult;
use rand::RngExt;
use teloxide::prelude::*;

const TIPS: &[&str] = &[
    "Ведите учет всех расходов хотя бы месяц: самые большие утечки обычно там, где их не ждешь.",
    "Составьте список покупок заранее и не ходите в магазин голодными.",
    "Откладывайте 10% от каждого поступления сразу, а не то, что останется в конце месяца.",
    "Отмените подписки, которыми не пользовались последние два месяца.",
    "Перед крупной покупкой подождите 48 часов: импульсивное желание часто проходит.",
    "Сравнивайте цену за килограмм или литр, а не за упаковку.",
    "Готовьте дома: обеды с собой экономят заметную сумму за месяц.",
    "Раз в год пересматривайте тарифы на связь, интернет и страховки.",
];

pub async fn handle_tips(bot: &Bot, msg: &Message) -> HandlerResult {
    let tip = TIPS[rand::rng().random_range(0..TIPS.len())];
    bot.send_message(msg.chat.id, tip).await?;
    Ok(())
}
