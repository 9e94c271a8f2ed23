//! Dispatch tree for incoming messages.
//!
//! Branch order matters: commands and the "отмена" text work in any
//! dialogue state, dialogue states swallow their replies next, menu
//! buttons only fire when no dialogue is active, and the fallback
//! catches the rest.

use crate::telegram::bot::Command;
use crate::telegram::dialogue::{BudgetDialogue, BudgetForm};
use crate::telegram::handlers::types::{HandlerDeps, HandlerError};
use crate::telegram::handlers::{commands, exchange, finances, registration, tips};
use crate::telegram::keyboards;
use teloxide::dispatching::{UpdateHandler, dialogue::InMemStorage};
use teloxide::prelude::*;

pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    use dptree::case;

    let command_branch = dptree::entry().filter_command::<Command>().endpoint({
        let deps = deps.clone();
        move |bot: Bot, dialogue: BudgetDialogue, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move { commands::handle_command(&bot, &deps, &dialogue, &msg, cmd).await }
        }
    });

    let cancel_text_branch = dptree::filter(|msg: Message| {
        msg.text().is_some_and(|t| t.to_lowercase() == "отмена")
    })
    .endpoint(|bot: Bot, dialogue: BudgetDialogue, msg: Message| async move {
        finances::cancel_dialogue(&bot, &dialogue, msg.chat.id).await
    });

    let dialogue_branch = dptree::entry()
        .branch(
            case![BudgetForm::Category1].endpoint(
                |bot: Bot, dialogue: BudgetDialogue, msg: Message| async move {
                    finances::receive_category1(&bot, &dialogue, &msg).await
                },
            ),
        )
        .branch(case![BudgetForm::Expenses1 { category1 }].endpoint(
            |bot: Bot, dialogue: BudgetDialogue, category1: String, msg: Message| async move {
                finances::receive_expenses1(&bot, &dialogue, category1, &msg).await
            },
        ))
        .branch(
            case![BudgetForm::Category2 {
                category1,
                expenses1
            }]
            .endpoint(
                |bot: Bot, dialogue: BudgetDialogue, data: (String, f64), msg: Message| async move {
                    finances::receive_category2(&bot, &dialogue, data, &msg).await
                },
            ),
        )
        .branch(
            case![BudgetForm::Expenses2 {
                category1,
                expenses1,
                category2
            }]
            .endpoint(
                |bot: Bot,
                 dialogue: BudgetDialogue,
                 data: (String, f64, String),
                 msg: Message| async move {
                    finances::receive_expenses2(&bot, &dialogue, data, &msg).await
                },
            ),
        )
        .branch(
            case![BudgetForm::Category3 {
                category1,
                expenses1,
                category2,
                expenses2
            }]
            .endpoint(
                |bot: Bot,
                 dialogue: BudgetDialogue,
                 data: (String, f64, String, f64),
                 msg: Message| async move {
                    finances::receive_category3(&bot, &dialogue, data, &msg).await
                },
            ),
        )
        .branch(
            case![BudgetForm::Expenses3 {
                category1,
                expenses1,
                category2,
                expenses2,
                category3
            }]
            .endpoint({
                let deps = deps.clone();
                move |bot: Bot,
                      dialogue: BudgetDialogue,
                      data: (String, f64, String, f64, String),
                      msg: Message| {
                    let deps = deps.clone();
                    async move {
                        finances::receive_expenses3(&bot, &deps, &dialogue, data, &msg).await
                    }
                }
            }),
        );

    let menu_branch = case![BudgetForm::Idle]
        .branch(
            dptree::filter(|msg: Message| msg.text() == Some(keyboards::BTN_REGISTER)).endpoint({
                let deps = deps.clone();
                move |bot: Bot, msg: Message| {
                    let deps = deps.clone();
                    async move { registration::handle_register(&bot, &deps, &msg).await }
                }
            }),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text() == Some(keyboards::BTN_RATES)).endpoint({
                let deps = deps.clone();
                move |bot: Bot, msg: Message| {
                    let deps = deps.clone();
                    async move { exchange::handle_rates(&bot, &deps, &msg).await }
                }
            }),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text() == Some(keyboards::BTN_TIPS)).endpoint(
                |bot: Bot, msg: Message| async move { tips::handle_tips(&bot, &msg).await },
            ),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text() == Some(keyboards::BTN_FINANCES)).endpoint(
                |bot: Bot, dialogue: BudgetDialogue, msg: Message| async move {
                    finances::start_budget_dialogue(&bot, &dialogue, &msg).await
                },
            ),
        );

    Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<BudgetForm>, BudgetForm>()
        .branch(command_branch)
        .branch(cancel_text_branch)
        .branch(dialogue_branch)
        .branch(menu_branch)
        .branch(dptree::endpoint(|bot: Bot, msg: Message| async move {
            commands::handle_unknown(&bot, &msg).await
        }))
}
