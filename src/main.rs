use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::time::sleep;

use kopilka::core::rates::RatesClient;
use kopilka::core::{config, init_logger};
use kopilka::storage::db::create_pool;
use kopilka::telegram::{
    BudgetForm, HandlerDeps, WebAppState, create_bot, run_webapp_server, schema,
    setup_bot_commands,
};

mod cli;
use cli::{Cli, Commands};

/// Entry point: parses CLI arguments, wires up logging and
/// configuration, then runs the bot.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot
/// creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Environment is loaded before the logger so LOG_FILE_PATH from
    // .env is honored
    let _ = dotenv();

    // Panics inside the dispatcher are logged and survived instead of
    // taking the whole process down
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!(
                "Panic at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webapp_port }) => run_bot(webapp_port).await,
        None => run_bot(None).await,
    }
}

/// Runs the web app API server and the long-polling dispatcher until
/// shutdown.
async fn run_bot(webapp_port: Option<u16>) -> Result<()> {
    log::info!("Starting bot...");

    let bot = create_bot()?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}. Continuing anyway.", e);
    }

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH)
            .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    let port = webapp_port.unwrap_or(*config::webapp::PORT);
    {
        let state = WebAppState {
            db_pool: Arc::clone(&db_pool),
            bot_token: config::BOT_TOKEN.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = run_webapp_server(state, port).await {
                log::error!("Web app server error: {}", e);
            }
        });
    }

    let rates = Arc::new(RatesClient::new(config::EXCHANGE_RATE_API_KEY.clone()));
    let handler = schema(HandlerDeps::new(Arc::clone(&db_pool), rates));

    // Dialogue state lives outside the retry loop so an open dialogue
    // survives a dispatcher restart
    let storage = InMemStorage::<BudgetForm>::new();

    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();
        let storage_clone = Arc::clone(&storage);

        // The dispatcher runs in its own task so a panic surfaces as a
        // JoinError here instead of terminating the process
        let handle = tokio::spawn(async move {
            let listener = Polling::builder(bot_clone.clone())
                .drop_pending_updates()
                .build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(dptree::deps![storage_clone])
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) => {
                if !join_err.is_panic() {
                    log::warn!("Dispatcher task was cancelled: {}", join_err);
                    break;
                }
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= config::retry::MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Restarting dispatcher (attempt {}/{})...",
                    retry_count,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                sleep(config::retry::dispatcher_delay(retry_count)).await;
            }
        }
    }

    Ok(())
}
