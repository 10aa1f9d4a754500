use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, error_handlers::LoggingErrorHandler, prelude::*};
use tracing::{debug, info};

use relay_core::{
    commands::CommandDispatcher,
    config::Config,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<CommandDispatcher>,
    pub messenger: Arc<dyn MessagingPort>,
    /// Our own username; `/cmd@other_bot` is left for that bot.
    pub bot_username: String,
}

/// Open storage, connect to Telegram and serve commands until the process stops.
///
/// Failures here are startup failures and abort the process; once polling
/// runs, per-update errors are logged and swallowed.
pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Outbound calls (replies and broadcast) share one throttled messenger so
    // fan-out stays under Telegram's flood limits.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let dispatcher = Arc::new(CommandDispatcher::from_config(&cfg, messenger.clone()).await?);
    info!(db = %cfg.db_file.display(), "Storage initialized");

    info!(token = %cfg.token_hint(), "Connecting to Telegram");
    let me = bot.get_me().await?;
    info!(username = %me.username(), "Bot started");

    if cfg.drop_pending_updates {
        bot.delete_webhook().drop_pending_updates(true).await?;
        debug!("Dropped pending updates");
    }

    let state = Arc::new(AppState {
        dispatcher,
        messenger,
        bot_username: me.username().to_string(),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!(update = ?upd.kind, "Ignoring unsupported update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error from the update listener",
        ))
        .build()
        .dispatch()
        .await;

    Ok(())
}
