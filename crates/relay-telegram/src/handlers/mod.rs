//! Telegram update handlers.
//!
//! Only text commands are served; anything else is ignored.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.text().is_some_and(|t| t.trim_start().starts_with('/')) {
        return commands::handle_command(msg, state).await;
    }

    debug!(chat_id = msg.chat.id.0, "Ignoring non-command message");
    Ok(())
}
