use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{debug, error, warn};

use relay_core::{
    domain::{ChatId, UserId},
    messaging::types::{IncomingCommand, Sender},
    utils::truncate_text,
};

use crate::router::AppState;

/// Parse, dispatch and answer one command.
///
/// Errors never reach the user: they are logged here and the update is
/// considered handled.
pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    let sender = sender_from_parts(
        user.id.0,
        user.username.as_deref(),
        &user.first_name,
        user.last_name.as_deref(),
    );
    let Some(cmd) = IncomingCommand::parse(chat_id, sender, text) else {
        return Ok(());
    };
    if !cmd.is_addressed_to(&state.bot_username) {
        debug!(command = %cmd.name, mention = ?cmd.mention, "Command addressed to another bot");
        return Ok(());
    }

    let reply = match state.dispatcher.dispatch(&cmd).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return Ok(()),
        Err(e) => {
            error!(
                command = %cmd.name,
                user_id = cmd.sender.user_id.0,
                error = %e,
                "Command failed"
            );
            return Ok(());
        }
    };

    let limit = state.messenger.capabilities().max_message_len;
    if let Err(e) = state
        .messenger
        .send_text(chat_id, &truncate_text(&reply, limit))
        .await
    {
        warn!(chat_id = chat_id.0, error = %e, "Failed to send reply");
    }

    Ok(())
}

/// Telegram always sends a first name, but it may be blank.
fn sender_from_parts(
    user_id: u64,
    username: Option<&str>,
    first_name: &str,
    last_name: Option<&str>,
) -> Sender {
    let non_blank = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    Sender {
        user_id: UserId(user_id as i64),
        username: username.and_then(non_blank),
        first_name: non_blank(first_name),
        last_name: last_name.and_then(non_blank),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_keeps_present_names() {
        let s = sender_from_parts(42, Some("ada"), "Ada", Some("Lovelace"));
        assert_eq!(s.user_id, UserId(42));
        assert_eq!(s.username.as_deref(), Some("ada"));
        assert_eq!(s.first_name.as_deref(), Some("Ada"));
        assert_eq!(s.last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn sender_drops_blank_names() {
        let s = sender_from_parts(7, None, "  ", Some(""));
        assert_eq!(s.username, None);
        assert_eq!(s.first_name, None);
        assert_eq!(s.last_name, None);
    }
}
