use crate::domain::{ChatId, UserId};

/// Who sent an inbound command, as reported by the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub user_id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Cross-messenger inbound command: `/name arg1 arg2 ...`.
#[derive(Clone, Debug)]
pub struct IncomingCommand {
    pub chat_id: ChatId,
    pub sender: Sender,
    /// Lowercased command name without the leading `/` or `@botname` suffix.
    pub name: String,
    /// The `@botname` suffix, if the command named a bot.
    pub mention: Option<String>,
    pub args: Vec<String>,
}

impl IncomingCommand {
    /// Parse raw message text. Returns `None` when the text is not a command.
    ///
    /// Telegram may send `/cmd@botname arg1 ...`.
    pub fn parse(chat_id: ChatId, sender: Sender, text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let mut parts = rest.split_whitespace();
        let head = parts.next().unwrap_or("");
        let (name, mention) = match head.split_once('@') {
            Some((name, bot)) => (name, Some(bot.to_string())),
            None => (head, None),
        };
        let name = name.to_lowercase();
        if name.is_empty() {
            return None;
        }

        Some(Self {
            chat_id,
            sender,
            name,
            mention,
            args: parts.map(str::to_string).collect(),
        })
    }

    /// Whether this bot should answer. Commands naming another bot are not ours.
    pub fn is_addressed_to(&self, bot_username: &str) -> bool {
        self.mention
            .as_deref()
            .map_or(true, |bot| bot.eq_ignore_ascii_case(bot_username))
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}
