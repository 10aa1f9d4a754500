//! Command dispatcher: maps `/name args` to a handler and produces the reply.
//!
//! Handlers are stateless; everything that must survive a request goes
//! through the registry or the payload store.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    broadcast::BroadcastService,
    config::{Config, PayloadBackend},
    messaging::{
        port::MessagingPort,
        types::{IncomingCommand, Sender},
    },
    numbers::normalize_tokens,
    store::{
        payload::{JsonFilePayloadStore, PayloadStore, SqlitePayloadStore},
        registry::Registry,
        Database,
    },
    utils::clock_time_local,
    Result,
};

/// How many identities `/users` lists before summarizing the rest.
const USERS_PREVIEW: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Input,
    Output,
    Clear,
    Users,
    Status,
}

impl CommandKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" | "help" => Some(Self::Start),
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            "clear" => Some(Self::Clear),
            "users" => Some(Self::Users),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

pub struct CommandDispatcher {
    registry: Registry,
    payload: Arc<dyn PayloadStore>,
    broadcast: BroadcastService,
}

impl CommandDispatcher {
    pub fn new(
        registry: Registry,
        payload: Arc<dyn PayloadStore>,
        broadcast: BroadcastService,
    ) -> Self {
        Self {
            registry,
            payload,
            broadcast,
        }
    }

    /// Open the stores named by `cfg` and wire them to `messenger`.
    ///
    /// With the SQLite payload backend a legacy payload file is imported once.
    pub async fn from_config(cfg: &Config, messenger: Arc<dyn MessagingPort>) -> Result<Self> {
        let db = Database::open(&cfg.db_file)?;
        let registry = Registry::new(db.clone());

        let payload: Arc<dyn PayloadStore> = match cfg.payload_backend {
            PayloadBackend::Sqlite => {
                let store = SqlitePayloadStore::new(db);
                store.import_legacy_file(&cfg.payload_file).await?;
                Arc::new(store)
            }
            PayloadBackend::Json => Arc::new(JsonFilePayloadStore::new(&cfg.payload_file)),
        };
        info!(backend = ?cfg.payload_backend, "Payload store ready");

        let broadcast = BroadcastService::new(
            registry.clone(),
            messenger,
            cfg.broadcast_text.clone(),
            cfg.broadcast_concurrency,
        );
        Ok(Self::new(registry, payload, broadcast))
    }

    /// Run one command. `Ok(None)` means the command is unknown and gets no reply.
    pub async fn dispatch(&self, cmd: &IncomingCommand) -> Result<Option<String>> {
        let Some(kind) = CommandKind::from_name(&cmd.name) else {
            debug!(
                command = %cmd.name,
                user_id = cmd.sender.user_id.0,
                "Ignoring unknown command"
            );
            return Ok(None);
        };
        debug!(?kind, user_id = cmd.sender.user_id.0, "Dispatching command");

        let reply = match kind {
            CommandKind::Start => self.start(&cmd.sender).await?,
            CommandKind::Input => self.input(&cmd.sender, &cmd.args).await?,
            CommandKind::Output => self.output(&cmd.sender).await?,
            CommandKind::Clear => self.clear(&cmd.sender).await?,
            CommandKind::Users => self.users(&cmd.sender).await?,
            CommandKind::Status => self.status(&cmd.sender).await?,
        };
        Ok(Some(reply))
    }

    async fn start(&self, sender: &Sender) -> Result<String> {
        self.registry.upsert(sender).await?;

        let name = sender
            .first_name
            .as_deref()
            .or(sender.username.as_deref())
            .unwrap_or("there");
        Ok(format!(
            "👋 Hello, {name}!\n\n\
📋 Commands:\n\
• /input 10 20 30 - save numbers\n\
• /output - show the last saved numbers\n\
• /clear - clear saved data\n\
• /users - how many devices are connected\n\
• /status - bot status\n\n\
⚡ Every /input sends '{}' to all devices",
            self.broadcast.message()
        ))
    }

    async fn input(&self, sender: &Sender, args: &[String]) -> Result<String> {
        if args.is_empty() {
            self.registry.upsert(sender).await?;
            return Ok("Send numbers separated by spaces: /input 10 20 30".to_string());
        }

        // Validate everything before touching storage.
        let numbers = match normalize_tokens(args) {
            Ok(numbers) => numbers.join(" "),
            Err(e) => {
                info!(user_id = sender.user_id.0, token = %e.token, "Rejected input");
                return Ok(format!("❌ {e}"));
            }
        };

        self.registry.upsert(sender).await?;
        let mut record = self.payload.load().await?;
        record.set_input(numbers.clone());
        self.payload.save(&record).await?;
        info!(user_id = sender.user_id.0, numbers = %numbers, "Input saved");

        let report = self.broadcast.notify_all().await?;
        if !report.failed.is_empty() {
            info!(failed = ?report.failed, "Broadcast finished with failures");
        }

        Ok(format!(
            "✅ Saved: {numbers}\n📢 Sent '{}' to {} devices",
            self.broadcast.message(),
            report.delivered
        ))
    }

    async fn output(&self, sender: &Sender) -> Result<String> {
        self.registry.upsert(sender).await?;

        let record = self.payload.load().await?;
        Ok(match record.data() {
            Some(numbers) => format!("📊 Data: {numbers}"),
            None => "📭 No saved data".to_string(),
        })
    }

    async fn clear(&self, sender: &Sender) -> Result<String> {
        self.registry.upsert(sender).await?;

        let mut record = self.payload.load().await?;
        record.clear();
        self.payload.save(&record).await?;
        info!(user_id = sender.user_id.0, "Data cleared");

        Ok("🗑️ Data cleared".to_string())
    }

    async fn users(&self, sender: &Sender) -> Result<String> {
        self.registry.upsert(sender).await?;

        let ids = self.registry.list_identities().await?;
        Ok(format_users(&ids))
    }

    async fn status(&self, sender: &Sender) -> Result<String> {
        self.registry.upsert(sender).await?;

        let count = self.registry.count().await?;
        let record = self.payload.load().await?;
        let data = if record.data().is_some() {
            "✅ Yes"
        } else {
            "❌ No"
        };

        Ok(format!(
            "🤖 BOT STATUS\n\
━━━━━━━━━━━━\n\
• Devices: {count} 📱\n\
• Data: {data}\n\
• Started: {}\n\
• Time: {} ⏰",
            record.started,
            clock_time_local()
        ))
    }
}

fn format_users(ids: &[crate::domain::UserId]) -> String {
    if ids.is_empty() {
        return "📱 No connected devices".to_string();
    }

    let preview = ids
        .iter()
        .take(USERS_PREVIEW)
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = format!(
        "📱 Connected devices: {}\n🔢 First {USERS_PREVIEW} IDs: {preview}",
        ids.len()
    );
    if ids.len() > USERS_PREVIEW {
        out.push_str(&format!("\n...and {} more", ids.len() - USERS_PREVIEW));
    }
    out
}
