use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// Chats with a pending slot are kept; the rest are pruned past this size.
const PRUNE_ABOVE: usize = 512;

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        // Telegram allows ~30 msg/sec overall and ~1 msg/sec per chat.
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

/// Earliest instants at which the next send may start.
#[derive(Debug)]
struct Schedule {
    global_next: Instant,
    chat_next: HashMap<ChatId, Instant>,
}

impl Schedule {
    fn new(now: Instant) -> Self {
        Self {
            global_next: now,
            chat_next: HashMap::new(),
        }
    }

    /// Book a slot for `chat` that honours both intervals; returns the wait.
    fn book(&mut self, cfg: &ThrottleConfig, chat: ChatId, now: Instant) -> Duration {
        let chat_ready = self.chat_next.get(&chat).copied().unwrap_or(now);
        let start = now.max(self.global_next).max(chat_ready);

        self.global_next = start + cfg.global_min_interval;
        self.chat_next.insert(chat, start + cfg.per_chat_min_interval);
        if self.chat_next.len() > PRUNE_ABOVE {
            self.chat_next.retain(|_, next| *next > now);
        }

        start - now
    }
}

/// MessagingPort decorator that spaces outbound calls.
///
/// Keeps broadcast fan-out under Telegram's flood limits. It does not
/// guarantee zero 429s.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    schedule: Mutex<Schedule>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            schedule: Mutex::new(Schedule::new(Instant::now())),
        }
    }

    async fn wait_turn(&self, chat: ChatId) {
        let wait = {
            let mut schedule = self.schedule.lock().await;
            schedule.book(&self.cfg, chat, Instant::now())
        };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.wait_turn(chat_id).await;
        self.inner.send_text(chat_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use std::sync::Mutex as StdMutex;

    const MS: Duration = Duration::from_millis(1);

    #[derive(Default)]
    struct RecordingMessenger {
        sends: StdMutex<Vec<(i64, String, Instant)>>,
    }

    #[async_trait::async_trait]
    impl MessagingPort for RecordingMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                max_message_len: 4096,
            }
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.sends
                .lock()
                .unwrap()
                .push((chat_id.0, text.to_string(), Instant::now()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    fn cfg() -> ThrottleConfig {
        ThrottleConfig {
            global_min_interval: 40 * MS,
            per_chat_min_interval: 1000 * MS,
        }
    }

    #[test]
    fn booking_respects_both_intervals() {
        let t0 = Instant::now();
        let mut schedule = Schedule::new(t0);

        assert_eq!(schedule.book(&cfg(), ChatId(1), t0), Duration::ZERO);
        assert_eq!(schedule.book(&cfg(), ChatId(2), t0), 40 * MS);
        // Same chat again: the per-chat interval dominates.
        assert_eq!(schedule.book(&cfg(), ChatId(1), t0), 1000 * MS);
        // Global slots queue up behind the latest booking.
        assert_eq!(schedule.book(&cfg(), ChatId(3), t0), 1040 * MS);
    }

    #[test]
    fn idle_time_frees_the_slot() {
        let t0 = Instant::now();
        let mut schedule = Schedule::new(t0);
        schedule.book(&cfg(), ChatId(1), t0);

        assert_eq!(schedule.book(&cfg(), ChatId(1), t0 + 2000 * MS), Duration::ZERO);
    }

    #[test]
    fn stale_chats_are_pruned() {
        let t0 = Instant::now();
        let mut schedule = Schedule::new(t0);
        for id in 0..=PRUNE_ABOVE as i64 {
            schedule.book(&cfg(), ChatId(id), t0);
        }
        let later = t0 + Duration::from_secs(3600);
        schedule.book(&cfg(), ChatId(-1), later);

        assert_eq!(schedule.chat_next.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sends_are_spaced_per_chat_and_globally() {
        let inner = Arc::new(RecordingMessenger::default());
        let throttled = ThrottledMessenger::new(inner.clone(), cfg());
        let t0 = Instant::now();

        throttled.send_text(ChatId(1), "hello").await.unwrap();
        throttled.send_text(ChatId(2), "hello").await.unwrap();
        throttled.send_text(ChatId(1), "again").await.unwrap();

        let sends = inner.sends.lock().unwrap().clone();
        let texts: Vec<_> = sends.iter().map(|(c, t, _)| (*c, t.as_str())).collect();
        assert_eq!(texts, vec![(1, "hello"), (2, "hello"), (1, "again")]);

        let at: Vec<Duration> = sends.iter().map(|(_, _, i)| *i - t0).collect();
        assert!(at[0] < 40 * MS);
        assert!(at[1] - at[0] >= 40 * MS, "global spacing: {at:?}");
        assert!(at[2] - at[0] >= 1000 * MS, "per-chat spacing: {at:?}");
        assert_eq!(throttled.capabilities().max_message_len, 4096);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fan_out_keeps_global_spacing() {
        let inner = Arc::new(RecordingMessenger::default());
        let throttled = Arc::new(ThrottledMessenger::new(inner.clone(), cfg()));

        let tasks: Vec<_> = (1..=5)
            .map(|id| {
                let throttled = throttled.clone();
                tokio::spawn(async move { throttled.send_text(ChatId(id), "hi").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut at: Vec<Instant> = inner.sends.lock().unwrap().iter().map(|s| s.2).collect();
        at.sort();
        for pair in at.windows(2) {
            assert!(pair[1] - pair[0] >= 40 * MS);
        }
    }
}
