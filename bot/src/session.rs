use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle};

use crate::completion::ChatMessage;

/// Per-user rolling conversation context.
///
/// Turns are committed in user+assistant pairs after a successful completion
/// and evicted wholesale once `ttl` passes without activity. Eviction is a
/// scheduled task per user; any new activity aborts the pending task and
/// schedules a fresh one, so an entry never disappears earlier than `ttl`
/// after the last thing the user did.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<Mutex<HashMap<u64, UserSession>>>,
    ttl: Duration,
}

struct UserSession {
    history: Vec<ChatMessage>,
    expiry: Option<JoinHandle<()>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Snapshot of the user's conversation so far, oldest turn first.
    pub async fn history(&self, user_id: u64) -> Vec<ChatMessage> {
        self.entries
            .lock()
            .await
            .get(&user_id)
            .map(|session| session.history.clone())
            .unwrap_or_default()
    }

    pub async fn contains(&self, user_id: u64) -> bool {
        self.entries.lock().await.contains_key(&user_id)
    }

    /// Commit one successful turn and restart the user's expiry timer.
    pub async fn record_exchange(&self, user_id: u64, user_text: &str, reply: &str) {
        let mut entries = self.entries.lock().await;
        let session = entries.entry(user_id).or_insert_with(|| UserSession {
            history: Vec::new(),
            expiry: None,
        });

        session.history.push(ChatMessage::user(user_text));
        session.history.push(ChatMessage::assistant(reply));

        if let Some(pending) = session.expiry.take() {
            pending.abort();
        }
        session.expiry = Some(self.schedule_expiry(user_id));
    }

    /// Restart the expiry timer if the user currently has history.
    pub async fn touch(&self, user_id: u64) {
        if let Some(session) = self.entries.lock().await.get_mut(&user_id) {
            if let Some(pending) = session.expiry.take() {
                pending.abort();
            }
            session.expiry = Some(self.schedule_expiry(user_id));
        }
    }

    fn schedule_expiry(&self, user_id: u64) -> JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        let ttl = self.ttl;

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if entries.lock().await.remove(&user_id).is_some() {
                tracing::debug!(user_id, "conversation history expired");
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::completion::Role;

    const TTL: Duration = Duration::from_secs(300);

    /// Let the paused-clock scheduler run any expiry task that became ready.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn history_grows_in_pairs() {
        let store = SessionStore::new(TTL);

        store.record_exchange(1, "first", "reply one").await;
        store.record_exchange(1, "second", "reply two").await;
        store.record_exchange(1, "third", "reply three").await;

        let history = store.history(1).await;
        assert_eq!(history.len(), 6, "three turns should store three pairs");
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
        assert_eq!(history[0].content, "first");
        assert_eq!(history[5].content, "reply three");
    }

    #[tokio::test(start_paused = true)]
    async fn users_do_not_share_history() {
        let store = SessionStore::new(TTL);

        store.record_exchange(1, "from one", "to one").await;
        store.record_exchange(2, "from two", "to two").await;

        assert_eq!(store.history(1).await.len(), 2);
        assert_eq!(store.history(2).await.len(), 2);
        assert_eq!(store.history(1).await[0].content, "from one");
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_does_not_create_an_entry() {
        let store = SessionStore::new(TTL);

        assert!(store.history(1).await.is_empty());
        assert!(!store.contains(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn history_expires_after_ttl() {
        let store = SessionStore::new(TTL);
        store.record_exchange(1, "hello", "hi").await;

        tokio::time::sleep(TTL - Duration::from_secs(1)).await;
        settle().await;
        assert!(store.contains(1).await, "entry should outlive most of the ttl");

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(!store.contains(1).await, "entry should be gone after the ttl");
    }

    #[tokio::test(start_paused = true)]
    async fn new_exchange_postpones_expiry() {
        let store = SessionStore::new(TTL);
        store.record_exchange(1, "hello", "hi").await;

        tokio::time::sleep(TTL - Duration::from_secs(10)).await;
        store.record_exchange(1, "still here", "welcome back").await;

        // Past the original deadline, inside the refreshed one.
        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert!(
            store.contains(1).await,
            "activity should have replaced the pending timer"
        );

        tokio::time::sleep(TTL).await;
        settle().await;
        assert!(!store.contains(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn touch_postpones_expiry_without_growing_history() {
        let store = SessionStore::new(TTL);
        store.record_exchange(1, "hello", "hi").await;

        tokio::time::sleep(TTL - Duration::from_secs(10)).await;
        store.touch(1).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert!(store.contains(1).await);
        assert_eq!(store.history(1).await.len(), 2, "touch should not append turns");
    }

    #[tokio::test(start_paused = true)]
    async fn touch_on_unknown_user_is_a_noop() {
        let store = SessionStore::new(TTL);

        store.touch(42).await;
        assert!(!store.contains(42).await);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_only_evicts_the_idle_user() {
        let store = SessionStore::new(TTL);
        store.record_exchange(1, "hello", "hi").await;

        tokio::time::sleep(TTL - Duration::from_secs(1)).await;
        store.record_exchange(2, "late joiner", "hello").await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(!store.contains(1).await, "idle user should be evicted");
        assert!(store.contains(2).await, "active user should be untouched");
    }
}
