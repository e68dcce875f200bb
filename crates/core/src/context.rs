use std::sync::Arc;

use crate::domain::user::UserId;
use crate::session::{InMemorySessionStore, SessionStore, SessionStoreError};

/// Rolling transcript per customer, used to ground classification.
pub struct ConversationContextStore {
    store: Arc<dyn SessionStore<String>>,
    max_chars: Option<usize>,
}

impl Default for ConversationContextStore {
    fn default() -> Self {
        Self::new(Arc::new(InMemorySessionStore::default()), None)
    }
}

impl ConversationContextStore {
    /// `max_chars` bounds each transcript; the oldest lines are dropped first.
    pub fn new(store: Arc<dyn SessionStore<String>>, max_chars: Option<usize>) -> Self {
        Self { store, max_chars: max_chars.filter(|limit| *limit > 0) }
    }

    pub fn normalize(raw_id: &str) -> UserId {
        UserId::normalize(raw_id)
    }

    pub async fn get(&self, raw_id: &str) -> Result<String, SessionStoreError> {
        let key = Self::normalize(raw_id);
        match self.store.get(&key).await? {
            Some(transcript) => Ok(transcript),
            None => {
                self.store.set(&key, String::new()).await?;
                Ok(String::new())
            }
        }
    }

    pub async fn append(&self, raw_id: &str, text: &str) -> Result<(), SessionStoreError> {
        let key = Self::normalize(raw_id);
        let mut transcript = self.store.get(&key).await?.unwrap_or_default();
        transcript.push_str(text);
        transcript.push('\n');
        if let Some(limit) = self.max_chars {
            transcript = truncate_front(transcript, limit);
        }
        self.store.set(&key, transcript).await
    }
}

fn truncate_front(transcript: String, limit: usize) -> String {
    let total = transcript.chars().count();
    if total <= limit {
        return transcript;
    }

    let overflow = total - limit;
    let cut = transcript.char_indices().nth(overflow).map(|(index, _)| index).unwrap_or(0);
    let tail = &transcript[cut..];
    // Prefer starting on a whole line when the window still holds one.
    match tail.find('\n') {
        Some(newline) if newline + 1 < tail.len() => tail[newline + 1..].to_owned(),
        _ => tail.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{truncate_front, ConversationContextStore};
    use crate::session::{InMemorySessionStore, SessionStore};

    #[tokio::test]
    async fn get_creates_empty_transcript_lazily() {
        let backing = Arc::new(InMemorySessionStore::<String>::default());
        let store = ConversationContextStore::new(backing.clone(), None);

        assert_eq!(store.get("573001234567@c.us").await.expect("get"), "");
        assert_eq!(backing.len(), 1);
    }

    #[tokio::test]
    async fn append_concatenates_lines_under_the_normalized_key() {
        let store = ConversationContextStore::default();

        store.append("573001234567@c.us", "hola").await.expect("append");
        store.append("+57 300 123 4567", "quiero la Camisa").await.expect("append");

        assert_eq!(store.get("573001234567").await.expect("get"), "hola\nquiero la Camisa\n");
        assert_eq!(store.get("573009999999").await.expect("other user"), "");
    }

    #[tokio::test]
    async fn bounded_transcripts_drop_the_oldest_lines() {
        let backing = Arc::new(InMemorySessionStore::<String>::default());
        let store = ConversationContextStore::new(backing.clone(), Some(24));

        for line in ["primera linea", "segunda linea", "tercera linea"] {
            store.append("57300", line).await.expect("append");
        }

        let transcript = backing
            .get(&ConversationContextStore::normalize("57300"))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(transcript, "tercera linea\n");
    }

    #[test]
    fn truncation_keeps_tail_of_a_single_long_line() {
        assert_eq!(truncate_front("abcdefghij\n".to_owned(), 4), "hij\n");
        assert_eq!(truncate_front("corto\n".to_owned(), 40), "corto\n");
    }
}
