//! Keyed per-user state behind a swappable store.
//!
//! Conversation transcripts and pending orders both live in a [`SessionStore`]. The in-memory
//! implementation backs tests and single-process deployments; an external cache can implement
//! the same trait. Callers never hold a lock across turns: per-user ordering is provided by the
//! chat runner's mailboxes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::user::UserId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionStoreError {
    #[error("session backend failure: {0}")]
    Backend(String),
    #[error("session entry for `{key}` could not be decoded: {message}")]
    Decode { key: String, message: String },
}

pub type StalePredicate<'a, V> = &'a (dyn Fn(&UserId, &V) -> bool + Send + Sync);

#[async_trait]
pub trait SessionStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &UserId) -> Result<Option<V>, SessionStoreError>;
    async fn set(&self, key: &UserId, value: V) -> Result<(), SessionStoreError>;
    async fn delete(&self, key: &UserId) -> Result<Option<V>, SessionStoreError>;
    /// Removes every entry for which `is_stale` holds. The predicate is evaluated against the
    /// entry as stored at removal time, so an entry rewritten since a snapshot is judged fresh.
    async fn sweep(
        &self,
        is_stale: StalePredicate<'_, V>,
    ) -> Result<Vec<UserId>, SessionStoreError>;
    async fn keys(&self) -> Result<Vec<UserId>, SessionStoreError>;
}

pub struct InMemorySessionStore<V> {
    entries: Mutex<HashMap<UserId, V>>,
}

impl<V> Default for InMemorySessionStore<V> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<V> InMemorySessionStore<V> {
    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<UserId, V>) -> T) -> T {
        match self.entries.lock() {
            Ok(mut entries) => f(&mut entries),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<V> SessionStore<V> for InMemorySessionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &UserId) -> Result<Option<V>, SessionStoreError> {
        Ok(self.with_entries(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &UserId, value: V) -> Result<(), SessionStoreError> {
        self.with_entries(|entries| entries.insert(key.clone(), value));
        Ok(())
    }

    async fn delete(&self, key: &UserId) -> Result<Option<V>, SessionStoreError> {
        Ok(self.with_entries(|entries| entries.remove(key)))
    }

    async fn sweep(
        &self,
        is_stale: StalePredicate<'_, V>,
    ) -> Result<Vec<UserId>, SessionStoreError> {
        Ok(self.with_entries(|entries| {
            let stale = entries
                .iter()
                .filter(|(key, value)| is_stale(key, value))
                .map(|(key, _)| key.clone())
                .collect::<Vec<_>>();
            for key in &stale {
                entries.remove(key);
            }
            stale
        }))
    }

    async fn keys(&self) -> Result<Vec<UserId>, SessionStoreError> {
        Ok(self.with_entries(|entries| entries.keys().cloned().collect()))
    }
}
