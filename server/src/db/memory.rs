use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use mongodb::bson::oid::ObjectId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::models::{Expense, Session, User};
use super::store::{Connection, Store};
use crate::error::{ExpenseServerError, Result};

#[derive(Default)]
struct Collections {
    users: DashMap<String, User>,
    // token -> session
    sessions: DashMap<ObjectId, Session>,
    // username -> token
    session_tokens: DashMap<String, ObjectId>,
    expenses: DashMap<ObjectId, Expense>,
    offline: AtomicBool,
}

/// In-process backend with the same single-document semantics as
/// [`MongoStore`](super::MongoStore).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the database were down.
    /// Connecting still succeeds, as with a lazily connecting driver.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    pub fn expense_count(&self) -> usize {
        self.inner.expenses.len()
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(MemoryConnection {
            inner: self.inner.clone(),
        }))
    }
}

pub struct MemoryConnection {
    inner: Arc<Collections>,
}

impl MemoryConnection {
    fn new_session(&self, username: &str) -> ObjectId {
        let token = ObjectId::new();
        self.inner.sessions.insert(
            token,
            Session {
                token,
                username: username.to_string(),
            },
        );
        token
    }

    fn check_online(&self) -> Result<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(ExpenseServerError::Internal(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn ping(&self) -> Result<()> {
        self.check_online()
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.check_online()?;
        Ok(self.inner.users.get(username).map(|u| u.value().clone()))
    }

    async fn insert_user(&self, user: &User) -> Result<bool> {
        self.check_online()?;
        match self.inner.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(true)
            }
        }
    }

    async fn upsert_session(&self, username: &str) -> Result<Session> {
        self.check_online()?;
        // The entry guard holds the shard lock, so concurrent callers for the
        // same username agree on one token. Lock order is always
        // session_tokens, then sessions.
        let token = match self.inner.session_tokens.entry(username.to_string()) {
            Entry::Occupied(slot) if self.inner.sessions.contains_key(slot.get()) => *slot.get(),
            Entry::Occupied(mut slot) => {
                let token = self.new_session(username);
                slot.insert(token);
                token
            }
            Entry::Vacant(slot) => {
                let token = self.new_session(username);
                slot.insert(token);
                token
            }
        };

        Ok(Session {
            token,
            username: username.to_string(),
        })
    }

    async fn find_session(&self, token: &ObjectId) -> Result<Option<Session>> {
        self.check_online()?;
        Ok(self.inner.sessions.get(token).map(|s| s.value().clone()))
    }

    async fn delete_sessions_by_username(&self, username: &str) -> Result<u64> {
        self.check_online()?;
        let removed = match self.inner.session_tokens.entry(username.to_string()) {
            Entry::Occupied(slot) => {
                let removed = self.inner.sessions.remove(slot.get());
                slot.remove();
                removed
            }
            Entry::Vacant(_) => None,
        };
        Ok(u64::from(removed.is_some()))
    }

    async fn delete_session(&self, token: &ObjectId) -> Result<u64> {
        self.check_online()?;
        let username = match self.inner.sessions.get(token) {
            Some(session) => session.username.clone(),
            None => return Ok(0),
        };

        // The username entry stays locked until the session is gone.
        let removed = match self.inner.session_tokens.entry(username) {
            Entry::Occupied(slot) if slot.get() == token => {
                let removed = self.inner.sessions.remove(token);
                slot.remove();
                removed
            }
            _ => self.inner.sessions.remove(token),
        };
        Ok(u64::from(removed.is_some()))
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<ObjectId> {
        self.check_online()?;
        let id = ObjectId::new();
        let stored = Expense {
            id: Some(id),
            ..expense.clone()
        };
        self.inner.expenses.insert(id, stored);
        Ok(id)
    }

    async fn find_expenses(&self, owner: &str) -> Result<Vec<Expense>> {
        self.check_online()?;
        Ok(self
            .inner
            .expenses
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_expense(&self, id: &ObjectId, owner: &str) -> Result<Option<Expense>> {
        self.check_online()?;
        Ok(self
            .inner
            .expenses
            .get(id)
            .filter(|expense| expense.owner == owner)
            .map(|expense| expense.value().clone()))
    }

    async fn replace_expense(&self, id: &ObjectId, expense: &Expense) -> Result<Option<Expense>> {
        self.check_online()?;
        match self.inner.expenses.get_mut(id) {
            Some(mut stored) if stored.owner == expense.owner => {
                *stored = Expense {
                    id: Some(*id),
                    ..expense.clone()
                };
                Ok(Some(stored.value().clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_expense(&self, id: &ObjectId, owner: &str) -> Result<bool> {
        self.check_online()?;
        Ok(self
            .inner
            .expenses
            .remove_if(id, |_, expense| expense.owner == owner)
            .is_some())
    }
}
