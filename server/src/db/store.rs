//! Storage seam shared by the MongoDB and in-memory backends.
//!
//! A [`Store`] hands out one [`Connection`] per request. Every method on a
//! connection is a single document operation; ownership filtering, id
//! validation and session semantics live in the repositories on top.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::models::{Expense, Session, User};
use crate::error::Result;

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a connection scoped to a single request.
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

#[async_trait]
pub trait Connection: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Returns `false` when a user with the same id already exists.
    async fn insert_user(&self, user: &User) -> Result<bool>;

    /// Get-or-create keyed by username. An existing session is returned as is.
    async fn upsert_session(&self, username: &str) -> Result<Session>;

    async fn find_session(&self, token: &ObjectId) -> Result<Option<Session>>;

    async fn delete_sessions_by_username(&self, username: &str) -> Result<u64>;

    async fn delete_session(&self, token: &ObjectId) -> Result<u64>;

    /// Persists the expense and returns its new id.
    async fn insert_expense(&self, expense: &Expense) -> Result<ObjectId>;

    async fn find_expenses(&self, owner: &str) -> Result<Vec<Expense>>;

    async fn find_expense(&self, id: &ObjectId, owner: &str) -> Result<Option<Expense>>;

    /// Replaces every field except the id of the document matching
    /// `id` and `expense.owner`. Returns the stored document after the write.
    async fn replace_expense(&self, id: &ObjectId, expense: &Expense) -> Result<Option<Expense>>;

    async fn delete_expense(&self, id: &ObjectId, owner: &str) -> Result<bool>;
}
