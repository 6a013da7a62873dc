use mongodb::bson::oid::ObjectId;

use super::models::{Expense, ExpenseDraft, Session, User};
use super::store::Connection;
use crate::error::{storage, ExpenseServerError, Result};

/// Parse a client-supplied identifier. `None` when it is not a 24-digit hex id.
pub fn parse_id(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw).ok()
}

pub struct UserRepository<'a> {
    conn: &'a dyn Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a dyn Connection) -> Self {
        Self { conn }
    }

    pub async fn find(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .find_user(&username.to_lowercase())
            .await
            .map_err(storage("user.search.failure"))
    }

    /// Fails with `UsernameExists` if the lowercased username is taken.
    pub async fn create(&self, username: &str, password: &str, cost: u32) -> Result<User> {
        let user = User::new(username, password, cost)?;

        let inserted = self
            .conn
            .insert_user(&user)
            .await
            .map_err(storage("user.insert.failure"))?;
        if !inserted {
            return Err(ExpenseServerError::UsernameExists);
        }

        log::info!("Created user {}", user.username);
        Ok(user)
    }
}

pub struct SessionRepository<'a> {
    conn: &'a dyn Connection,
}

impl<'a> SessionRepository<'a> {
    pub fn new(conn: &'a dyn Connection) -> Self {
        Self { conn }
    }

    /// Get-or-create: an existing session for `username` keeps its token.
    pub async fn issue(&self, username: &str) -> Result<Session> {
        let session = self
            .conn
            .upsert_session(&username.to_lowercase())
            .await
            .map_err(storage("session.update.failure"))?;
        log::info!(
            "Issued session {} for user {}",
            session.token.to_hex(),
            session.username
        );
        Ok(session)
    }

    pub async fn find_by_token(&self, token: &ObjectId) -> Result<Option<Session>> {
        self.conn
            .find_session(token)
            .await
            .map_err(storage("session.search.failure"))
    }

    pub async fn revoke_by_username(&self, username: &str) -> Result<u64> {
        let removed = self
            .conn
            .delete_sessions_by_username(&username.to_lowercase())
            .await
            .map_err(storage("session.update.failure"))?;
        if removed > 0 {
            log::info!("Revoked {} session(s) for user {}", removed, username);
        }
        Ok(removed)
    }

    pub async fn revoke_by_token(&self, token: &ObjectId) -> Result<u64> {
        let removed = self
            .conn
            .delete_session(token)
            .await
            .map_err(storage("session.update.failure"))?;
        if removed > 0 {
            log::info!("Revoked session {}", token.to_hex());
        }
        Ok(removed)
    }
}

/// Every operation is filtered by the owning username; a record owned by
/// someone else behaves exactly like a missing one.
pub struct ExpenseRepository<'a> {
    conn: &'a dyn Connection,
}

impl<'a> ExpenseRepository<'a> {
    pub fn new(conn: &'a dyn Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, owner: &User, draft: ExpenseDraft) -> Result<Expense> {
        let mut expense = draft.into_expense(None, &owner.username);
        let id = self
            .conn
            .insert_expense(&expense)
            .await
            .map_err(storage("expense.insert.failure"))?;
        expense.id = Some(id);

        log::info!("Created expense {} for {}", id.to_hex(), owner.username);
        Ok(expense)
    }

    pub async fn list(&self, owner: &User) -> Result<Vec<Expense>> {
        self.conn
            .find_expenses(&owner.username)
            .await
            .map_err(storage("expense.fetch.failure"))
    }

    pub async fn find_by_id(&self, id: &ObjectId, owner: &User) -> Result<Option<Expense>> {
        self.conn
            .find_expense(id, &owner.username)
            .await
            .map_err(storage("expense.search.failure"))
    }

    /// Full replace. The owner is stamped from `owner`, never from the payload.
    pub async fn update(
        &self,
        owner: &User,
        id: &ObjectId,
        draft: ExpenseDraft,
    ) -> Result<Option<Expense>> {
        let expense = draft.into_expense(None, &owner.username);
        let updated = self
            .conn
            .replace_expense(id, &expense)
            .await
            .map_err(storage("expense.update.failure"))?;

        if updated.is_some() {
            log::info!("Updated expense {} for {}", id.to_hex(), owner.username);
        }
        Ok(updated)
    }

    /// Returns whether a record was actually removed.
    pub async fn delete(&self, owner: &User, id: &ObjectId) -> Result<bool> {
        let removed = self
            .conn
            .delete_expense(id, &owner.username)
            .await
            .map_err(storage("expense.delete.failure"))?;

        if removed {
            log::info!("Deleted expense {} for {}", id.to_hex(), owner.username);
        }
        Ok(removed)
    }
}
