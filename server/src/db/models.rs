use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Lowercased username; doubles as the document id.
    #[serde(rename = "_id")]
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, password: &str, cost: u32) -> Result<Self> {
        let password_hash = bcrypt::hash(password, cost)?;

        Ok(Self {
            username: username.to_lowercase(),
            password_hash,
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, &self.password_hash)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub token: ObjectId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner: String,
    pub description: String,
    pub comment: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// A validated expense payload that has not been bound to an owner yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub description: String,
    pub comment: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

impl ExpenseDraft {
    pub fn into_expense(self, id: Option<ObjectId>, owner: &str) -> Expense {
        Expense {
            id,
            owner: owner.to_string(),
            description: self.description,
            comment: self.comment,
            amount: self.amount,
            date: self.date,
        }
    }
}
