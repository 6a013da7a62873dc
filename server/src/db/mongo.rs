use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};

use super::models::{Expense, Session, User};
use super::store::{Connection, Store};
use crate::error::{ExpenseServerError, Result};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, database_name: &str) -> Self {
        Self {
            db: client.database(database_name),
        }
    }

    pub async fn connect_uri(uri: &str, database_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self::new(client, database_name))
    }

    pub async fn init_indexes(&self) -> Result<()> {
        // One session per user
        let session_username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.db
            .collection::<Session>("sessions")
            .create_index(session_username_index)
            .await?;

        let owner_index = IndexModel::builder().keys(doc! { "owner": 1 }).build();

        self.db
            .collection::<Expense>("expenses")
            .create_index(owner_index)
            .await?;

        log::info!("Database indexes created successfully");
        Ok(())
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(MongoConnection {
            db: self.db.clone(),
        }))
    }
}

/// Request-scoped handle over the shared driver pool.
pub struct MongoConnection {
    db: Database,
}

impl MongoConnection {
    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn sessions(&self) -> Collection<Session> {
        self.db.collection("sessions")
    }

    fn expenses(&self) -> Collection<Expense> {
        self.db.collection("expenses")
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl Connection for MongoConnection {
    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let user = self.users().find_one(doc! { "_id": username }).await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<bool> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn upsert_session(&self, username: &str) -> Result<Session> {
        let upserted = self
            .sessions()
            .find_one_and_update(
                doc! { "username": username },
                doc! { "$setOnInsert": { "username": username } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        match upserted {
            Ok(Some(session)) => Ok(session),
            Ok(None) => Err(ExpenseServerError::Internal(format!(
                "session upsert for {} returned no document",
                username
            ))),
            // Lost an insert race on the unique username index; the winner's
            // session is the one to hand out.
            Err(err) if is_duplicate_key(&err) => self
                .sessions()
                .find_one(doc! { "username": username })
                .await?
                .ok_or_else(|| {
                    ExpenseServerError::Internal(format!(
                        "session for {} vanished after duplicate key",
                        username
                    ))
                }),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_session(&self, token: &ObjectId) -> Result<Option<Session>> {
        let session = self.sessions().find_one(doc! { "_id": *token }).await?;
        Ok(session)
    }

    async fn delete_sessions_by_username(&self, username: &str) -> Result<u64> {
        let result = self
            .sessions()
            .delete_many(doc! { "username": username })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_session(&self, token: &ObjectId) -> Result<u64> {
        let result = self.sessions().delete_one(doc! { "_id": *token }).await?;
        Ok(result.deleted_count)
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<ObjectId> {
        let result = self.expenses().insert_one(expense).await?;
        result.inserted_id.as_object_id().ok_or_else(|| {
            ExpenseServerError::Internal("inserted expense id is not an ObjectId".to_string())
        })
    }

    async fn find_expenses(&self, owner: &str) -> Result<Vec<Expense>> {
        let mut cursor = self.expenses().find(doc! { "owner": owner }).await?;

        let mut expenses = Vec::new();
        while let Some(expense) = cursor.try_next().await? {
            expenses.push(expense);
        }

        Ok(expenses)
    }

    async fn find_expense(&self, id: &ObjectId, owner: &str) -> Result<Option<Expense>> {
        let expense = self
            .expenses()
            .find_one(doc! { "_id": *id, "owner": owner })
            .await?;
        Ok(expense)
    }

    async fn replace_expense(&self, id: &ObjectId, expense: &Expense) -> Result<Option<Expense>> {
        let replacement = Expense {
            id: None,
            ..expense.clone()
        };

        let updated = self
            .expenses()
            .find_one_and_replace(
                doc! { "_id": *id, "owner": expense.owner.as_str() },
                replacement,
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn delete_expense(&self, id: &ObjectId, owner: &str) -> Result<bool> {
        let result = self
            .expenses()
            .delete_one(doc! { "_id": *id, "owner": owner })
            .await?;
        Ok(result.deleted_count > 0)
    }
}
