use serde::Deserialize;

use crate::db::{parse_id, Connection, SessionRepository, User, UserRepository};
use crate::error::{ExpenseServerError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Submitted credentials plus whatever user they name, if any.
#[derive(Debug)]
pub struct CredentialLookup {
    pub username: String,
    pub password: String,
    pub user: Option<User>,
}

/// The authenticated caller, handed explicitly to every resource handler.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user: User,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

pub async fn user_from_credentials(
    conn: &dyn Connection,
    credentials: &CredentialsRequest,
) -> Result<CredentialLookup> {
    let (username, password) = match (
        non_empty(credentials.username.as_deref()),
        non_empty(credentials.password.as_deref()),
    ) {
        (Some(username), Some(password)) => (username, password),
        _ => return Err(ExpenseServerError::CredentialsEmpty),
    };

    let user = UserRepository::new(conn).find(username).await?;

    Ok(CredentialLookup {
        username: username.to_lowercase(),
        password: password.to_string(),
        user,
    })
}

pub async fn user_from_token(conn: &dyn Connection, token: Option<&str>) -> Result<UserContext> {
    let token = token
        .and_then(parse_id)
        .ok_or(ExpenseServerError::InvalidToken)?;

    let session = SessionRepository::new(conn)
        .find_by_token(&token)
        .await?
        .ok_or_else(|| {
            log::warn!("Rejected unknown session token {}", token.to_hex());
            ExpenseServerError::InvalidToken
        })?;

    // A session whose user was removed is orphaned, not a storage fault.
    let user = UserRepository::new(conn)
        .find(&session.username)
        .await?
        .ok_or_else(|| {
            log::warn!(
                "Session {} refers to missing user {}",
                token.to_hex(),
                session.username
            );
            ExpenseServerError::InvalidToken
        })?;

    Ok(UserContext { user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, Store};
    use mongodb::bson::oid::ObjectId;

    fn credentials(username: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[actix_web::test]
    async fn test_credentials_empty() {
        let store = MemoryStore::new();
        let conn = store.connect().await.unwrap();

        let missing = user_from_credentials(conn.as_ref(), &CredentialsRequest::default()).await;
        assert!(matches!(missing, Err(ExpenseServerError::CredentialsEmpty)));

        let blank = user_from_credentials(conn.as_ref(), &credentials("alice", "")).await;
        assert!(matches!(blank, Err(ExpenseServerError::CredentialsEmpty)));
    }

    #[actix_web::test]
    async fn test_credentials_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        let conn = store.connect().await.unwrap();
        UserRepository::new(conn.as_ref())
            .create("alice", "secret", 4)
            .await
            .unwrap();

        let lookup = user_from_credentials(conn.as_ref(), &credentials("ALICE", "secret"))
            .await
            .unwrap();
        assert_eq!(lookup.username, "alice");
        assert!(lookup.user.is_some());

        let unknown = user_from_credentials(conn.as_ref(), &credentials("bob", "secret"))
            .await
            .unwrap();
        assert!(unknown.user.is_none());
    }

    #[actix_web::test]
    async fn test_token_resolution() {
        let store = MemoryStore::new();
        let conn = store.connect().await.unwrap();
        UserRepository::new(conn.as_ref())
            .create("alice", "secret", 4)
            .await
            .unwrap();
        let session = SessionRepository::new(conn.as_ref())
            .issue("alice")
            .await
            .unwrap();

        let context = user_from_token(conn.as_ref(), Some(&session.token.to_hex()))
            .await
            .unwrap();
        assert_eq!(context.user.username, "alice");
    }

    #[actix_web::test]
    async fn test_token_rejections() {
        let store = MemoryStore::new();
        let conn = store.connect().await.unwrap();

        assert!(matches!(
            user_from_token(conn.as_ref(), None).await,
            Err(ExpenseServerError::InvalidToken)
        ));
        assert!(matches!(
            user_from_token(conn.as_ref(), Some("garbage")).await,
            Err(ExpenseServerError::InvalidToken)
        ));
        assert!(matches!(
            user_from_token(conn.as_ref(), Some(&ObjectId::new().to_hex())).await,
            Err(ExpenseServerError::InvalidToken)
        ));

        // Session for a user that was never registered
        let orphan = SessionRepository::new(conn.as_ref())
            .issue("ghost")
            .await
            .unwrap();
        assert!(matches!(
            user_from_token(conn.as_ref(), Some(&orphan.token.to_hex())).await,
            Err(ExpenseServerError::InvalidToken)
        ));
    }
}
