use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    config::ServerConfig,
    db::{parse_id, SessionRepository, Store, UserRepository},
    error::{ExpenseServerError, Result},
    middleware::{user_from_credentials, CredentialsRequest},
};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserCreatedResponse {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutQuery {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A missing or unreadable body counts as empty credentials.
fn credentials(body: Option<web::Json<CredentialsRequest>>) -> CredentialsRequest {
    body.map(web::Json::into_inner).unwrap_or_default()
}

#[post("/login")]
pub async fn login(
    body: Option<web::Json<CredentialsRequest>>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let lookup = user_from_credentials(conn.as_ref(), &credentials(body)).await?;
    let sessions = SessionRepository::new(conn.as_ref());

    let user = match lookup.user {
        Some(user) => user,
        None => {
            log::warn!("Login attempt for unknown user: {}", lookup.username);
            return Err(ExpenseServerError::InvalidCredentials);
        }
    };

    if !user.verify_password(&lookup.password)? {
        log::warn!("Failed login attempt for user: {}", user.username);
        // A failed attempt forces the account to log in again everywhere.
        if let Err(err) = sessions.revoke_by_username(&user.username).await {
            log::error!("Failed to revoke sessions for {}: {}", user.username, err);
        }
        return Err(ExpenseServerError::InvalidCredentials);
    }

    let session = sessions.issue(&user.username).await?;
    log::info!("Successful login for user: {}", user.username);

    Ok(HttpResponse::Ok().json(LoginResponse {
        username: user.username,
        token: session.token.to_hex(),
    }))
}

async fn revoke_session(store: &dyn Store, query: &LogoutQuery) -> Result<()> {
    let conn = store.connect().await?;
    let sessions = SessionRepository::new(conn.as_ref());

    if let Some(token) = query.token.as_deref().and_then(parse_id) {
        sessions.revoke_by_token(&token).await?;
    } else if let Some(username) = query.username.as_deref().filter(|u| !u.is_empty()) {
        sessions.revoke_by_username(username).await?;
    }

    Ok(())
}

/// Always answers 200; there is nothing useful a client can do with a
/// failed logout.
#[get("/logout")]
pub async fn logout(query: web::Query<LogoutQuery>, store: web::Data<dyn Store>) -> HttpResponse {
    if let Err(err) = revoke_session(store.get_ref(), &query).await {
        log::error!("Logout failed: {}", err);
    }

    HttpResponse::Ok().finish()
}

#[post("/user")]
pub async fn create_user(
    body: Option<web::Json<CredentialsRequest>>,
    store: web::Data<dyn Store>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let lookup = user_from_credentials(conn.as_ref(), &credentials(body)).await?;

    if lookup.user.is_some() {
        log::info!("Signup rejected, username taken: {}", lookup.username);
        return Err(ExpenseServerError::UsernameExists);
    }

    let user = UserRepository::new(conn.as_ref())
        .create(&lookup.username, &lookup.password, config.bcrypt_cost)
        .await?;

    Ok(HttpResponse::Ok().json(UserCreatedResponse {
        username: user.username,
    }))
}
