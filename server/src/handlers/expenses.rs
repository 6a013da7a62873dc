use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::{parse_id, Expense, ExpenseRepository, Store},
    error::{ExpenseServerError, Result},
    middleware::{user_from_token, validate_expense, ExpensePayload, TokenQuery},
    summary::{weekly_summary, WeekSummary},
};

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner: String,
    pub description: String,
    pub comment: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner: expense.owner,
            description: expense.description,
            comment: expense.comment,
            amount: expense.amount,
            date: expense.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WeekResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total: f64,
    pub items: usize,
    pub expenses: Vec<ExpenseResponse>,
}

impl From<WeekSummary> for WeekResponse {
    fn from(week: WeekSummary) -> Self {
        Self {
            start: week.start,
            end: week.end,
            total: week.total,
            items: week.items,
            expenses: week.expenses.into_iter().map(ExpenseResponse::from).collect(),
        }
    }
}

#[get("/expenses")]
pub async fn list_expenses(
    query: web::Query<TokenQuery>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let context = user_from_token(conn.as_ref(), query.token.as_deref()).await?;

    let expenses = ExpenseRepository::new(conn.as_ref())
        .list(&context.user)
        .await?;

    log::debug!(
        "Listed {} expenses for {}",
        expenses.len(),
        context.user.username
    );

    let response: Vec<ExpenseResponse> = expenses.into_iter().map(ExpenseResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

#[get("/expenses/weekly")]
pub async fn weekly_expenses(
    query: web::Query<TokenQuery>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let context = user_from_token(conn.as_ref(), query.token.as_deref()).await?;

    let expenses = ExpenseRepository::new(conn.as_ref())
        .list(&context.user)
        .await?;

    let response: Vec<WeekResponse> = weekly_summary(expenses)
        .into_iter()
        .map(WeekResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(response))
}

#[get("/expenses/{id}")]
pub async fn get_expense(
    path: web::Path<String>,
    query: web::Query<TokenQuery>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let context = user_from_token(conn.as_ref(), query.token.as_deref()).await?;
    let id = parse_id(&path).ok_or(ExpenseServerError::InvalidId)?;

    let expense = ExpenseRepository::new(conn.as_ref())
        .find_by_id(&id, &context.user)
        .await?
        .ok_or(ExpenseServerError::NotFound)?;

    Ok(HttpResponse::Ok().json(ExpenseResponse::from(expense)))
}

/// The body is only read after the caller is authenticated, so a bad token
/// wins over a bad body. The token may also travel in the body.
fn body_token(body: &Result<web::Json<ExpensePayload>>) -> Option<&str> {
    body.as_ref().ok().and_then(|payload| payload.token.as_deref())
}

#[post("/expenses")]
pub async fn create_expense(
    query: web::Query<TokenQuery>,
    body: Result<web::Json<ExpensePayload>>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let token = query.token.as_deref().or_else(|| body_token(&body));
    let context = user_from_token(conn.as_ref(), token).await?;
    let draft = validate_expense(&body?.into_inner())?;

    let expense = ExpenseRepository::new(conn.as_ref())
        .create(&context.user, draft)
        .await?;

    Ok(HttpResponse::Ok().json(ExpenseResponse::from(expense)))
}

#[put("/expenses/{id}")]
pub async fn update_expense(
    path: web::Path<String>,
    query: web::Query<TokenQuery>,
    body: Result<web::Json<ExpensePayload>>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let token = query.token.as_deref().or_else(|| body_token(&body));
    let context = user_from_token(conn.as_ref(), token).await?;
    let draft = validate_expense(&body?.into_inner())?;
    let id = parse_id(&path).ok_or(ExpenseServerError::InvalidId)?;

    let expense = ExpenseRepository::new(conn.as_ref())
        .update(&context.user, &id, draft)
        .await?
        .ok_or(ExpenseServerError::NoMatch)?;

    Ok(HttpResponse::Ok().json(ExpenseResponse::from(expense)))
}

#[delete("/expenses/{id}")]
pub async fn delete_expense(
    path: web::Path<String>,
    query: web::Query<TokenQuery>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let conn = store.connect().await?;
    let context = user_from_token(conn.as_ref(), query.token.as_deref()).await?;
    let id = parse_id(&path).ok_or(ExpenseServerError::InvalidId)?;

    let removed = ExpenseRepository::new(conn.as_ref())
        .delete(&context.user, &id)
        .await?;

    if !removed {
        return Err(ExpenseServerError::NoMatch);
    }

    Ok(HttpResponse::Ok().finish())
}
