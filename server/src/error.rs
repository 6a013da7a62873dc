use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ExpenseServerError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Username and password are required")]
    CredentialsEmpty,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session token missing or invalid")]
    InvalidToken,

    #[error("Malformed expense id")]
    InvalidId,

    #[error("Username already exists")]
    UsernameExists,

    #[error("Expense description is empty")]
    DescriptionEmpty,

    #[error("Expense comment is empty")]
    CommentEmpty,

    #[error("Expense amount is not a finite number")]
    AmountInvalid,

    #[error("Expense date is empty")]
    DateEmpty,

    #[error("Expense date is not a valid timestamp")]
    DateInvalid,

    /// Single fetch found nothing for this id and owner.
    #[error("Expense not found")]
    NotFound,

    /// Update or delete matched nothing for this id and owner.
    #[error("No matching expense")]
    NoMatch,

    /// A store call failed; `op` is the code reported to the client.
    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: Box<ExpenseServerError>,
    },

    #[error("Malformed request body: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ExpenseServerError {
    /// Stable code the client maps to a user-facing message.
    pub fn code(&self) -> &'static str {
        match self {
            ExpenseServerError::CredentialsEmpty => "credentials.empty.error",
            ExpenseServerError::InvalidCredentials => "credentials.invalid.error",
            ExpenseServerError::InvalidToken => "invalid.token.error",
            ExpenseServerError::InvalidId => "expense.invalid.id",
            ExpenseServerError::UsernameExists => "username.already.exists",
            ExpenseServerError::DescriptionEmpty => "expense.description.empty",
            ExpenseServerError::CommentEmpty => "expense.comment.empty",
            ExpenseServerError::AmountInvalid => "expense.amount.invalid",
            ExpenseServerError::DateEmpty => "expense.date.empty",
            ExpenseServerError::DateInvalid => "expense.date.invalid",
            ExpenseServerError::NotFound | ExpenseServerError::NoMatch => "expense.not.found",
            ExpenseServerError::Storage { op, .. } => *op,
            ExpenseServerError::BadRequest(_) => "request.invalid",
            ExpenseServerError::Database(_)
            | ExpenseServerError::PasswordHash(_)
            | ExpenseServerError::Config(_)
            | ExpenseServerError::Internal(_) => "internal.error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: &'static str,
}

impl ResponseError for ExpenseServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ExpenseServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ExpenseServerError::NotFound => StatusCode::NOT_FOUND,
            ExpenseServerError::CredentialsEmpty
            | ExpenseServerError::InvalidCredentials
            | ExpenseServerError::InvalidId
            | ExpenseServerError::UsernameExists
            | ExpenseServerError::DescriptionEmpty
            | ExpenseServerError::CommentEmpty
            | ExpenseServerError::AmountInvalid
            | ExpenseServerError::DateEmpty
            | ExpenseServerError::DateInvalid
            | ExpenseServerError::NoMatch
            | ExpenseServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ExpenseServerError::Database(_)
            | ExpenseServerError::PasswordHash(_)
            | ExpenseServerError::Storage { .. }
            | ExpenseServerError::Config(_)
            | ExpenseServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            success: false,
            error: self.code(),
        })
    }
}

/// Body extraction failures from actix (missing, unreadable or malformed JSON).
impl From<actix_web::Error> for ExpenseServerError {
    fn from(err: actix_web::Error) -> Self {
        ExpenseServerError::BadRequest(err.to_string())
    }
}

/// Tags a failed store call with the operation code, for use in `map_err`.
pub fn storage(op: &'static str) -> impl FnOnce(ExpenseServerError) -> ExpenseServerError {
    move |source| ExpenseServerError::Storage {
        op,
        source: Box::new(source),
    }
}

pub type Result<T> = std::result::Result<T, ExpenseServerError>;
