pub mod auth;
pub mod validation;

pub use auth::{
    user_from_credentials, user_from_token, CredentialLookup, CredentialsRequest, TokenQuery,
    UserContext,
};
pub use validation::{validate_expense, ExpensePayload};
