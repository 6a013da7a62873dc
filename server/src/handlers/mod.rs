pub mod auth;
pub mod expenses;
pub mod health;

use actix_web::web;

pub use auth::{create_user, login, logout};
pub use expenses::{
    create_expense, delete_expense, get_expense, list_expenses, update_expense, weekly_expenses,
};
pub use health::health_check;

/// Registers every route. `/expenses/weekly` goes before `/expenses/{id}` so
/// the literal segment wins.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(login)
        .service(logout)
        .service(create_user)
        .service(list_expenses)
        .service(weekly_expenses)
        .service(get_expense)
        .service(create_expense)
        .service(update_expense)
        .service(delete_expense);
}
