pub mod memory;
pub mod models;
pub mod mongo;
pub mod repository;
pub mod store;

pub use memory::MemoryStore;
pub use models::{Expense, ExpenseDraft, Session, User};
pub use mongo::MongoStore;
pub use repository::{parse_id, ExpenseRepository, SessionRepository, UserRepository};
pub use store::{Connection, Store};
