// Expense Tracker - Core Library
// Exposes the expense store for the CLI, the web server and tests

pub mod config;
pub mod db;
pub mod render;

#[cfg(feature = "server")]
pub mod error;
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use config::{init_logging, ServerConfig};
pub use db::{
    Database, Expense, ExpenseInput, ExpenseSummary,
    init_schema, list_expenses, total_amount, expense_summary, get_expense, count_expenses,
    insert_expense, update_expense, delete_expense,
    load_csv, import_expenses, export_csv,
};
pub use render::render_index;

#[cfg(feature = "server")]
pub use error::{AppError, AppResult};
#[cfg(feature = "server")]
pub use server::{build_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
