// Expense Tracker - HTTP surface
// Five handlers over the expenses table, one connection per request

use axum::{
    extract::{Path, State},
    response::{Html, Json, Redirect},
    routing::{get, post},
    Form, Router,
};
use std::path::Path as FsPath;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::db::{
    delete_expense, expense_summary, get_expense, insert_expense, update_expense, Database,
    Expense, ExpenseInput,
};
use crate::error::{AppError, AppResult};
use crate::render::render_index;

/// State handed to every handler; the database handle is injected here
/// instead of living in a per-request global slot.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - list page with running total
async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let conn = state.db.connect()?;
    let summary = expense_summary(&conn)?;
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    Ok(Html(render_index(&summary, &today)))
}

/// POST /add - create an expense from the form
async fn add_expense(
    State(state): State<AppState>,
    Form(input): Form<ExpenseInput>,
) -> AppResult<Redirect> {
    let conn = state.db.connect()?;
    insert_expense(&conn, &input)?;

    Ok(Redirect::to("/"))
}

/// POST /delete/:id - remove an expense (missing ids are ignored)
async fn remove_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let conn = state.db.connect()?;
    delete_expense(&conn, id)?;

    Ok(Redirect::to("/"))
}

/// POST /edit/:id - overwrite an expense (missing ids are ignored)
async fn edit_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(input): Form<ExpenseInput>,
) -> AppResult<Redirect> {
    let conn = state.db.connect()?;
    update_expense(&conn, id, &input)?;

    Ok(Redirect::to("/"))
}

/// GET /expense/:id - one expense as JSON, 404 when absent
async fn fetch_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Expense>> {
    let conn = state.db.connect()?;
    let expense = get_expense(&conn, id)?.ok_or(AppError::NotFound)?;

    Ok(Json(expense))
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(db: Database, static_dir: &FsPath) -> Router {
    let state = AppState { db };

    Router::new()
        .route("/", get(index))
        .route("/add", post(add_expense))
        .route("/delete/:id", post(remove_expense))
        .route("/edit/:id", post(edit_expense))
        .route("/expense/:id", get(fetch_expense))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
