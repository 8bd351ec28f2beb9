use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A stored expense row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Assigned by SQLite on insert, never reused (AUTOINCREMENT)
    pub id: i64,
    pub description: String,
    pub category: String,
    pub amount: f64,
    /// String-encoded calendar date, e.g. "2024-01-31"
    pub date: String,
    pub payment_method: String,
}

/// Untyped input for create/update, exactly as submitted by the form.
///
/// `amount` stays a string: SQLite's REAL column affinity coerces numeric
/// text, and the schema's CHECK rejects anything that is not a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseInput {
    pub description: String,
    pub category: String,
    pub amount: String,
    pub date: String,
    pub payment_method: String,
}

/// Everything the list page needs
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSummary {
    pub expenses: Vec<Expense>,
    pub total: f64,
}

// ============================================================================
// DATABASE HANDLE
// ============================================================================

/// Cheap, cloneable handle to the expenses database.
///
/// Holds only the path; every caller opens its own connection with
/// [`Database::connect`] and the connection closes when it is dropped.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the database, creating it from `schema_path` when the file is absent
    pub fn open_or_init(path: impl Into<PathBuf>, schema_path: &Path) -> Result<Self> {
        let db = Self::new(path);

        if !db.path.exists() {
            info!("Database not found at {:?}, initializing", db.path);
            let sql = fs::read_to_string(schema_path)
                .with_context(|| format!("Failed to read schema file {:?}", schema_path))?;

            // A file left behind by a failed run would skip initialization forever
            if let Err(e) = db.connect().and_then(|conn| init_schema(&conn, &sql)) {
                if db.path.exists() {
                    if let Err(rm) = fs::remove_file(&db.path) {
                        warn!("Failed to remove {:?} after schema error: {}", db.path, rm);
                    }
                }
                return Err(e);
            }
            info!("Database initialized");
        }

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection for one unit of work (one request, one command)
    pub fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open database {:?}", self.path))
    }
}

/// Run a schema script against the connection, all or nothing
pub fn init_schema(conn: &Connection, sql: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql).context("Failed to execute schema")?;
    tx.commit()?;
    Ok(())
}

// ============================================================================
// QUERIES
// ============================================================================

fn map_expense_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        description: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        date: row.get(4)?,
        payment_method: row.get(5)?,
    })
}

/// All expenses, most recent first (ties broken by insertion order)
pub fn list_expenses(conn: &Connection) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, description, category, amount, date, payment_method
         FROM expenses
         ORDER BY date DESC, id DESC",
    )?;

    let expenses = stmt
        .query_map([], map_expense_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expenses)
}

/// Sum of all amounts, 0.0 for an empty table
pub fn total_amount(conn: &Connection) -> Result<f64> {
    let total: Option<f64> =
        conn.query_row("SELECT SUM(amount) FROM expenses", [], |row| row.get(0))?;

    Ok(total.unwrap_or(0.0))
}

pub fn expense_summary(conn: &Connection) -> Result<ExpenseSummary> {
    Ok(ExpenseSummary {
        expenses: list_expenses(conn)?,
        total: total_amount(conn)?,
    })
}

/// Fetch one expense; `None` when the id does not exist
pub fn get_expense(conn: &Connection, id: i64) -> Result<Option<Expense>> {
    let expense = conn
        .query_row(
            "SELECT id, description, category, amount, date, payment_method
             FROM expenses
             WHERE id = ?1",
            [id],
            map_expense_row,
        )
        .optional()?;

    Ok(expense)
}

pub fn count_expenses(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// WRITES (each statement commits on its own)
// ============================================================================

/// Insert a new expense and return its id
pub fn insert_expense(conn: &Connection, input: &ExpenseInput) -> Result<i64> {
    conn.execute(
        "INSERT INTO expenses (description, category, amount, date, payment_method)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            input.description,
            input.category,
            input.amount,
            input.date,
            input.payment_method,
        ],
    )
    .with_context(|| format!("Failed to insert expense {:?}", input.description))?;

    let id = conn.last_insert_rowid();
    debug!(id, "expense added");

    Ok(id)
}

/// Overwrite every field of an expense. Returns the number of rows changed,
/// which is 0 when the id does not exist.
pub fn update_expense(conn: &Connection, id: i64, input: &ExpenseInput) -> Result<usize> {
    let changed = conn
        .execute(
            "UPDATE expenses
             SET description = ?1, category = ?2, amount = ?3, date = ?4, payment_method = ?5
             WHERE id = ?6",
            params![
                input.description,
                input.category,
                input.amount,
                input.date,
                input.payment_method,
                id,
            ],
        )
        .with_context(|| format!("Failed to update expense {}", id))?;

    debug!(id, changed, "expense updated");
    Ok(changed)
}

/// Remove an expense. Returns 0 when the id does not exist.
pub fn delete_expense(conn: &Connection, id: i64) -> Result<usize> {
    let changed = conn
        .execute("DELETE FROM expenses WHERE id = ?1", [id])
        .with_context(|| format!("Failed to delete expense {}", id))?;

    debug!(id, changed, "expense deleted");
    Ok(changed)
}

// ============================================================================
// CSV IMPORT / EXPORT
// ============================================================================

/// Read expenses from a CSV file with header
/// `description,category,amount,date,payment_method`
pub fn load_csv(csv_path: &Path) -> Result<Vec<ExpenseInput>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut inputs = Vec::new();
    for result in rdr.deserialize() {
        let input: ExpenseInput = result.context("Failed to deserialize expense")?;
        inputs.push(input);
    }

    Ok(inputs)
}

/// Insert a batch of expenses in a single transaction; all or nothing
pub fn import_expenses(conn: &mut Connection, inputs: &[ExpenseInput]) -> Result<usize> {
    let tx = conn.transaction()?;
    for input in inputs {
        insert_expense(&tx, input)?;
    }
    tx.commit()?;

    info!("Imported {} expenses", inputs.len());
    Ok(inputs.len())
}

/// Write every expense (list order) to a CSV file, returning the row count
pub fn export_csv(conn: &Connection, csv_path: &Path) -> Result<usize> {
    let expenses = list_expenses(conn)?;

    let mut wtr = csv::Writer::from_path(csv_path).context("Failed to create CSV file")?;
    for expense in &expenses {
        wtr.serialize(expense)?;
    }
    wtr.flush()?;

    Ok(expenses.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SCHEMA: &str = include_str!("../schema.sql");

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, SCHEMA).unwrap();
        conn
    }

    pub(crate) fn input(description: &str, amount: &str, date: &str) -> ExpenseInput {
        ExpenseInput {
            description: description.to_string(),
            category: "Food".to_string(),
            amount: amount.to_string(),
            date: date.to_string(),
            payment_method: "Cash".to_string(),
        }
    }

    #[test]
    fn test_insert_assigns_fresh_ids() {
        let conn = setup();

        let a = insert_expense(&conn, &input("Coffee", "3.50", "2024-01-01")).unwrap();
        let b = insert_expense(&conn, &input("Lunch", "12", "2024-01-01")).unwrap();

        assert_ne!(a, b);
        let listed: Vec<i64> = list_expenses(&conn).unwrap().iter().map(|e| e.id).collect();
        assert!(listed.contains(&a));
        assert!(listed.contains(&b));
    }

    #[test]
    fn test_amount_text_is_coerced() {
        let conn = setup();

        let id = insert_expense(&conn, &input("Coffee", "3.50", "2024-01-01")).unwrap();
        let expense = get_expense(&conn, id).unwrap().unwrap();

        assert_eq!(expense.amount, 3.5);
        assert_eq!(expense.description, "Coffee");
        assert_eq!(expense.category, "Food");
        assert_eq!(expense.payment_method, "Cash");
    }

    #[test]
    fn test_non_numeric_amount_rejected() {
        let conn = setup();

        assert!(insert_expense(&conn, &input("Bad", "abc", "2024-01-01")).is_err());
        assert!(insert_expense(&conn, &input("Empty", "", "2024-01-01")).is_err());
        assert_eq!(count_expenses(&conn).unwrap(), 0);
    }

    #[test]
    fn test_total_is_zero_when_empty() {
        let conn = setup();
        assert_eq!(total_amount(&conn).unwrap(), 0.0);
    }

    #[test]
    fn test_total_sums_amounts() {
        let conn = setup();
        insert_expense(&conn, &input("A", "10.25", "2024-01-01")).unwrap();
        insert_expense(&conn, &input("B", "4.75", "2024-01-02")).unwrap();
        insert_expense(&conn, &input("C", "5", "2024-01-03")).unwrap();

        assert!((total_amount(&conn).unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_list_orders_by_date_then_id_desc() {
        let conn = setup();
        let first = insert_expense(&conn, &input("Older", "1", "2024-01-01")).unwrap();
        let second = insert_expense(&conn, &input("Newer", "1", "2024-01-02")).unwrap();
        let third = insert_expense(&conn, &input("Same day", "1", "2024-01-02")).unwrap();

        let ids: Vec<i64> = list_expenses(&conn).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn test_update_changes_only_target() {
        let conn = setup();
        let a = insert_expense(&conn, &input("A", "1", "2024-01-01")).unwrap();
        let b = insert_expense(&conn, &input("B", "2", "2024-01-02")).unwrap();
        let before_b = get_expense(&conn, b).unwrap().unwrap();

        let edited = ExpenseInput {
            description: "A edited".to_string(),
            category: "Transport".to_string(),
            amount: "9.99".to_string(),
            date: "2024-02-01".to_string(),
            payment_method: "Credit Card".to_string(),
        };
        assert_eq!(update_expense(&conn, a, &edited).unwrap(), 1);

        let after_a = get_expense(&conn, a).unwrap().unwrap();
        assert_eq!(after_a.id, a);
        assert_eq!(after_a.description, "A edited");
        assert_eq!(after_a.category, "Transport");
        assert!((after_a.amount - 9.99).abs() < 1e-9);
        assert_eq!(after_a.date, "2024-02-01");
        assert_eq!(after_a.payment_method, "Credit Card");

        assert_eq!(get_expense(&conn, b).unwrap().unwrap(), before_b);
    }

    #[test]
    fn test_update_and_delete_missing_are_noops() {
        let conn = setup();
        insert_expense(&conn, &input("A", "1", "2024-01-01")).unwrap();

        assert_eq!(update_expense(&conn, 999, &input("X", "1", "2024-01-01")).unwrap(), 0);
        assert_eq!(delete_expense(&conn, 999).unwrap(), 0);
        assert_eq!(count_expenses(&conn).unwrap(), 1);
    }

    #[test]
    fn test_delete_then_get_is_none() {
        let conn = setup();
        let id = insert_expense(&conn, &input("A", "1", "2024-01-01")).unwrap();

        assert_eq!(delete_expense(&conn, id).unwrap(), 1);
        assert!(get_expense(&conn, id).unwrap().is_none());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let conn = setup();
        let id = insert_expense(&conn, &input("A", "1", "2024-01-01")).unwrap();
        delete_expense(&conn, id).unwrap();

        let next = insert_expense(&conn, &input("B", "1", "2024-01-01")).unwrap();
        assert!(next > id);
    }

    #[test]
    fn test_open_or_init_runs_schema_once() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("expenses.db");
        let schema_path = dir.path().join("schema.sql");
        fs::write(&schema_path, SCHEMA).unwrap();

        let db = Database::open_or_init(&db_path, &schema_path).unwrap();
        let conn = db.connect().unwrap();
        insert_expense(&conn, &input("Kept", "1", "2024-01-01")).unwrap();
        drop(conn);

        // Existing file: the schema (which drops the table) must not run again
        let db = Database::open_or_init(&db_path, &schema_path).unwrap();
        let conn = db.connect().unwrap();
        assert_eq!(count_expenses(&conn).unwrap(), 1);
    }

    #[test]
    fn test_open_or_init_missing_schema_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Database::open_or_init(
            dir.path().join("expenses.db"),
            &dir.path().join("missing.sql"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_schema_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("expenses.db");
        let bad_schema = dir.path().join("bad.sql");
        fs::write(
            &bad_schema,
            "CREATE TABLE expenses (id INTEGER PRIMARY KEY); THIS IS NOT SQL;",
        )
        .unwrap();

        assert!(Database::open_or_init(&db_path, &bad_schema).is_err());
        assert!(!db_path.exists());

        let good_schema = dir.path().join("schema.sql");
        fs::write(&good_schema, SCHEMA).unwrap();
        let db = Database::open_or_init(&db_path, &good_schema).unwrap();
        let conn = db.connect().unwrap();
        insert_expense(&conn, &input("A", "1", "2024-01-01")).unwrap();
        assert_eq!(count_expenses(&conn).unwrap(), 1);
    }

    #[test]
    fn test_init_schema_rolls_back_on_error() {
        let conn = Connection::open_in_memory().unwrap();

        let result = init_schema(
            &conn,
            "CREATE TABLE expenses (id INTEGER PRIMARY KEY); THIS IS NOT SQL;",
        );
        assert!(result.is_err());

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'expenses'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_csv_import_export() {
        let dir = tempfile::tempdir().unwrap();
        let in_path = dir.path().join("in.csv");
        fs::write(
            &in_path,
            "description,category,amount,date,payment_method\n\
             Coffee,Food,3.50,2024-01-01,Cash\n\
             Bus,Transport,2.25,2024-01-02,Debit Card\n",
        )
        .unwrap();

        let mut conn = setup();
        let inputs = load_csv(&in_path).unwrap();
        assert_eq!(import_expenses(&mut conn, &inputs).unwrap(), 2);

        let out_path = dir.path().join("out.csv");
        assert_eq!(export_csv(&conn, &out_path).unwrap(), 2);

        let written = fs::read_to_string(&out_path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("id,description,category,amount,date,payment_method")
        );
        assert!(lines.next().unwrap().contains("Bus,Transport,2.25,2024-01-02,Debit Card"));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let mut conn = setup();
        let inputs = vec![input("Good", "1", "2024-01-01"), input("Bad", "nope", "2024-01-02")];

        assert!(import_expenses(&mut conn, &inputs).is_err());
        assert_eq!(count_expenses(&conn).unwrap(), 0);
    }
}
