use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use expense_tracker::{
    count_expenses, export_csv, expense_summary, import_expenses, init_logging, load_csv,
    render::format_amount, Database,
};

#[derive(Parser)]
#[command(name = "expense-tracker")]
#[command(version = expense_tracker::VERSION)]
#[command(about = "Expense Tracker - command-line tools for the expenses database")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(short, long, global = true, default_value = "expenses.db")]
    db: PathBuf,

    /// Schema script used when the database file does not exist yet
    #[arg(short, long, global = true, default_value = "schema.sql")]
    schema: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database from the schema file if it is missing
    Init,

    /// Print every expense, most recent first, and the total
    List,

    /// Import expenses from a CSV file
    /// (header: description,category,amount,date,payment_method)
    Import {
        /// CSV file to read
        path: PathBuf,
    },

    /// Export every expense to a CSV file
    Export {
        /// CSV file to write
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let db = Database::open_or_init(&cli.db, &cli.schema)?;

    match cli.command {
        Commands::Init => {
            let conn = db.connect()?;
            let count = count_expenses(&conn)?;
            info!("Database ready at {:?}", db.path());
            println!("{} holds {} expenses", db.path().display(), count);
        }
        Commands::List => run_list(&db)?,
        Commands::Import { path } => {
            let inputs = load_csv(&path)?;
            let mut conn = db.connect()?;
            let inserted = import_expenses(&mut conn, &inputs)?;
            println!("Imported {} expenses from {}", inserted, path.display());
        }
        Commands::Export { path } => {
            let conn = db.connect()?;
            let written = export_csv(&conn, &path)?;
            println!("Exported {} expenses to {}", written, path.display());
        }
    }

    Ok(())
}

fn run_list(db: &Database) -> Result<()> {
    let conn = db.connect()?;
    let summary = expense_summary(&conn)?;

    println!(
        "{:>5}  {:<10}  {:<28}  {:<14}  {:<14}  {:>10}",
        "ID", "DATE", "DESCRIPTION", "CATEGORY", "PAYMENT", "AMOUNT"
    );
    for expense in &summary.expenses {
        println!(
            "{:>5}  {:<10}  {:<28}  {:<14}  {:<14}  {:>10}",
            expense.id,
            expense.date,
            expense.description,
            expense.category,
            expense.payment_method,
            format_amount(expense.amount),
        );
    }
    println!("\nTotal: {}", format_amount(summary.total));

    Ok(())
}
