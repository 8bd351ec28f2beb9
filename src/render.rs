// 🧾 List page rendering
// Fills the web/index.html shell with the expense table and running total

use crate::db::{Expense, ExpenseSummary};

const INDEX_TEMPLATE: &str = include_str!("../web/index.html");

/// Labels offered by the form selects. Stored values stay free-form.
pub const CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Housing",
    "Utilities",
    "Entertainment",
    "Health",
    "Shopping",
    "Other",
];

pub const PAYMENT_METHODS: &[&str] = &[
    "Cash",
    "Credit Card",
    "Debit Card",
    "Bank Transfer",
    "Mobile Payment",
];

/// Render the list page. `today` pre-fills the add form's date input.
pub fn render_index(summary: &ExpenseSummary, today: &str) -> String {
    let rows = if summary.expenses.is_empty() {
        r#"<tr><td colspan="6" class="empty">No expenses recorded yet.</td></tr>"#.to_string()
    } else {
        summary
            .expenses
            .iter()
            .map(render_row)
            .collect::<Vec<_>>()
            .join("\n")
    };

    // rows go in last so user text can never be read as a placeholder
    INDEX_TEMPLATE
        .replace("{{total}}", &format_amount(summary.total))
        .replace("{{today}}", &escape_html(today))
        .replace("{{category_options}}", &render_options(CATEGORIES))
        .replace("{{payment_method_options}}", &render_options(PAYMENT_METHODS))
        .replace("{{rows}}", &rows)
}

fn render_row(expense: &Expense) -> String {
    format!(
        r#"<tr>
                <td>{date}</td>
                <td>{description}</td>
                <td>{category}</td>
                <td>{payment_method}</td>
                <td class="amount">{amount}</td>
                <td class="actions">
                    <button type="button" class="edit-btn" data-id="{id}">Edit</button>
                    <form class="delete-form" method="post" action="/delete/{id}">
                        <button type="submit">Delete</button>
                    </form>
                </td>
            </tr>"#,
        id = expense.id,
        date = escape_html(&expense.date),
        description = escape_html(&expense.description),
        category = escape_html(&expense.category),
        payment_method = escape_html(&expense.payment_method),
        amount = format_amount(expense.amount),
    )
}

fn render_options(labels: &[&str]) -> String {
    labels
        .iter()
        .map(|label| {
            let label = escape_html(label);
            format!(r#"<option value="{label}">{label}</option>"#)
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Two decimals, e.g. `12.5` -> `12.50`
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
