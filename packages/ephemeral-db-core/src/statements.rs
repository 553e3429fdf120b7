//! SQL issued by the scenario.
//!
//! Every value is passed through a positional placeholder.

/// Step names used in logs and errors.
pub mod step {
    pub const CREATE_TABLE: &str = "create_table";
    pub const INSERT: &str = "insert";
    pub const SELECT: &str = "select";
    pub const DELETE: &str = "delete";
    pub const VERIFY_DELETE: &str = "verify_delete";
}

/// Schema for `table`: serial identifier plus a required text name.
pub fn create_table(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} (id SERIAL PRIMARY KEY, name TEXT NOT NULL)")
}

pub fn insert(table: &str) -> String {
    format!("INSERT INTO {table} (name) VALUES ($1)")
}

pub fn select_by_name(table: &str) -> String {
    format!("SELECT id, name FROM {table} WHERE name = $1")
}

pub fn delete_by_name(table: &str) -> String {
    format!("DELETE FROM {table} WHERE name = $1")
}

/// Returns true if `table` is a plain lowercase SQL identifier.
///
/// Table names are interpolated, so anything else is refused.
pub fn is_valid_identifier(table: &str) -> bool {
    let mut chars = table.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    table.len() <= 63 && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
