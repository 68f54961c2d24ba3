//! Hospital directory — a small in-memory SQLite reference table.
//!
//! One table, `chitwon_hospital(hospital_name, contact)`, seeded at startup
//! with the hospitals around Chitwan and their phone numbers. The agent
//! queries it through the natural-language SQL tool in `tools::hospital`;
//! this module owns only the storage and raw SELECT execution.
//!
//! Seeding uses `INSERT OR IGNORE`, so re-running it against an already
//! populated store is a no-op rather than a primary-key violation.

use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::info;

use crate::error::AppError;

pub const TABLE_NAME: &str = "chitwon_hospital";

/// Seed rows: (hospital_name, contact).
const SEED_ROWS: [(&str, &str); 4] = [
    ("BP Koirala Memorial Cancer Hospital", "056-524501"),
    ("Manakamana Hospital Pvt. Ltd.", "056-520180"),
    ("Bharatpur Hospital.", "056-597003"),
    ("Chitwan Medical College Teaching Hospital", "056-432933"),
];

const DDL: &str = "
    CREATE TABLE IF NOT EXISTS chitwon_hospital (
        hospital_name TEXT PRIMARY KEY,
        contact TEXT NOT NULL
    );
";

/// A result row as column-name/rendered-value pairs, in SELECT order.
pub type Row = Vec<(String, String)>;

/// In-memory hospital lookup table.
///
/// `rusqlite::Connection` is not `Sync`, and an in-memory database cannot be
/// reopened per operation, so the single connection lives behind a mutex.
/// The table is four rows; contention is not a concern.
pub struct HospitalDirectory {
    conn: Mutex<Connection>,
}

impl HospitalDirectory {
    /// Open a fresh in-memory database, create the table, and seed it.
    pub fn open_seeded() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Directory(format!("open in-memory db: {e}")))?;
        conn.execute_batch(DDL)
            .map_err(|e| AppError::Directory(format!("create table: {e}")))?;

        let dir = Self { conn: Mutex::new(conn) };
        dir.seed()?;
        info!(table = TABLE_NAME, rows = SEED_ROWS.len(), "hospital directory ready");
        Ok(dir)
    }

    /// Insert the seed rows. Idempotent: existing rows are left untouched.
    pub fn seed(&self) -> Result<(), AppError> {
        let conn = self.lock()?;
        for (name, contact) in SEED_ROWS {
            conn.execute(
                "INSERT OR IGNORE INTO chitwon_hospital (hospital_name, contact) VALUES (?1, ?2)",
                rusqlite::params![name, contact],
            )
            .map_err(|e| AppError::Directory(format!("seed row '{name}': {e}")))?;
        }
        Ok(())
    }

    /// The table DDL, as shown to the text-to-SQL prompt.
    pub fn schema_ddl() -> &'static str {
        DDL.trim()
    }

    /// Execute a single SELECT statement and return its rows.
    ///
    /// Anything other than one SELECT is rejected before reaching SQLite —
    /// the directory is read-only reference data and the SQL arrives from a
    /// language model.
    pub fn query(&self, sql: &str) -> Result<Vec<Row>, AppError> {
        let sql = validate_select(sql)?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Directory(format!("prepare '{sql}': {e}")))?;

        let column_names: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows_out = Vec::new();
        let mut rows = stmt
            .query([])
            .map_err(|e| AppError::Directory(format!("execute '{sql}': {e}")))?;

        while let Some(row) = rows
            .next()
            .map_err(|e| AppError::Directory(format!("read row: {e}")))?
        {
            let mut out = Vec::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                let value: Value = row
                    .get(i)
                    .map_err(|e| AppError::Directory(format!("decode column {name}: {e}")))?;
                out.push((name.clone(), render_value(value)));
            }
            rows_out.push(out);
        }
        Ok(rows_out)
    }

    /// Number of rows currently in the table.
    pub fn count(&self) -> Result<usize, AppError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM chitwon_hospital", [], |row| row.get(0))
            .map_err(|e| AppError::Directory(format!("count rows: {e}")))?;
        Ok(n as usize)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Directory("connection lock poisoned".into()))
    }
}

/// Accept exactly one SELECT statement; strip a trailing semicolon.
///
/// The check is deliberately coarse — a keyword gate, not a SQL parser. The
/// connection holds nothing but reference data, so the gate exists to turn
/// model mistakes into readable errors, not to sandbox hostile input.
fn validate_select(sql: &str) -> Result<&str, AppError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(AppError::Directory("empty SQL statement".into()));
    }
    if trimmed.contains(';') {
        return Err(AppError::Directory("multiple SQL statements not allowed".into()));
    }
    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if first_word != "SELECT" {
        return Err(AppError::Directory(format!(
            "only SELECT statements are allowed, got '{first_word}'"
        )));
    }
    Ok(trimmed)
}

fn render_value(value: Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_seeds_four_rows() {
        let dir = HospitalDirectory::open_seeded().unwrap();
        assert_eq!(dir.count().unwrap(), 4);
    }

    #[test]
    fn reseed_is_idempotent() {
        let dir = HospitalDirectory::open_seeded().unwrap();
        dir.seed().unwrap();
        dir.seed().unwrap();
        assert_eq!(dir.count().unwrap(), 4);
    }

    #[test]
    fn query_returns_named_columns() {
        let dir = HospitalDirectory::open_seeded().unwrap();
        let rows = dir
            .query("SELECT contact FROM chitwon_hospital WHERE hospital_name = 'Bharatpur Hospital.'")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], ("contact".to_string(), "056-597003".to_string()));
    }

    #[test]
    fn query_accepts_trailing_semicolon() {
        let dir = HospitalDirectory::open_seeded().unwrap();
        let rows = dir.query("SELECT hospital_name FROM chitwon_hospital;").unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn non_select_rejected() {
        let dir = HospitalDirectory::open_seeded().unwrap();
        assert!(dir.query("DELETE FROM chitwon_hospital").is_err());
        assert!(dir.query("DROP TABLE chitwon_hospital").is_err());
        assert!(dir.query("").is_err());
        // table untouched
        assert_eq!(dir.count().unwrap(), 4);
    }

    #[test]
    fn multiple_statements_rejected() {
        let dir = HospitalDirectory::open_seeded().unwrap();
        assert!(dir.query("SELECT 1; SELECT 2").is_err());
    }

    #[test]
    fn schema_ddl_names_table() {
        assert!(HospitalDirectory::schema_ddl().contains(TABLE_NAME));
    }
}
