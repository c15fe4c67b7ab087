use regex::Regex;
use std::sync::OnceLock;
use tracing::{error, info};

use crate::database::{error_row, QueryBackend, ResultRow};
use crate::error::DatabaseError;

const READ_ONLY_VERBS: [&str; 6] = ["SELECT", "SHOW", "WITH", "DESCRIBE", "DESC", "EXPLAIN"];

fn re_write_keyword() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(INSERT|UPDATE|DELETE|REPLACE|DROP|ALTER|CREATE|TRUNCATE|GRANT|REVOKE|RENAME|LOAD|CALL|INTO)\b",
        )
        .ok()
    })
    .as_ref()
}

/// Runs extracted statements. Never fails: a database error comes back
/// as a single synthetic row carrying the message.
pub struct QueryExecutor {
    backend: Box<dyn QueryBackend>,
    read_only: bool,
}

impl QueryExecutor {
    pub fn new(backend: Box<dyn QueryBackend>) -> Self {
        QueryExecutor {
            backend,
            read_only: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub async fn execute(&mut self, query: &str) -> Vec<ResultRow> {
        println!("Attempting to execute query: {}", query);

        match self.try_execute(query).await {
            Ok(rows) => {
                println!(
                    "Query executed successfully. Results: {}",
                    serde_json::to_string(&rows).unwrap_or_else(|_| format!("{:?}", rows))
                );
                info!(rows = rows.len(), "query executed");
                rows
            }
            Err(e) => {
                println!("Database error: {}", e);
                error!(error = %e, "query failed");
                vec![error_row(e.to_string())]
            }
        }
    }

    pub async fn close(&mut self) {
        self.backend.close().await;
    }

    async fn try_execute(&mut self, query: &str) -> Result<Vec<ResultRow>, DatabaseError> {
        if self.read_only && !is_read_only_statement(query) {
            return Err(DatabaseError::ReadOnly);
        }

        self.backend.fetch_rows(query).await
    }
}

/// Conservative check used by `--read-only`: one statement, a read verb
/// first, and no write keyword anywhere outside quoted literals.
fn is_read_only_statement(query: &str) -> bool {
    let bare = blank_quoted(query);
    let body = bare.trim_end().trim_end_matches(';');
    if body.contains(';') {
        return false;
    }

    let first_word = body
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();

    if !READ_ONLY_VERBS
        .iter()
        .any(|verb| first_word.eq_ignore_ascii_case(verb))
    {
        return false;
    }

    match re_write_keyword() {
        Some(re) => !re.is_match(body),
        None => false,
    }
}

/// Replaces the contents of '...', "..." and `...` literals with spaces so
/// keywords and semicolons inside them are ignored.
fn blank_quoted(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in query.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q != '`' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    out.push(c);
                    continue;
                }
                out.push(' ');
            }
            None => {
                if c == '\'' || c == '"' || c == '`' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }

    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Backend double that records every statement it receives.
    #[derive(Clone, Default)]
    pub(crate) struct FakeBackend {
        pub rows: Vec<ResultRow>,
        pub fail_with: Option<String>,
        pub seen: Arc<Mutex<Vec<String>>>,
    }

    impl FakeBackend {
        pub(crate) fn returning(rows: Vec<ResultRow>) -> Self {
            FakeBackend {
                rows,
                ..Default::default()
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            FakeBackend {
                fail_with: Some(message.to_string()),
                ..Default::default()
            }
        }

        pub(crate) fn statements(&self) -> Vec<String> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl QueryBackend for FakeBackend {
        async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<ResultRow>, DatabaseError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(sql.to_string());
            }
            match &self.fail_with {
                Some(message) => Err(DatabaseError::Sqlx(sqlx::Error::Protocol(message.clone()))),
                None => Ok(self.rows.clone()),
            }
        }
    }

    pub(crate) fn row(value: serde_json::Value) -> ResultRow {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("row fixture must be an object"),
        }
    }

    #[tokio::test]
    async fn test_rows_are_returned_as_is() {
        let backend = FakeBackend::returning(vec![
            row(json!({"id": 1, "name": "alice"})),
            row(json!({"id": 2, "name": "bob"})),
        ]);
        let mut executor = QueryExecutor::new(Box::new(backend));

        let rows = executor.execute("SELECT id, name FROM users;").await;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], json!("bob"));
    }

    #[tokio::test]
    async fn test_database_failure_becomes_error_row() {
        let mut executor = QueryExecutor::new(Box::new(FakeBackend::failing(
            "Table 'shop.nope' doesn't exist",
        )));

        let rows = executor.execute("SELECT * FROM nope;").await;

        assert_eq!(rows.len(), 1);
        let message = rows[0]["error"].as_str().unwrap_or_default();
        assert!(message.contains("Table 'shop.nope' doesn't exist"));
    }

    #[tokio::test]
    async fn test_read_only_mode_refuses_writes_without_touching_backend() {
        let backend = FakeBackend::returning(vec![]);
        let mut executor = QueryExecutor::new(Box::new(backend.clone())).read_only(true);

        let rows = executor.execute("DELETE FROM users;").await;

        assert_eq!(rows, vec![error_row(DatabaseError::ReadOnly.to_string())]);
        assert!(backend.statements().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_mode_allows_reads() {
        let backend = FakeBackend::returning(vec![row(json!({"Tables_in_shop": "users"}))]);
        let mut executor = QueryExecutor::new(Box::new(backend.clone())).read_only(true);

        let rows = executor.execute("show tables;").await;

        assert_eq!(rows.len(), 1);
        assert_eq!(backend.statements(), vec!["show tables;".to_string()]);
    }

    #[tokio::test]
    async fn test_read_only_mode_refuses_stacked_statements() {
        let backend = FakeBackend::returning(vec![]);
        let mut executor = QueryExecutor::new(Box::new(backend.clone())).read_only(true);

        let rows = executor.execute("SELECT 1; DROP TABLE users;").await;

        assert_eq!(rows, vec![error_row(DatabaseError::ReadOnly.to_string())]);
        assert!(backend.statements().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_mode_refuses_writes_behind_cte() {
        let backend = FakeBackend::returning(vec![]);
        let mut executor = QueryExecutor::new(Box::new(backend.clone())).read_only(true);

        let rows = executor
            .execute("WITH x AS (SELECT 1) DELETE FROM users;")
            .await;

        assert_eq!(rows, vec![error_row(DatabaseError::ReadOnly.to_string())]);
        assert!(backend.statements().is_empty());
    }

    #[tokio::test]
    async fn test_successful_query_echoes_rows() {
        let backend = FakeBackend::returning(vec![row(json!({"n": 1}))]);
        let mut executor = QueryExecutor::new(Box::new(backend));

        let rows = executor.execute("SELECT 1 AS n;").await;

        assert_eq!(serde_json::to_string(&rows).unwrap(), r#"[{"n":1}]"#);
    }

    #[test]
    fn test_quoted_text_is_ignored() {
        assert!(is_read_only_statement(
            "SELECT * FROM audit WHERE action = 'DELETE; DROP';"
        ));
        assert!(is_read_only_statement(
            r#"SELECT "it\'s; fine", `update` FROM t;"#
        ));
        assert!(is_read_only_statement("SELECT updated_at FROM users ;  "));
    }

    #[test]
    fn test_read_only_statement_detection() {
        assert!(is_read_only_statement("SELECT 1;"));
        assert!(is_read_only_statement("  (select 1) union (select 2);"));
        assert!(is_read_only_statement("WITH t AS (SELECT 1) SELECT * FROM t;"));
        assert!(is_read_only_statement("describe users;"));
        assert!(!is_read_only_statement("UPDATE users SET a = 1;"));
        assert!(!is_read_only_statement("SELECTED;"));
        assert!(!is_read_only_statement(""));
        assert!(!is_read_only_statement("SELECT 1; DROP TABLE users"));
        assert!(!is_read_only_statement("WITH x AS (SELECT 1) UPDATE t SET a = 1;"));
        assert!(!is_read_only_statement("SELECT * INTO OUTFILE '/tmp/x' FROM users;"));
        assert!(!is_read_only_statement("SELECT 1 /*! ; DROP TABLE users */;"));
    }
}
