use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde_json::Value;
use tracing::{error, info};

use crate::database::ResultRow;
use crate::error::WriteError;

/// Writes result sets as `query_results_<stamp>.csv` plus a
/// `query_metadata_<stamp>.txt` sidecar.
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        ResultWriter {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the CSV path, or `None` when nothing was written. Failures
    /// are reported on the console and never propagate.
    pub fn save(&self, rows: &[ResultRow], query: &str) -> Option<PathBuf> {
        if rows.is_empty() {
            println!("No results to save");
            return None;
        }

        match self.write_at(rows, query, Local::now()) {
            Ok(path) => {
                println!("Results saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                println!("Error saving to CSV: {}", e);
                error!(error = %e, "could not write query results");
                None
            }
        }
    }

    pub fn write_at(
        &self,
        rows: &[ResultRow],
        query: &str,
        now: DateTime<Local>,
    ) -> Result<PathBuf, WriteError> {
        fs::create_dir_all(&self.output_dir)?;

        let stamp = now.format("%Y%m%d_%H%M%S");
        let csv_path = self.output_dir.join(format!("query_results_{}.csv", stamp));
        let metadata_path = self.output_dir.join(format!("query_metadata_{}.txt", stamp));

        let headers = collect_headers(rows);
        let mut writer = csv::Writer::from_path(&csv_path)?;
        writer.write_record(&headers)?;
        for row in rows {
            writer.write_record(headers.iter().map(|h| cell(row.get(h.as_str()))))?;
        }
        writer.flush()?;

        fs::write(
            &metadata_path,
            format!(
                "Query executed: {}\nTimestamp: {}\nNumber of results: {}",
                query,
                now.format("%Y-%m-%d %H:%M:%S%.6f"),
                rows.len()
            ),
        )?;

        info!(path = %csv_path.display(), rows = rows.len(), "query results written");
        Ok(csv_path)
    }
}

/// Union of all column names, in the order they are first seen.
fn collect_headers(rows: &[ResultRow]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for key in rows.iter().flat_map(|row| row.keys()) {
        if !headers.iter().any(|h| h == key) {
            headers.push(key.clone());
        }
    }
    headers
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
