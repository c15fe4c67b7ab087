use std::path::PathBuf;

use clap::Parser;
use sqlx::mysql::MySqlConnectOptions;
use url::Url;

use crate::database::ReconnectPolicy;

pub const DEFAULT_MODEL: &str = "qwen:1.8b";

/// Runtime settings. Every field can come from a flag or from the
/// environment (a `.env` file is loaded before parsing).
#[derive(Parser, Debug, Clone)]
#[command(name = "db-query-assistant")]
#[command(about = "Ask questions about your database in plain language", long_about = None)]
#[command(version)]
pub struct Config {
    /// Database host
    #[arg(long, env = "DB_HOST", default_value = "127.0.0.1")]
    pub db_host: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,

    /// Database user
    #[arg(long, env = "DB_USER", default_value = "root")]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database (schema) name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// What to do when the connection is lost
    #[arg(long, env = "DB_RECONNECT", value_enum, default_value_t = ReconnectPolicy::OnDemand)]
    pub reconnect: ReconnectPolicy,

    /// Base URL of the Ollama server
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost", value_parser = parse_base_url)]
    pub ollama_host: Url,

    #[arg(long, env = "OLLAMA_PORT", default_value_t = 11434)]
    pub ollama_port: u16,

    /// Model used to answer questions
    #[arg(long, short, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Directory receiving the CSV and metadata files
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Only run SELECT/SHOW/WITH/DESCRIBE/EXPLAIN statements
    #[arg(long, env = "READ_ONLY", default_value_t = false)]
    pub read_only: bool,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_base_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|e| format!("invalid URL '{}': {}", value, e))?;
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(format!("'{}' has no host", value));
    }
    Ok(url)
}

impl Config {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user);

        if let Some(password) = &self.db_password {
            options = options.password(password);
        }
        if let Some(database) = &self.db_name {
            options = options.database(database);
        }

        options
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
