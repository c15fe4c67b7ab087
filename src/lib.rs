pub mod chain;
pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod extract;
pub mod model;
pub mod repl;
pub mod text_to_sql_chain;
pub mod writer;

pub use chain::Chain;
pub use config::Config;
pub use text_to_sql_chain::TextToSqlChain;
