use std::io::{stdin, stdout};

use clap::Parser;
use db_query_assistant::repl::run_loop;
use db_query_assistant::{Chain, Config, TextToSqlChain};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // missing .env is fine, the environment may already be set
    dotenvy::dotenv().ok();

    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level())
        .init();

    let mut processor = TextToSqlChain::initialize(&config).await?;

    let result = run_loop(processor.as_mut(), stdin().lock(), &mut stdout()).await;
    processor.close().await;

    result
}
