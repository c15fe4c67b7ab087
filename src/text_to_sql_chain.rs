use anyhow::Error;
use async_trait::async_trait;
use tracing::{error, info};

use crate::chain::Chain;
use crate::config::Config;
use crate::database::ConnectionManager;
use crate::error::ModelError;
use crate::executor::QueryExecutor;
use crate::extract::extract_sql;
use crate::model::{ModelClient, OllamaClient, SYSTEM_PROMPT};
use crate::writer::ResultWriter;

/// Question → model reply → extracted SQL → rows → CSV.
pub struct TextToSqlChain {
    client: Box<dyn ModelClient>,
    executor: QueryExecutor,
    writer: ResultWriter,
}

#[async_trait]
impl Chain for TextToSqlChain {
    async fn initialize(config: &Config) -> Result<Box<dyn Chain + Send>, Error>
    where
        Self: Sized,
    {
        let connection = ConnectionManager::connect(
            config.connect_options(),
            config.reconnect,
            config.read_only,
        )
        .await;

        let executor = QueryExecutor::new(Box::new(connection)).read_only(config.read_only);

        Ok(Box::new(TextToSqlChain::new(
            Box::new(OllamaClient::from_config(config)),
            executor,
            ResultWriter::new(&config.output_dir),
        )))
    }

    async fn run(&mut self, input: String) -> Result<String, Error> {
        match self.respond(&input).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(error = %e, "question could not be answered");
                Ok(format!("Error: {}", e))
            }
        }
    }

    async fn close(&mut self) {
        self.executor.close().await;
    }
}

impl TextToSqlChain {
    pub fn new(client: Box<dyn ModelClient>, executor: QueryExecutor, writer: ResultWriter) -> Self {
        TextToSqlChain {
            client,
            executor,
            writer,
        }
    }

    async fn respond(&mut self, question: &str) -> Result<String, ModelError> {
        let ai_response = self.client.ask(SYSTEM_PROMPT, question).await?;
        println!("AI Response: {}", ai_response);

        let sql_query = extract_sql(&ai_response);
        println!(
            "Extracted SQL Query: {}",
            sql_query.as_deref().unwrap_or("None")
        );

        let Some(sql_query) = sql_query else {
            return Ok(format!(
                "{}\n\nNo SQL query found in the response.",
                ai_response
            ));
        };

        info!(query = %sql_query, "running extracted query");
        let rows = self.executor.execute(&sql_query).await;
        let csv_file = self.writer.save(&rows, &sql_query);

        let pretty = serde_json::to_string_pretty(&rows).unwrap_or_else(|_| format!("{:?}", rows));
        let mut result_info = format!("\n\nQuery Results:\n{}", pretty);
        if let Some(path) = csv_file {
            result_info.push_str(&format!("\n\nResults saved to: {}", path.display()));
        }

        Ok(ai_response + &result_info)
    }
}
