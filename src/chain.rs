use anyhow::Error;
use async_trait::async_trait;

use crate::config::Config;

/// One natural-language question in, one printable answer out.
#[async_trait]
pub trait Chain {
    async fn initialize(config: &Config) -> Result<Box<dyn Chain + Send>, Error>
    where
        Self: Sized;

    async fn run(&mut self, input: String) -> Result<String, Error>;

    /// Releases whatever the chain holds open.
    async fn close(&mut self) {}
}
