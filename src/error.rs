use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not connected to the database")]
    NotConnected,

    #[error("refused to run non read-only statement in read-only mode")]
    ReadOnly,
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{0}")]
    Ollama(#[from] ollama_rs::error::OllamaError),

    #[cfg(test)]
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),
}
