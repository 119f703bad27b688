/// Errors surfaced by the message bus abstraction.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Broker connection or client construction failure.
    #[error("Bus: connection error: {0}")]
    Connection(String),

    /// A record could not be produced (broker-side error or timeout).
    #[error("Bus: produce error: {0}")]
    Produce(String),

    /// A record could not be fetched.
    #[error("Bus: consume error: {0}")]
    Consume(String),

    /// An offset commit was rejected.
    #[error("Bus: commit error: {0}")]
    Commit(String),
}

/// Convenience `Result` alias for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
