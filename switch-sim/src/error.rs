use crate::store::ValueKind;

/// Startup and serving failures. All of them are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("metric registration failed: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("listener error: {0}")]
    Listener(#[from] std::io::Error),
    #[error("value store rejected seed entry: {0}")]
    Store(#[from] StoreError),
}

/// Typed Value Store failures. Callers log these and keep the stale value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("type mismatch for {key}: established {established}, got {offered}")]
    TypeMismatch {
        key: String,
        established: ValueKind,
        offered: ValueKind,
    },
}
