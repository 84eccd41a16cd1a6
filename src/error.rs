use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("no routes configured")]
    NoRoutes,
    #[error("unknown route: {0}")]
    UnknownRoute(String),
    #[error("prediction cache lock poisoned")]
    CacheLock,
}
