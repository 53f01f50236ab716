//!
//! Errors specific to this custom redis interface
//!
#[derive(Debug, thiserror::Error)]
pub enum RedisError {
    #[error("Failed to establish Redis connection: {0}")]
    RedisConnectionError(String),
    #[error("Invalid Redis configuration: {0}")]
    InvalidConfiguration(String),
}
