//! Server error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Transport(#[from] oscwire_transport::TransportError),

    #[error("codec error: {0}")]
    Core(#[from] oscwire_core::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
