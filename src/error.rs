use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AirctlError {
    #[error("{0} is not installed. Make sure it's available on PATH.")]
    ToolUnavailable(String),

    #[error("Error: missing parameter")]
    MissingParameter,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Subprocess error: {0}")]
    Subprocess(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, AirctlError>;
