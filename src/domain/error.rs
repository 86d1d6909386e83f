use thiserror::Error;

/// CtrlCom unified error type
#[derive(Error, Debug)]
pub enum CtrlComError {
    #[error("Invalid link configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to open link: {0}")]
    LinkOpenFailed(String),

    #[error("Link is not open")]
    LinkNotOpen,

    #[error("Malformed hex input: {0}")]
    MalformedHexInput(String),

    #[error("Write timed out")]
    WriteTimeout,

    #[error("Read timed out")]
    ReadTimeout,

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub type CtrlComResult<T> = Result<T, CtrlComError>;
