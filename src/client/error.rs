use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Session store error: {0}")]
    Store(String),
    #[error("{0}")]
    LoginFailed(String),
    #[error("Invalid server response")]
    InvalidServerResponse,
    #[error("Session expired, please log in again")]
    RefreshFailed,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}
