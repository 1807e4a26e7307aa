use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Identifier validation
    #[error("Invalid student id: {0}")]
    InvalidStudentId(String),

    #[error("Invalid pairing token: {0}")]
    InvalidPairingToken(String),

    // Remote document decoding
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
