use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("signing key is not configured")]
    MissingSigningKey,
    #[error("user record has no id")]
    MissingIdentity,
    #[error("invalid token ttl: {0}")]
    InvalidTtl(String),
    #[error("failed to sign token")]
    Signing,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("token verification failed")]
    VerificationFailed,
    #[error("missing or malformed authorization header")]
    MissingOrMalformed,
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => Self::Malformed,
            _ => Self::VerificationFailed,
        }
    }
}
