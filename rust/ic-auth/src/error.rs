//! ic-auth: error types for C1-C5, C11.
//!
//! Shape grounded on `knhk-sidecar::error::SidecarError`: a flat enum of
//! `#[error("...: {0}")]` variants, a crate-local `Result` alias.

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// C1 failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("missing credential file: {0}")]
    MissingCredentialFile(String),
    #[error("failed to parse credential: {0}")]
    ParseFailure(String),
    #[error("unknown auth type for client {0}")]
    UnknownAuthType(String),
    #[error("client {0} is missing the credential field its auth_type requires")]
    MissingCredentialField(String),
    #[error("unknown client_id: {0}")]
    UnknownClient(String),
    #[error("duplicate client_id: {0}")]
    DuplicateClient(String),
    #[error("config persistence failed: {0}")]
    PersistFailed(#[from] ic_config::ConfigError),
}

pub type BearerResult<T> = Result<T, BearerError>;

/// C2 failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BearerError {
    #[error("malformed bearer token")]
    Malformed,
    #[error("unknown client_id in token")]
    UnknownClient,
    #[error("client is inactive")]
    InactiveClient,
    #[error("token algorithm does not match client credential type")]
    WrongAlgorithm,
    #[error("bearer signature mismatch")]
    SignatureMismatch,
    #[error("token expired or not yet valid")]
    Expired,
}

pub type SignatureResult<T> = Result<T, SignatureError>;

/// C3 failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed timestamp")]
    BadTimestamp,
    #[error("signature timestamp outside allowed window")]
    Expired,
    #[error("unknown client_id")]
    UnknownClient,
    #[error("client is inactive")]
    InactiveClient,
    #[error("nonce replay detected")]
    ReplayedNonce,
    #[error("malformed signature encoding")]
    BadSignatureEncoding,
    #[error("signature mismatch")]
    SignatureMismatch,
}

pub type AuthResult<T> = Result<T, AuthError>;

/// C5 aggregate failure surfaced to the HTTP layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no authentication credential presented")]
    MissingAuth,
    #[error("bearer authentication failed: {0}")]
    Bearer(#[from] BearerError),
    #[error("signature authentication failed: {0}")]
    Signature(#[from] SignatureError),
    #[error("insufficient permission for {0}")]
    InsufficientPermission(String),
}
