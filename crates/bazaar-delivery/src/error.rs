//! Delivery-specific error types.

use bazaar_common::BazaarError;
use thiserror::Error;

/// Failures of the signature adapter.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Unknown wallet '{0}'")]
    UnknownWallet(String),

    #[error("Wallet '{wallet}' holds no key for address '{address}'")]
    UnknownAddress { wallet: String, address: String },

    #[error("Wallet '{0}' is locked")]
    WalletLocked(String),

    #[error("Failed to load signing key: {0}")]
    KeyLoad(String),
}

/// Failures of the store-and-forward transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error talking to the relay: {0}")]
    Http(String),

    #[error("Relay refused the message with status {status}: {body}")]
    Refused { status: u16, body: String },

    #[error("Relay returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.to_string())
    }
}

/// Failures of the business-object directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP error talking to the directory: {0}")]
    Http(String),

    #[error("Directory returned unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid directory URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(e: reqwest::Error) -> Self {
        DirectoryError::Http(e.to_string())
    }
}

/// Why an inbound item was not accepted.
///
/// Rejections are expected network noise: they are logged at `warn` and never
/// handed back to the transport.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("invalid item: {0}")]
    ValidationRejected(String),

    #[error("transport id {0} already stored")]
    DuplicateRejected(String),

    #[error("signature does not verify for sender {0}")]
    SignatureInvalid(String),

    #[error("hash mismatch: claimed {claimed}, computed {computed}")]
    HashMismatch { claimed: String, computed: String },

    #[error("could not persist: {0}")]
    PersistenceFailure(String),
}

impl Rejection {
    /// Only persistence failures can succeed on a later attempt; every other
    /// rejection is a property of the item itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Rejection::PersistenceFailure(_))
    }
}

impl From<sqlx::Error> for Rejection {
    fn from(e: sqlx::Error) -> Self {
        Rejection::PersistenceFailure(e.to_string())
    }
}

impl From<SigningError> for BazaarError {
    fn from(e: SigningError) -> Self {
        BazaarError::Signing { message: e.to_string() }
    }
}

impl From<TransportError> for BazaarError {
    fn from(e: TransportError) -> Self {
        BazaarError::Transmit { message: e.to_string() }
    }
}
