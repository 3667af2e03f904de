use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "please configure OAuth 2.0 by populating the client secrets file found at: {}",
        path.display()
    )]
    MissingClientSecrets {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("client secrets file is malformed")]
    InvalidClientSecrets(#[source] serde_json::Error),
    #[error("client secrets file has neither an `installed` nor a `web` section")]
    UnsupportedClientType,
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("authorization response did not match the request state")]
    StateMismatch,
    #[error("authorization response carried no code")]
    MissingCode,
    #[error("token endpoint rejected the request: {error} {description}")]
    Rejected { error: String, description: String },
    #[error("stored credentials cannot be refreshed and need re-authorization")]
    NoRefreshToken,
    #[error("could not listen for the OAuth redirect on any of the ports {0:?}")]
    NoRedirectPort(Vec<u16>),
    #[error("token request failed")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to encode credentials")]
    Encode(#[source] serde_json::Error),
    #[error("failed to persist credentials")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// The refresh token was revoked or has expired; only a new
    /// authorization helps.
    pub fn is_revoked(&self) -> bool {
        matches!(self, AuthError::Rejected { error, .. } if error == "invalid_grant")
            || matches!(self, AuthError::NoRefreshToken)
    }
}
