use std::io;

use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum GcsError {
    /// The API answered with a status of 300 or above.
    #[error("{status}: {message}")]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("server not found: {0}")]
    ServerNotFound(String),
    #[error("{0}")]
    InvalidBucketName(&'static str),
    #[error("request failed")]
    Http(#[from] reqwest::Error),
    #[error("could not obtain an access token")]
    Auth(#[from] AuthError),
    #[error("unexpected response document")]
    Xml(#[from] quick_xml::DeError),
    #[error("failed to build the request document")]
    XmlWrite(#[from] quick_xml::SeError),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl GcsError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GcsError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
