//! OAuth 2.0 for installed applications.
//!
//! [`CredentialStore`] is the entry point: it loads the persisted token set,
//! refreshes it when it has expired and falls back to the interactive
//! [`InstalledFlow`] when there is nothing usable on disk.

mod credentials;
mod error;
mod flow;
mod redirect;
mod secrets;
mod token;

pub use credentials::{AccessTokenSource, CredentialEvent, CredentialState, CredentialStore, CREDENTIALS_KEY};
pub use error::AuthError;
pub use flow::{consent_url, pkce_challenge, Authorizer, InstalledFlow, RedirectMode, OOB_REDIRECT_URI};
pub use redirect::{AuthorizationResponse, RedirectListener};
pub use secrets::ClientSecrets;
pub use token::{CredentialRecord, TokenResponse, EXPIRY_SKEW_SECS};

/// Full control over buckets and objects.
pub const SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";
