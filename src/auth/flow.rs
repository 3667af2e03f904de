// The installed-application OAuth flow: consent URL, redirect (local
// server or pasted code), then the token exchange. Refreshing a record
// goes through the same token endpoint.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::blocking::{Client, Response};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use super::redirect::RedirectListener;
use super::token::TokenErrorResponse;
use super::{AuthError, ClientSecrets, CredentialRecord, TokenResponse};
use crate::prompt::Prompter;

/// Redirect target for the copy-and-paste variant of the flow.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Obtains and refreshes credentials. The credential store only talks to
/// this trait, which lets tests count and script authorizations.
pub trait Authorizer {
    /// Runs the interactive authorization and returns a fresh record.
    fn authorize(&self) -> Result<CredentialRecord, AuthError>;

    /// Exchanges the record's refresh token for a new access token.
    fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, AuthError>;
}

/// How the authorization code gets back to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectMode {
    /// Listen on the first free port and let the browser redirect to it.
    LocalServer { host: String, ports: Vec<u16> },
    /// Have the user paste the code shown by the consent page.
    Console,
}

pub struct InstalledFlow<P> {
    client: Client,
    secrets: ClientSecrets,
    scope: String,
    mode: RedirectMode,
    prompter: P,
    show_consent_url: Box<dyn Fn(&Url)>,
}

fn print_consent_url(url: &Url) {
    println!("Go to the following link in your browser:\n\n    {url}\n");
}

impl<P: Prompter> InstalledFlow<P> {
    pub fn new(
        client: Client,
        secrets: ClientSecrets,
        scope: impl Into<String>,
        mode: RedirectMode,
        prompter: P,
    ) -> Self {
        InstalledFlow {
            client,
            secrets,
            scope: scope.into(),
            mode,
            prompter,
            show_consent_url: Box::new(print_consent_url),
        }
    }

    /// Replaces printing of the consent URL, for instance to hand it to a
    /// scripted browser. The redirect listener is already bound when this
    /// is called.
    pub fn with_consent_handler(mut self, handler: impl Fn(&Url) + 'static) -> Self {
        self.show_consent_url = Box::new(handler);
        self
    }

    /// Trades an authorization code for a token set.
    pub fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<CredentialRecord, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
        ];
        debug!(token_uri = %self.secrets.token_uri, "exchanging authorization code");
        let res = self.client.post(&self.secrets.token_uri).form(&params).send()?;
        token_record(res, None)
    }
}

impl<P: Prompter> Authorizer for InstalledFlow<P> {
    fn authorize(&self) -> Result<CredentialRecord, AuthError> {
        let verifier = random_string(64);
        let state = random_string(32);
        let challenge = pkce_challenge(&verifier);

        let (code, redirect_uri) = match &self.mode {
            RedirectMode::LocalServer { host, ports } => {
                let listener = RedirectListener::bind(host, ports)?;
                let redirect_uri = listener.redirect_uri();
                let url = consent_url(&self.secrets, &self.scope, &redirect_uri, &state, &challenge)?;
                (self.show_consent_url)(&url);
                println!("Waiting for the authorization to complete on {redirect_uri}");
                let code = listener.accept()?.into_code(&state)?;
                (code, redirect_uri)
            }
            RedirectMode::Console => {
                let url = consent_url(&self.secrets, &self.scope, OOB_REDIRECT_URI, &state, &challenge)?;
                (self.show_consent_url)(&url);
                let code = self.prompter.input("Enter verification code")?;
                (code.trim().to_string(), OOB_REDIRECT_URI.to_string())
            }
        };

        let record = self.exchange_code(&code, &verifier, &redirect_uri)?;
        info!("authentication successful");
        Ok(record)
    }

    fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, AuthError> {
        let refresh_token = record
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NoRefreshToken)?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
        ];
        debug!("refreshing access token");
        let res = self.client.post(&self.secrets.token_uri).form(&params).send()?;
        token_record(res, record.refresh_token.clone())
    }
}

/// Builds the consent-screen URL for `scope`.
pub fn consent_url(
    secrets: &ClientSecrets,
    scope: &str,
    redirect_uri: &str,
    state: &str,
    code_challenge: &str,
) -> Result<Url, AuthError> {
    let mut url = Url::parse(&secrets.auth_uri)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &secrets.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", scope)
        .append_pair("access_type", "offline")
        .append_pair("state", state)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256");
    Ok(url)
}

/// S256 code challenge for a PKCE verifier (RFC 7636 section 4.2).
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn token_record(
    res: Response,
    previous_refresh_token: Option<String>,
) -> Result<CredentialRecord, AuthError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().unwrap_or_default();
        return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => AuthError::Rejected {
                error: err.error,
                description: err.error_description.unwrap_or_default(),
            },
            Err(_) => AuthError::Rejected {
                error: status.to_string(),
                description: body,
            },
        });
    }
    let token: TokenResponse = res.json()?;
    Ok(CredentialRecord::from_response(token, Utc::now(), previous_refresh_token))
}
