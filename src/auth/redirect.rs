// One-shot HTTP listener that receives the browser redirect at the end of
// the consent screen. It only ever reads a request line, so std's
// blocking TcpListener is all it needs.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use super::AuthError;

/// Browsers open speculative connections that never send a request. They
/// are dropped after this long so the real redirect gets through.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<html><head><title>Authentication Status</title></head>\
<body><p>The authentication flow has completed. You may close this window.</p></body></html>";

/// Query parameters the authorization server appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl AuthorizationResponse {
    pub fn from_url(url: &Url) -> Self {
        let mut response = AuthorizationResponse::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => response.code = Some(value.into_owned()),
                "state" => response.state = Some(value.into_owned()),
                "error" => response.error = Some(value.into_owned()),
                _ => {}
            }
        }
        response
    }

    /// Parses an HTTP request line such as `GET /?code=abc&state=xyz HTTP/1.1`.
    pub fn from_request_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let _method = parts.next()?;
        let target = parts.next()?;
        let url = Url::parse("http://localhost").ok()?.join(target).ok()?;
        Some(Self::from_url(&url))
    }

    fn is_complete(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }

    /// Checks the response against the state sent with the consent request
    /// and returns the authorization code.
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::Denied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::StateMismatch);
        }
        self.code.ok_or(AuthError::MissingCode)
    }
}

pub struct RedirectListener {
    listener: TcpListener,
    host: String,
    port: u16,
}

impl RedirectListener {
    /// Binds the first free port out of `ports`.
    pub fn bind(host: &str, ports: &[u16]) -> Result<Self, AuthError> {
        for &port in ports {
            match TcpListener::bind((host, port)) {
                Ok(listener) => {
                    let port = listener.local_addr()?.port();
                    debug!(host, port, "listening for OAuth redirect");
                    return Ok(RedirectListener {
                        listener,
                        host: host.to_string(),
                        port,
                    });
                }
                Err(e) => debug!(host, port, error = %e, "port unavailable"),
            }
        }
        Err(AuthError::NoRedirectPort(ports.to_vec()))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// Blocks until a request carrying a code or an error arrives. Other
    /// requests (the browser asking for a favicon, say) get the same page
    /// and are otherwise ignored.
    pub fn accept(&self) -> Result<AuthorizationResponse, AuthError> {
        loop {
            let (stream, peer) = self.listener.accept()?;
            debug!(%peer, "redirect connection");
            match handle_connection(stream) {
                Ok(Some(response)) if response.is_complete() => return Ok(response),
                Ok(_) => continue,
                Err(e) => warn!(error = %e, "failed to read redirect request"),
            }
        }
    }
}

fn handle_connection(stream: TcpStream) -> std::io::Result<Option<AuthorizationResponse>> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    // Drain the headers so the browser sees a well-behaved server.
    let mut header = String::new();
    while reader.read_line(&mut header)? > 2 {
        header.clear();
    }
    let mut stream = reader.into_inner();
    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        SUCCESS_PAGE.len(),
        SUCCESS_PAGE
    )?;
    stream.flush()?;
    Ok(AuthorizationResponse::from_request_line(&request_line))
}
