#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use chrono::{Duration, Utc};
use gcs_demo::auth::{AuthError, Authorizer, CredentialRecord};
use gcs_demo::prompt::Prompter;

/// Answers prompts from a fixed script and records what was asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompter {
            answers: RefCell::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> usize {
        self.asked.borrow().len()
    }

    fn next(&self, prompt: &str) -> io::Result<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, format!("unexpected prompt: {prompt}")))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, prompt: &str) -> io::Result<String> {
        self.next(prompt)
    }

    fn input_with_default(&self, prompt: &str, default: &str) -> io::Result<String> {
        let answer = self.next(prompt)?;
        Ok(if answer.is_empty() { default.to_string() } else { answer })
    }

    fn select(&self, prompt: &str, _items: &[String]) -> io::Result<usize> {
        self.next(prompt)?
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }
}

pub fn fresh_record(access_token: &str) -> CredentialRecord {
    CredentialRecord {
        access_token: access_token.to_string(),
        refresh_token: Some("1//refresh".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
        scope: Some(gcs_demo::auth::SCOPE.to_string()),
        token_type: "Bearer".to_string(),
    }
}

pub fn expired_record(access_token: &str) -> CredentialRecord {
    CredentialRecord {
        expires_at: Some(Utc::now() - Duration::hours(1)),
        ..fresh_record(access_token)
    }
}

pub enum Outcome {
    Grant(CredentialRecord),
    Deny,
    Revoked,
    NetworkDown,
}

impl Outcome {
    fn result(&self) -> Result<CredentialRecord, AuthError> {
        match self {
            Outcome::Grant(record) => Ok(record.clone()),
            Outcome::Deny => Err(AuthError::Denied("access_denied".into())),
            Outcome::Revoked => Err(AuthError::Rejected {
                error: "invalid_grant".into(),
                description: "Token has been expired or revoked.".into(),
            }),
            Outcome::NetworkDown => Err(AuthError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}

/// Counts authorizations and refreshes and answers them as configured.
pub struct FakeAuthorizer {
    authorize: Outcome,
    refresh: Outcome,
    pub authorizations: Cell<usize>,
    pub refreshes: Cell<usize>,
}

impl FakeAuthorizer {
    pub fn granting(token: &str) -> Self {
        FakeAuthorizer {
            authorize: Outcome::Grant(fresh_record(token)),
            refresh: Outcome::Grant(fresh_record(&format!("{token}-refreshed"))),
            authorizations: Cell::new(0),
            refreshes: Cell::new(0),
        }
    }

    pub fn with_authorize(mut self, outcome: Outcome) -> Self {
        self.authorize = outcome;
        self
    }

    pub fn with_refresh(mut self, outcome: Outcome) -> Self {
        self.refresh = outcome;
        self
    }
}

impl Authorizer for FakeAuthorizer {
    fn authorize(&self) -> Result<CredentialRecord, AuthError> {
        self.authorizations.set(self.authorizations.get() + 1);
        self.authorize.result()
    }

    fn refresh(&self, _record: &CredentialRecord) -> Result<CredentialRecord, AuthError> {
        self.refreshes.set(self.refreshes.get() + 1);
        self.refresh.result()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl CannedResponse {
    pub fn xml(status: u16, body: &str) -> Self {
        CannedResponse { status, content_type: "application/xml", body: body.to_string() }
    }

    pub fn json(status: u16, body: &str) -> Self {
        CannedResponse { status, content_type: "application/json", body: body.to_string() }
    }
}

/// Serves `responses` in order, one connection each, on a loopback port.
/// Joining the handle returns the requests that were received.
pub fn serve(responses: Vec<CannedResponse>) -> (String, JoinHandle<Vec<RecordedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        responses
            .iter()
            .map(|response| {
                let (stream, _) = listener.accept().unwrap();
                respond(stream, response).unwrap()
            })
            .collect()
    });
    (base_url, handle)
}

fn respond(stream: TcpStream, response: &CannedResponse) -> io::Result<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((key, value)) = header.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    let length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body)?;

    let mut stream = reader.into_inner();
    write!(
        stream,
        "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.content_type,
        response.body.len(),
        response.body
    )?;
    stream.flush()?;
    Ok(RecordedRequest { method, target, headers, body })
}

pub fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder().no_proxy().build().unwrap()
}
