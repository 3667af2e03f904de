mod common;

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::rc::Rc;
use std::thread;

use common::{expired_record, http_client, serve, CannedResponse, ScriptedPrompter};
use gcs_demo::auth::{
    pkce_challenge, AuthError, Authorizer, ClientSecrets, InstalledFlow, RedirectMode, SCOPE,
};
use url::Url;

fn secrets(token_uri: &str) -> ClientSecrets {
    let json = format!(
        r#"{{"installed": {{
            "client_id": "demo-client.apps.googleusercontent.com",
            "client_secret": "s3cret",
            "token_uri": "{token_uri}/token",
            "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
        }}}}"#
    );
    ClientSecrets::from_json(json.as_bytes()).unwrap()
}

fn flow(base_url: &str) -> InstalledFlow<ScriptedPrompter> {
    InstalledFlow::new(
        http_client(),
        secrets(base_url),
        SCOPE,
        RedirectMode::Console,
        ScriptedPrompter::default(),
    )
}

fn form(body: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

#[test]
fn authorization_code_is_exchanged_for_tokens() {
    let (base_url, server) = serve(vec![CannedResponse::json(
        200,
        r#"{"access_token":"ya29.a0","refresh_token":"1//rt","expires_in":3599,
            "scope":"https://www.googleapis.com/auth/devstorage.full_control","token_type":"Bearer"}"#,
    )]);

    let record = flow(&base_url)
        .exchange_code("4/code", "verifier", "http://localhost:8080/")
        .unwrap();
    assert_eq!(record.access_token, "ya29.a0");
    assert_eq!(record.refresh_token.as_deref(), Some("1//rt"));
    assert!(!record.is_expired());

    let requests = server.join().unwrap();
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.target, "/token");
    let form = form(&request.body_text());
    assert_eq!(field(&form, "grant_type"), Some("authorization_code"));
    assert_eq!(field(&form, "code"), Some("4/code"));
    assert_eq!(field(&form, "code_verifier"), Some("verifier"));
    assert_eq!(field(&form, "redirect_uri"), Some("http://localhost:8080/"));
    assert_eq!(field(&form, "client_secret"), Some("s3cret"));
}

#[test]
fn refresh_keeps_the_refresh_token() {
    let (base_url, server) = serve(vec![CannedResponse::json(
        200,
        r#"{"access_token":"ya29.new","expires_in":3599,"token_type":"Bearer"}"#,
    )]);

    let old = expired_record("ya29.old");
    let record = flow(&base_url).refresh(&old).unwrap();
    assert_eq!(record.access_token, "ya29.new");
    assert_eq!(record.refresh_token, old.refresh_token);

    let requests = server.join().unwrap();
    let form = form(&requests[0].body_text());
    assert_eq!(field(&form, "grant_type"), Some("refresh_token"));
    assert_eq!(field(&form, "refresh_token"), old.refresh_token.as_deref());
}

#[test]
fn revoked_refresh_token_is_recognised() {
    let (base_url, server) = serve(vec![CannedResponse::json(
        400,
        r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
    )]);

    let err = flow(&base_url).refresh(&expired_record("ya29.old")).unwrap_err();
    assert!(err.is_revoked(), "{err:?}");
    assert!(matches!(err, AuthError::Rejected { ref error, .. } if error == "invalid_grant"));
    server.join().unwrap();
}

#[test]
fn record_without_refresh_token_cannot_refresh() {
    let mut old = expired_record("ya29.old");
    old.refresh_token = None;

    // Nothing is listening; the flow must not get as far as the network.
    let err = flow("http://127.0.0.1:9").refresh(&old).unwrap_err();
    assert!(matches!(err, AuthError::NoRefreshToken));
    assert!(err.is_revoked());
}

#[test]
fn console_flow_exchanges_the_pasted_code() {
    let (base_url, server) = serve(vec![CannedResponse::json(
        200,
        r#"{"access_token":"ya29.console","refresh_token":"1//rt","expires_in":3599}"#,
    )]);
    let flow = InstalledFlow::new(
        http_client(),
        secrets(&base_url),
        SCOPE,
        RedirectMode::Console,
        ScriptedPrompter::new(&["  4/pasted-code \n"]),
    );

    let record = flow.authorize().unwrap();
    assert_eq!(record.access_token, "ya29.console");

    let requests = server.join().unwrap();
    let form = form(&requests[0].body_text());
    assert_eq!(field(&form, "code"), Some("4/pasted-code"));
    assert_eq!(field(&form, "redirect_uri"), Some("urn:ietf:wg:oauth:2.0:oob"));
    assert_eq!(field(&form, "code_verifier").map(str::len), Some(64));
}

#[test]
fn oversized_token_lifetime_does_not_expire() {
    let (base_url, server) = serve(vec![CannedResponse::json(
        200,
        r#"{"access_token":"ya29.forever","expires_in":9223372036854775807}"#,
    )]);

    let record = flow(&base_url)
        .exchange_code("4/code", "verifier", "http://localhost:8080/")
        .unwrap();
    assert_eq!(record.access_token, "ya29.forever");
    assert_eq!(record.expires_at, None);
    assert!(!record.is_expired());
    server.join().unwrap();
}

fn loopback_flow(token_base_url: &str) -> InstalledFlow<ScriptedPrompter> {
    InstalledFlow::new(
        http_client(),
        secrets(token_base_url),
        SCOPE,
        RedirectMode::LocalServer { host: "127.0.0.1".into(), ports: vec![0] },
        ScriptedPrompter::default(),
    )
}

/// Plays the browser: follows the consent URL's redirect target with
/// `code` and the given `state` (or the one from the URL).
fn redirect_browser(url: &Url, code: &str, state: Option<&str>) {
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let redirect = Url::parse(&params["redirect_uri"]).unwrap();
    let state = state.unwrap_or(&params["state"]);
    let target = format!("/?code={code}&state={state}");
    let addr = (redirect.host_str().unwrap().to_string(), redirect.port().unwrap());
    thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
        let mut page = String::new();
        stream.read_to_string(&mut page).unwrap();
    });
}

#[test]
fn loopback_flow_completes_the_handshake() {
    let (base_url, server) = serve(vec![CannedResponse::json(
        200,
        r#"{"access_token":"ya29.loopback","refresh_token":"1//rt","expires_in":3599}"#,
    )]);
    let consent = Rc::new(RefCell::new(None::<Url>));
    let seen = Rc::clone(&consent);
    let flow = loopback_flow(&base_url).with_consent_handler(move |url| {
        *seen.borrow_mut() = Some(url.clone());
        redirect_browser(url, "4%2Floopback", None);
    });

    let record = flow.authorize().unwrap();
    assert_eq!(record.access_token, "ya29.loopback");
    assert_eq!(record.refresh_token.as_deref(), Some("1//rt"));

    let url = consent.borrow().clone().unwrap();
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["scope"], SCOPE);
    assert_eq!(params["access_type"], "offline");
    assert_eq!(params["code_challenge_method"], "S256");
    assert!(params["redirect_uri"].starts_with("http://127.0.0.1:"));

    let requests = server.join().unwrap();
    let form = form(&requests[0].body_text());
    assert_eq!(field(&form, "code"), Some("4/loopback"));
    assert_eq!(field(&form, "redirect_uri"), Some(params["redirect_uri"].as_str()));
    let verifier = field(&form, "code_verifier").unwrap();
    assert_eq!(pkce_challenge(verifier), params["code_challenge"]);
}

#[test]
fn loopback_flow_rejects_a_forged_state() {
    // Nothing listens on the token endpoint; the flow must stop before it.
    let flow = loopback_flow("http://127.0.0.1:9")
        .with_consent_handler(|url| redirect_browser(url, "abc", Some("forged")));

    let err = flow.authorize().unwrap_err();
    assert!(matches!(err, AuthError::StateMismatch), "{err:?}");
}
