// Cloud Storage XML API client: a small blocking HTTP client that signs
// every request with the current OAuth access token and the project id.
// Requests use path-style URLs (`<endpoint>/<bucket>/<object>`), which the
// XML API accepts for every bucket name.

use std::fs;
use std::path::Path;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::auth::AccessTokenSource;

mod content_type;
mod error;
mod naming;
pub mod xml;

pub use content_type::guess as guess_content_type;
pub use error::GcsError;
pub use naming::validate_bucket_name;
use xml::{
    CorsConfig, CreateBucketConfiguration, ErrorResponse, ListAllMyBucketsResult,
    ListBucketResult, LocationConstraint,
};

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "2";

pub const DEFAULT_ORIGIN: &str = "*";
pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_RESPONSE_HEADER: &str = "gcs-demo";
pub const DEFAULT_MAX_AGE_SEC: u32 = 1800;

const X_GOOG_PROJECT_ID: HeaderName = HeaderName::from_static("x-goog-project-id");
const X_GOOG_API_VERSION: HeaderName = HeaderName::from_static("x-goog-api-version");
const X_GOOG_ACL: HeaderName = HeaderName::from_static("x-goog-acl");
const X_GOOG_COPY_SOURCE: HeaderName = HeaderName::from_static("x-goog-copy-source");

/// Client for the XML API. Holds the HTTP client, the endpoint, the
/// project every request is attributed to and the source of access tokens.
pub struct GcsClient {
    client: Client,
    endpoint: Url,
    project_id: String,
    api_version: String,
    tokens: Box<dyn AccessTokenSource>,
}

/// One CORS rule. Blank entries fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsRule {
    pub origins: Vec<String>,
    pub methods: Vec<String>,
    pub response_headers: Vec<String>,
    pub max_age_sec: u32,
}

impl Default for CorsRule {
    fn default() -> Self {
        CorsRule {
            origins: vec![DEFAULT_ORIGIN.to_string()],
            methods: vec![DEFAULT_METHOD.to_string()],
            response_headers: vec![DEFAULT_RESPONSE_HEADER.to_string()],
            max_age_sec: DEFAULT_MAX_AGE_SEC,
        }
    }
}

impl CorsRule {
    fn to_config(&self) -> CorsConfig {
        fn fill(values: &[String], default: &str) -> Vec<String> {
            let filled: Vec<String> = values
                .iter()
                .map(|v| match v.trim() {
                    "" => default.to_string(),
                    v => v.to_string(),
                })
                .collect();
            if filled.is_empty() {
                vec![default.to_string()]
            } else {
                filled
            }
        }
        CorsConfig {
            cors: vec![xml::Cors {
                origins: xml::Origins {
                    origins: fill(&self.origins, DEFAULT_ORIGIN),
                },
                methods: xml::Methods {
                    methods: fill(&self.methods, DEFAULT_METHOD),
                },
                response_headers: xml::ResponseHeaders {
                    headers: fill(&self.response_headers, DEFAULT_RESPONSE_HEADER),
                },
                max_age_sec: self.max_age_sec,
            }],
        }
    }
}

/// Everything needed to upload a local file.
#[derive(Debug, Clone)]
pub struct ObjectUpload<'a> {
    pub bucket: &'a str,
    pub file_path: &'a Path,
    /// Defaults to the file name.
    pub object_name: Option<&'a str>,
    /// Guessed from the file name when absent.
    pub content_type: Option<&'a str>,
    /// Guessed from the file name when absent.
    pub content_encoding: Option<&'a str>,
    /// Predefined ACL such as `private` or `public-read`.
    pub acl: Option<&'a str>,
}

impl GcsClient {
    pub fn new(
        client: Client,
        project_id: impl Into<String>,
        tokens: Box<dyn AccessTokenSource>,
    ) -> Result<Self, GcsError> {
        Self::with_endpoint(client, DEFAULT_ENDPOINT, project_id, tokens)
    }

    /// Like `new`, but against another endpoint such as a local emulator.
    pub fn with_endpoint(
        client: Client,
        endpoint: &str,
        project_id: impl Into<String>,
        tokens: Box<dyn AccessTokenSource>,
    ) -> Result<Self, GcsError> {
        Ok(GcsClient {
            client,
            endpoint: Url::parse(endpoint)?,
            project_id: project_id.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            tokens,
        })
    }

    /// Lists the buckets of the project.
    pub fn list_buckets(&mut self) -> Result<Vec<xml::Bucket>, GcsError> {
        let url = self.endpoint.clone();
        let body = self.send(Method::GET, url, HeaderMap::new(), None)?.text()?;
        let result: ListAllMyBucketsResult = xml::from_document(&body)?;
        Ok(result.buckets.buckets)
    }

    /// Lists the objects of a bucket. Only the first page is returned.
    pub fn list_objects(&mut self, bucket: &str) -> Result<ListBucketResult, GcsError> {
        let url = self.url(bucket, None)?;
        let body = self.send(Method::GET, url, HeaderMap::new(), None)?.text()?;
        xml::from_document(&body)
    }

    /// Returns the bucket's CORS document as sent by the server.
    pub fn get_bucket_cors(&mut self, bucket: &str) -> Result<String, GcsError> {
        let mut url = self.url(bucket, None)?;
        url.set_query(Some("cors"));
        Ok(self.send(Method::GET, url, HeaderMap::new(), None)?.text()?)
    }

    pub fn get_bucket_location(&mut self, bucket: &str) -> Result<String, GcsError> {
        let mut url = self.url(bucket, None)?;
        url.set_query(Some("location"));
        let body = self.send(Method::GET, url, HeaderMap::new(), None)?.text()?;
        let location: LocationConstraint = xml::from_document(&body)?;
        Ok(location.location)
    }

    /// Creates a bucket. Only `EU` and `US` are sent as location
    /// constraints; anything else leaves the choice to the server.
    pub fn insert_bucket(
        &mut self,
        bucket: &str,
        acl: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), GcsError> {
        validate_bucket_name(bucket)?;
        let body = match location {
            Some(location @ ("EU" | "US")) => Some(
                xml::to_document(&CreateBucketConfiguration {
                    location_constraint: location.to_string(),
                })?
                .into_bytes(),
            ),
            _ => None,
        };
        let mut headers = HeaderMap::new();
        if let Some(acl) = acl {
            headers.insert(X_GOOG_ACL, HeaderValue::from_str(acl)?);
        }
        let url = self.url(bucket, None)?;
        self.send(Method::PUT, url, headers, body)?;
        Ok(())
    }

    pub fn set_bucket_cors(&mut self, bucket: &str, rule: &CorsRule) -> Result<(), GcsError> {
        let body = xml::to_document(&rule.to_config())?;
        let mut url = self.url(bucket, None)?;
        url.set_query(Some("cors"));
        self.send(Method::PUT, url, HeaderMap::new(), Some(body.into_bytes()))?;
        Ok(())
    }

    pub fn delete_bucket(&mut self, bucket: &str) -> Result<(), GcsError> {
        let url = self.url(bucket, None)?;
        self.send(Method::DELETE, url, HeaderMap::new(), None)?;
        Ok(())
    }

    /// Downloads an object's content.
    pub fn get_object(&mut self, bucket: &str, object: &str) -> Result<Vec<u8>, GcsError> {
        let url = self.url(bucket, Some(object))?;
        Ok(self.send(Method::GET, url, HeaderMap::new(), None)?.bytes()?.to_vec())
    }

    /// Returns the object's ACL document as sent by the server.
    pub fn get_object_acls(&mut self, bucket: &str, object: &str) -> Result<String, GcsError> {
        let mut url = self.url(bucket, Some(object))?;
        url.set_query(Some("acl"));
        Ok(self.send(Method::GET, url, HeaderMap::new(), None)?.text()?)
    }

    /// Returns the response headers of a HEAD request on the object.
    pub fn get_object_metadata(&mut self, bucket: &str, object: &str) -> Result<HeaderMap, GcsError> {
        let url = self.url(bucket, Some(object))?;
        let res = self.send(Method::HEAD, url, HeaderMap::new(), None)?;
        Ok(res.headers().clone())
    }

    /// Uploads a local file in a single request and returns the object name.
    pub fn insert_object(&mut self, upload: &ObjectUpload<'_>) -> Result<String, GcsError> {
        let contents = fs::read(upload.file_path)?;
        let object_name = match upload.object_name {
            Some(name) => name.to_string(),
            None => upload
                .file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let (guessed_type, guessed_encoding) = guess_content_type(upload.file_path);
        let content_type = upload
            .content_type
            .map(str::to_string)
            .or_else(|| guessed_type.map(|m| m.to_string()));
        let content_encoding = upload.content_encoding.or(guessed_encoding);

        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(&content_type)?);
        }
        if let Some(encoding) = content_encoding {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_str(encoding)?);
        }
        if let Some(acl) = upload.acl {
            headers.insert(X_GOOG_ACL, HeaderValue::from_str(acl)?);
        }
        let url = self.url(upload.bucket, Some(&object_name))?;
        self.send(Method::PUT, url, headers, Some(contents))?;
        Ok(object_name)
    }

    /// Copies an object server-side and returns the new object name, which
    /// defaults to the original one.
    pub fn copy_object(
        &mut self,
        source_bucket: &str,
        source_object: &str,
        target_bucket: &str,
        target_object: Option<&str>,
        acl: Option<&str>,
    ) -> Result<String, GcsError> {
        let target_object = target_object.unwrap_or(source_object).to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            X_GOOG_COPY_SOURCE,
            HeaderValue::from_str(&format!("/{source_bucket}/{source_object}"))?,
        );
        if let Some(acl) = acl {
            headers.insert(X_GOOG_ACL, HeaderValue::from_str(acl)?);
        }
        let url = self.url(target_bucket, Some(&target_object))?;
        self.send(Method::PUT, url, headers, None)?;
        Ok(target_object)
    }

    pub fn delete_object(&mut self, bucket: &str, object: &str) -> Result<(), GcsError> {
        let url = self.url(bucket, Some(object))?;
        self.send(Method::DELETE, url, HeaderMap::new(), None)?;
        Ok(())
    }

    /// `<endpoint>/<bucket>[/<object>]`. Slashes in object names stay path
    /// separators; everything else is percent-encoded.
    fn url(&self, bucket: &str, object: Option<&str>) -> Result<Url, GcsError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().push(bucket);
            if let Some(object) = object {
                segments.extend(object.split('/'));
            }
        }
        Ok(url)
    }

    /// Sends an authorized request and turns any status of 300 or above
    /// into a `GcsError::Status`.
    fn send(
        &mut self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<Response, GcsError> {
        let token = self.tokens.access_token()?;
        debug!(%method, %url, "request");
        let needs_length = method == Method::PUT || method == Method::POST;
        let mut req = self
            .client
            .request(method, url.clone())
            .bearer_auth(token)
            .header(X_GOOG_PROJECT_ID, HeaderValue::from_str(&self.project_id)?)
            .header(X_GOOG_API_VERSION, HeaderValue::from_str(&self.api_version)?)
            .headers(headers);
        req = match body {
            Some(body) => req.body(body),
            None if needs_length => req.header(CONTENT_LENGTH, 0u64),
            None => req,
        };
        let res = req.send().map_err(|e| {
            if e.is_connect() {
                GcsError::ServerNotFound(url.host_str().unwrap_or_default().to_string())
            } else {
                GcsError::Http(e)
            }
        })?;
        let status = res.status();
        debug!(%status, %url, "response");
        if status.as_u16() >= 300 {
            return Err(status_error(res));
        }
        Ok(res)
    }
}

fn status_error(res: Response) -> GcsError {
    let status = res.status();
    let reason = status.canonical_reason().unwrap_or("").to_string();
    let body = res.text().unwrap_or_default();
    match xml::from_document::<ErrorResponse>(&body) {
        Ok(error) => GcsError::Status {
            status,
            message: error.message.unwrap_or_else(|| error.code.clone()),
            code: Some(error.code),
        },
        Err(_) => GcsError::Status {
            status,
            code: None,
            message: reason,
        },
    }
}
