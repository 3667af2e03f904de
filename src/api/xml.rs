//! Documents exchanged with the XML API.

use serde::{Deserialize, Serialize};

use super::GcsError;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListAllMyBucketsResult {
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub buckets: Buckets,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Buckets {
    #[serde(rename = "Bucket", default)]
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub creation_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucketResult {
    pub name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(rename = "Contents", default)]
    pub contents: Vec<ObjectEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectEntry {
    pub key: String,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(rename = "ETag", default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationConstraint {
    #[serde(rename = "$text", default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "CreateBucketConfiguration")]
pub struct CreateBucketConfiguration {
    #[serde(rename = "LocationConstraint")]
    pub location_constraint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "CorsConfig")]
pub struct CorsConfig {
    #[serde(rename = "Cors")]
    pub cors: Vec<Cors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cors {
    pub origins: Origins,
    pub methods: Methods,
    pub response_headers: ResponseHeaders,
    pub max_age_sec: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origins {
    #[serde(rename = "Origin")]
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Methods {
    #[serde(rename = "Method")]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseHeaders {
    #[serde(rename = "ResponseHeader")]
    pub headers: Vec<String>,
}

/// Serializes `value` as a standalone document with an XML declaration.
pub fn to_document<T: Serialize>(value: &T) -> Result<String, GcsError> {
    let body = quick_xml::se::to_string(value)?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

pub fn from_document<'de, T: Deserialize<'de>>(xml: &'de str) -> Result<T, GcsError> {
    Ok(quick_xml::de::from_str(xml)?)
}
