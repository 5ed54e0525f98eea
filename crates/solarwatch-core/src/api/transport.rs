//! HTTP transport for the single GraphQL endpoint.
//!
//! Operations without attachments go out as a JSON body. Operations with
//! attachments use the GraphQL multipart request layout: an `operations`
//! field with `null` placeholders, a `map` field pointing each file part at
//! its variable path, then one binary part per file.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::TransportError;
use super::operation::{Operation, Upload};
use super::response::Response;

/// Header the backend requires before it accepts a multipart body
pub const PREFLIGHT_HEADER: &str = "apollo-require-preflight";

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Sends a prepared operation and returns the delivered response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, operation: &Operation, headers: &HeaderMap) -> Result<Response, TransportError>;
}

/// Wire shape of an encoded operation.
#[derive(Debug)]
pub enum EncodedBody<'a> {
    Json(Value),
    Multipart {
        operations: String,
        map: String,
        files: Vec<(String, &'a Upload)>,
    },
}

impl<'a> EncodedBody<'a> {
    pub fn encode(operation: &'a Operation) -> Result<Self, TransportError> {
        if !operation.has_attachments() {
            return Ok(EncodedBody::Json(operation.body()));
        }

        let operations = serde_json::to_string(&operation.body())
            .map_err(|e| TransportError::Encode(e.to_string()))?;

        let mut map = Map::new();
        let mut files = Vec::with_capacity(operation.attachments.len());
        for (index, attachment) in operation.attachments.iter().enumerate() {
            let key = index.to_string();
            map.insert(
                key.clone(),
                Value::Array(vec![Value::String(format!("variables.{}", attachment.path))]),
            );
            files.push((key, &attachment.upload));
        }
        let map = serde_json::to_string(&map).map_err(|e| TransportError::Encode(e.to_string()))?;

        Ok(EncodedBody::Multipart {
            operations,
            map,
            files,
        })
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, EncodedBody::Multipart { .. })
    }
}

/// Transport backed by a shared reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn multipart_form(
        operations: String,
        map: String,
        files: Vec<(String, &Upload)>,
    ) -> Result<Form, TransportError> {
        let mut form = Form::new().text("operations", operations).text("map", map);
        for (key, upload) in files {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.mime_type())
                .map_err(|e| TransportError::Encode(e.to_string()))?;
            form = form.part(key, part);
        }
        Ok(form)
    }

    /// Turn an HTTP response into a GraphQL response.
    ///
    /// Error statuses whose body is still a GraphQL error document are
    /// returned as responses so their error codes can be inspected.
    async fn read_response(response: reqwest::Response) -> Result<Response, TransportError> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<Response>(&body) {
            Ok(parsed) if status.is_success() || parsed.has_errors() => Ok(parsed),
            Err(e) if status.is_success() => Err(TransportError::InvalidResponse(format!(
                "{}: {}",
                e,
                TransportError::truncate_body(&body)
            ))),
            _ => Err(TransportError::from_status(status, &body)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, operation: &Operation, headers: &HeaderMap) -> Result<Response, TransportError> {
        let request = self.client.post(&self.endpoint).headers(headers.clone());

        let request = match EncodedBody::encode(operation)? {
            EncodedBody::Json(body) => request.json(&body),
            EncodedBody::Multipart {
                operations,
                map,
                files,
            } => {
                debug!(
                    operation = %operation.name,
                    attachments = files.len(),
                    "Sending multipart operation"
                );
                request
                    .header(
                        HeaderName::from_static(PREFLIGHT_HEADER),
                        HeaderValue::from_static("true"),
                    )
                    .multipart(Self::multipart_form(operations, map, files)?)
            }
        };

        let response = request.send().await?;
        Self::read_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_operation_encodes_as_json() {
        let op = Operation::new("GetFacilityById", "query GetFacilityById($id: String!) { x }")
            .variable("id", "f1");
        match EncodedBody::encode(&op).unwrap() {
            EncodedBody::Json(body) => {
                assert_eq!(body["operationName"], "GetFacilityById");
                assert_eq!(body["variables"], json!({ "id": "f1" }));
            }
            other => panic!("expected JSON body, got {:?}", other),
        }
    }

    #[test]
    fn test_attachment_encodes_as_multipart() {
        let op = Operation::new("CreateFacility", "mutation { x }")
            .variable("input", json!({ "name": "Roof" }))
            .attach("input.file", Upload::new("solar.csv", b"t,kw\n".to_vec()));

        let encoded = EncodedBody::encode(&op).unwrap();
        assert!(encoded.is_multipart());
        let EncodedBody::Multipart { operations, map, files } = encoded else {
            unreachable!()
        };

        let operations: Value = serde_json::from_str(&operations).unwrap();
        assert_eq!(operations["variables"]["input"]["file"], Value::Null);
        assert_eq!(
            serde_json::from_str::<Value>(&map).unwrap(),
            json!({ "0": ["variables.input.file"] })
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "0");
        assert_eq!(files[0].1.file_name, "solar.csv");
    }

    #[test]
    fn test_multipart_form_builds() {
        let upload = Upload::new("solar.csv", b"t,kw\n".to_vec());
        let form = HttpTransport::multipart_form(
            "{}".to_string(),
            "{}".to_string(),
            vec![("0".to_string(), &upload)],
        );
        assert!(form.is_ok());
    }

    #[test]
    fn test_endpoint_is_kept() {
        let transport =
            HttpTransport::new("http://localhost:4000/graphql", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:4000/graphql");
    }
}
