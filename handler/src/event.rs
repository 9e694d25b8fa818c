//! Inbound events and outbound envelopes.
//!
//! Both follow the API-gateway proxy shape: the event carries the HTTP method,
//! the matched route template, query parameters and a raw body string; the
//! envelope carries a string status code, a JSON body string and headers.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// An HTTP-like request event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    /// HTTP method, e.g. `POST`.
    #[serde(default)]
    pub http_method: Option<String>,

    /// Route template, e.g. `/rag/index-documents`.
    #[serde(default)]
    pub resource: String,

    /// Query string parameters; absent when the request had none.
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,

    /// Raw request body.
    #[serde(default)]
    pub body: Option<String>,
}

impl InboundEvent {
    /// Create an event for `method` on `resource`.
    pub fn new(method: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            http_method: Some(method.into()),
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a query string parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Look up a query string parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(key))
            .map(String::as_str)
    }
}

/// The transport envelope returned for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Status code as a string, e.g. `"200"`.
    pub status_code: String,

    /// JSON-serialized operation result.
    pub body: String,

    /// Response headers.
    pub headers: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_gateway_event() {
        let event: InboundEvent = serde_json::from_str(
            r#"{
                "httpMethod": "GET",
                "resource": "/rag/query",
                "path": "/rag/query",
                "queryStringParameters": {"query": "are cats mammals"},
                "body": null,
                "isBase64Encoded": false
            }"#,
        )
        .unwrap();

        assert_eq!(event.http_method.as_deref(), Some("GET"));
        assert_eq!(event.resource, "/rag/query");
        assert_eq!(event.query_param("query"), Some("are cats mammals"));
        assert_eq!(event.body, None);
    }

    #[test]
    fn test_missing_fields_default() {
        let event: InboundEvent = serde_json::from_str(r#"{"resource": "/rag/query"}"#).unwrap();
        assert_eq!(event.http_method, None);
        assert_eq!(event.query_param("query"), None);
    }

    #[test]
    fn test_envelope_field_names() {
        let envelope = Envelope {
            status_code: "200".to_string(),
            body: "{}".to_string(),
            headers: BTreeMap::new(),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["statusCode"], "200");
    }
}
