//! Mapping from (method, route template) to an operation.

use std::fmt;

/// Route template for document ingestion and index deletion.
pub const INDEX_DOCUMENTS: &str = "/rag/index-documents";

/// Route template for queries.
pub const QUERY: &str = "/rag/query";

/// The operation selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `POST /rag/index-documents`
    Ingest,
    /// `DELETE /rag/index-documents`
    Delete,
    /// `GET /rag/query`
    Query,
    /// Anything else.
    Unknown,
}

impl Route {
    /// Every supported route, as (method, template, route).
    pub const SUPPORTED: [(&'static str, &'static str, Route); 3] = [
        ("POST", INDEX_DOCUMENTS, Route::Ingest),
        ("DELETE", INDEX_DOCUMENTS, Route::Delete),
        ("GET", QUERY, Route::Query),
    ];

    /// Select the route for `method` on `resource`. Matching is exact.
    pub fn resolve(method: &str, resource: &str) -> Self {
        match (method, resource) {
            ("POST", INDEX_DOCUMENTS) => Self::Ingest,
            ("DELETE", INDEX_DOCUMENTS) => Self::Delete,
            ("GET", QUERY) => Self::Query,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ingest => "ingest",
            Self::Delete => "delete",
            Self::Query => "query",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Log key for a request, e.g. `POST/rag/index-documents`.
pub fn api_key(method: &str, resource: &str) -> String {
    format!("{method}{resource}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_supported_routes_resolve() {
        for (method, resource, route) in Route::SUPPORTED {
            assert_eq!(Route::resolve(method, resource), route);
        }
    }

    #[test]
    fn test_unknown_routes() {
        assert_eq!(Route::resolve("PATCH", QUERY), Route::Unknown);
        assert_eq!(Route::resolve("GET", INDEX_DOCUMENTS), Route::Unknown);
        assert_eq!(Route::resolve("", QUERY), Route::Unknown);
        assert_eq!(Route::resolve("get", QUERY), Route::Unknown);
        assert_eq!(Route::resolve("GET", "/rag/query/"), Route::Unknown);
    }

    #[test]
    fn test_api_key() {
        assert_eq!(api_key("POST", INDEX_DOCUMENTS), "POST/rag/index-documents");
    }
}
