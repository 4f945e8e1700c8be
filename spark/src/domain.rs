use bytes::Bytes;
use serde::Serialize;
use shared::{Failure, FetchResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Identity of a cacheable read: an ordered, immutable list of parts.
///
/// Two keys are equal iff their parts are element-wise equal. A key is
/// matched by an invalidation prefix when the prefix's parts are a leading
/// run of its own parts; the empty key matches everything.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(Arc<[String]>);

impl ResourceKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// The empty key, a prefix of every key.
    pub fn root() -> Self {
        Self(Arc::from(Vec::<String>::new()))
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &ResourceKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// A new key with `part` appended.
    pub fn child(&self, part: impl Into<String>) -> Self {
        let mut parts = self.0.to_vec();
        parts.push(part.into());
        Self(parts.into())
    }

    /// Joins the parts into a request path, so a key can address its own GET.
    pub fn to_path(&self) -> String {
        let mut path = String::new();
        for (index, part) in self.0.iter().enumerate() {
            let trimmed = if index == 0 {
                part.trim_end_matches('/')
            } else {
                part.trim_matches('/')
            };
            if index > 0 {
                path.push('/');
            }
            path.push_str(trimmed);
        }
        path
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<S: Into<String>> From<Vec<S>> for ResourceKey {
    fn from(parts: Vec<S>) -> Self {
        Self::new(parts)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for ResourceKey {
    fn from(parts: [S; N]) -> Self {
        Self::new(parts)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a multipart form.
#[derive(Clone, Debug, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: Bytes::from(value),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type,
            data: data.into(),
        }
    }
}

/// Body of an outbound call before serialization.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Structured data, sent as JSON text.
    Json(serde_json::Value),
    /// Raw bytes, sent as-is.
    Binary(Bytes),
    /// A multipart form, sent as-is; the transport supplies the boundary.
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> FetchResult<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| Failure::unknown(format!("failed to serialize request body: {e}")))
    }

    /// Raw payloads keep whatever content type the transport gives them.
    pub fn is_raw(&self) -> bool {
        !matches!(self, RequestBody::Json(_))
    }
}

/// Descriptor of one call against the resource API.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
}

impl ResourceRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> FetchResult<Self> {
        Ok(self.with_body(RequestBody::json(value)?))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Serialized body handed to a transport.
#[derive(Clone, Debug, PartialEq)]
pub enum OutgoingBody {
    Empty,
    Bytes(Bytes),
    Multipart(Vec<FormPart>),
}

/// A request after body serialization and header resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: OutgoingBody,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back over the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            reason: String::new(),
            body: body.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Last successful value for a key. Replaced wholesale, never patched.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fresh: bool,
    pub fetched_at: Instant,
}

impl<V: Clone> CacheEntry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            fresh: true,
            fetched_at: Instant::now(),
        }
    }

    /// A copy of this entry marked stale.
    pub fn to_stale(&self) -> Self {
        Self {
            value: self.value.clone(),
            fresh: false,
            fetched_at: self.fetched_at,
        }
    }

    /// Fresh entries short-circuit reads. With no `stale_after` an entry stays
    /// fresh until invalidated.
    pub fn is_fresh(&self, stale_after: Option<Duration>) -> bool {
        if !self.fresh {
            return false;
        }
        match stale_after {
            Some(window) => self.fetched_at.elapsed() < window,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_equality_is_element_wise() {
        let a = ResourceKey::new(["documents", "user-42"]);
        let b = ResourceKey::from(vec!["documents".to_string(), "user-42".to_string()]);
        let c = ResourceKey::new(["documents", "user-43"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, ResourceKey::new(["documents/user-42"]));
    }

    #[test]
    fn test_key_prefix_matching() {
        let key = ResourceKey::new(["/api/users", "42", "documents"]);
        assert!(key.starts_with(&ResourceKey::new(["/api/users"])));
        assert!(key.starts_with(&ResourceKey::new(["/api/users", "42"])));
        assert!(key.starts_with(&key));
        assert!(key.starts_with(&ResourceKey::root()));
        assert!(!key.starts_with(&ResourceKey::new(["/api/users", "4"])));
        assert!(!ResourceKey::new(["/api/users"]).starts_with(&key));
    }

    #[test]
    fn test_key_to_path() {
        let key = ResourceKey::new(["/api/users", "42", "documents"]);
        assert_eq!(key.to_path(), "/api/users/42/documents");
        assert_eq!(key.child("7").to_path(), "/api/users/42/documents/7");
        assert_eq!(ResourceKey::new(["/api/quizzes/", "/3/"]).to_path(), "/api/quizzes/3");
    }

    #[test]
    fn test_key_display() {
        let key = ResourceKey::new(["documents", "user-42"]);
        assert_eq!(key.to_string(), "[documents, user-42]");
        assert_eq!(format!("{:?}", key), "[\"documents\", \"user-42\"]");
    }

    #[test]
    fn test_prepared_header_lookup_is_case_insensitive() {
        let request = PreparedRequest {
            method: Method::Post,
            path: "/api/documents".to_string(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("content-type".to_string(), "text/plain".to_string()),
            ],
            body: OutgoingBody::Empty,
        };
        assert_eq!(request.header("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(request.header("accept"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_freshness() {
        let entry = CacheEntry::new(5u32);
        assert!(entry.is_fresh(None));
        assert!(!entry.to_stale().is_fresh(None));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(entry.is_fresh(None));
        assert!(entry.is_fresh(Some(Duration::from_secs(11))));
        assert!(!entry.is_fresh(Some(Duration::from_secs(5))));
    }
}
