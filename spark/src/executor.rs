use crate::domain::{OutgoingBody, PreparedRequest, RequestBody, ResourceRequest};
use crate::ports::Transport;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use shared::{Failure, FetchResult};
use std::sync::Arc;
use tracing::debug;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Issues single calls and classifies their outcome. Holds no state between calls.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Serializes the body and resolves headers.
    ///
    /// JSON bodies get `Content-Type: application/json` unless the caller set a
    /// content type; binary and multipart bodies go out untouched.
    pub fn prepare(request: &ResourceRequest) -> FetchResult<PreparedRequest> {
        let mut headers = Vec::with_capacity(request.headers.len() + 1);
        let caller_content_type = request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE));

        let body = match &request.body {
            None => OutgoingBody::Empty,
            Some(RequestBody::Json(value)) => {
                if !caller_content_type {
                    headers.push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
                }
                let encoded = serde_json::to_vec(value).map_err(|e| {
                    Failure::unknown(format!("failed to serialize request body: {e}"))
                })?;
                OutgoingBody::Bytes(Bytes::from(encoded))
            }
            Some(RequestBody::Binary(bytes)) => OutgoingBody::Bytes(bytes.clone()),
            Some(RequestBody::Multipart(parts)) => OutgoingBody::Multipart(parts.clone()),
        };
        headers.extend(request.headers.iter().cloned());

        Ok(PreparedRequest {
            method: request.method,
            path: request.path.clone(),
            headers,
            body,
        })
    }

    /// Sends the request and returns the body of a 2xx response.
    pub async fn execute_raw(&self, request: &ResourceRequest) -> FetchResult<Bytes> {
        let prepared = Self::prepare(request)?;
        debug!("{} {}", prepared.method, prepared.path);

        let response = self.transport.send(prepared).await?;
        if response.is_success() {
            return Ok(response.body);
        }

        let failure = Failure::from_response(response.status, &response.reason, &response.body);
        debug!("{} {} failed: {}", request.method, request.path, failure);
        Err(failure)
    }

    /// Sends the request and decodes the JSON body of a 2xx response.
    pub async fn execute<T: DeserializeOwned>(&self, request: &ResourceRequest) -> FetchResult<T> {
        let body = self.execute_raw(request).await?;
        decode(&body)
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transport", &"<dyn Transport>")
            .finish()
    }
}

/// Decodes a success body. An empty body reads as JSON `null`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> FetchResult<T> {
    let result = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    result.map_err(|e| Failure::unknown(format!("invalid response body: {e}")))
}
