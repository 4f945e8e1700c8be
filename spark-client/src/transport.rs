use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use shared::config::ClientConfig;
use spark::{FormPart, Method, OutgoingBody, PreparedRequest, RawResponse, Transport, TransportError};
use tracing::{debug, warn};

/// reqwest-backed transport. Session cookies set by the server are kept in
/// the client's jar and sent with every later request.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let url = self.url(&request.path);
        let mut builder = self.client.request(to_reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            OutgoingBody::Empty => builder,
            OutgoingBody::Bytes(bytes) => builder.body(bytes),
            OutgoingBody::Multipart(parts) => builder.multipart(to_form(parts)?),
        };

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed: {}", request.method, url, e);
            to_transport_error(e)
        })?;
        let status = response.status();
        debug!("{} {} -> {}", request.method, url, status);

        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.bytes().await.map_err(to_transport_error)?;
        Ok(RawResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn to_form(parts: Vec<FormPart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        let mut field = Part::bytes(part.data.to_vec());
        if let Some(file_name) = part.file_name {
            field = field.file_name(file_name);
        }
        if let Some(content_type) = part.content_type {
            field = field.mime_str(&content_type).map_err(|e| {
                TransportError::Request(format!("invalid content type {content_type}: {e}"))
            })?;
        }
        form = form.part(part.name, field);
    }
    Ok(form)
}

fn to_transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::Request(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
