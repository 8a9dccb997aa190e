//! HTTP transport to the remote file-manager API.
//!
//! [`Transport`] is the seam between the manager and the network. The
//! production implementation, [`HttpTransport`], runs on `reqwest`; tests
//! substitute scripted transports.
//!
//! Every response is classified once into a [`Payload`] and every failure is
//! normalized once into a [`TransportError`] here, so callers never inspect
//! raw HTTP responses.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use fm_protocol::{
    ApiRequest, FailureParts, Method, Payload, RequestBody, TransportError, TransportErrorKind,
    UPLOAD_TYPE, WORKING_DIR,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use tracing::debug;
use url::Url;

use crate::credentials::{CredentialBackend, CredentialError, TokenStore};

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "upload";

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// A client for the file-manager endpoints.
pub trait Transport: Send + Sync {
    /// Send a request and classify its body.
    ///
    /// Non-2xx responses are returned as errors. Authentication is attached
    /// by the transport.
    fn send(&self, request: ApiRequest) -> TransportFuture<'_, Payload>;

    /// Fetch raw bytes, bypassing payload classification.
    fn fetch_binary(&self, request: ApiRequest) -> TransportFuture<'_, Bytes>;

    /// Base URL the endpoint paths are resolved against.
    fn base_url(&self) -> &Url;
}

/// [`Transport`] over `reqwest`.
pub struct HttpTransport<B: CredentialBackend> {
    client: reqwest::Client,
    base_url: Url,
    tokens: TokenStore<B>,
}

impl<B: CredentialBackend> HttpTransport<B> {
    /// Create a transport.
    ///
    /// `timeout` of `None` lets requests run until the server answers.
    pub fn new(
        base_url: Url,
        tokens: TokenStore<B>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// The token store used for authentication.
    pub fn tokens(&self) -> &TokenStore<B> {
        &self.tokens
    }

    fn bearer(&self) -> Result<Option<String>, TransportError> {
        self.tokens
            .bearer_header()
            .map_err(|e| TransportError::request(e.to_string()))
    }

    fn build(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let url = request
            .url(&self.base_url)
            .map_err(|e| TransportError::request(e.to_string()))?;

        debug!("{:?} {}", request.endpoint.method(), url.path());

        let builder = match request.endpoint.method() {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        match &request.body {
            RequestBody::Empty => Ok(builder),
            RequestBody::Upload { file, working_dir } => {
                let mut part = Part::bytes(file.content.to_vec()).file_name(file.name.clone());
                if let Some(mime) = &file.mime {
                    part = part
                        .mime_str(mime)
                        .map_err(|e| TransportError::request(format!("invalid mime type: {}", e)))?;
                }
                let form = Form::new()
                    .part(UPLOAD_FIELD, part)
                    .text(WORKING_DIR, working_dir.clone())
                    .text("type", UPLOAD_TYPE);
                Ok(builder.multipart(form))
            }
        }
    }

    /// Send a prepared request, returning the content type and body of a 2xx
    /// response.
    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<(Option<String>, Bytes), TransportError> {
        let response = builder.send().await.map_err(from_reqwest)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(from_reqwest)?;

        if !status.is_success() {
            debug!("Request failed with status {}", status);
            return Err(TransportError::normalize(FailureParts {
                status: Some(status.as_u16()),
                body: Some(String::from_utf8_lossy(&body).into_owned()),
                message: status.to_string(),
                kind_hint: None,
            }));
        }

        Ok((content_type, body))
    }
}

impl<B: CredentialBackend> Transport for HttpTransport<B> {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_, Payload> {
        Box::pin(async move {
            let mut builder = self.build(&request)?;
            if let Some(bearer) = self.bearer()? {
                builder = builder.header(AUTHORIZATION, bearer);
            }
            let (content_type, body) = self.execute(builder).await?;
            Ok(Payload::classify(content_type.as_deref(), body))
        })
    }

    fn fetch_binary(&self, request: ApiRequest) -> TransportFuture<'_, Bytes> {
        Box::pin(async move {
            let builder = self.build(&request)?;
            let token = match self.tokens.get_token() {
                Ok(token) => Some(token),
                Err(CredentialError::NotFound(_)) => None,
                Err(e) => return Err(TransportError::request(e.to_string())),
            };
            let builder = match token {
                Some(token) => builder.bearer_auth(token),
                None => {
                    debug!("No API token stored, downloading without authentication");
                    builder
                }
            };
            let (_, body) = self.execute(builder).await?;
            Ok(body)
        })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Normalize a `reqwest` failure.
fn from_reqwest(err: reqwest::Error) -> TransportError {
    let kind_hint = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_builder() {
        TransportErrorKind::Request
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Network
    };
    let status = err.status().map(|s| s.as_u16());

    // The URL may carry a port that reads like a status code.
    TransportError::normalize(FailureParts {
        status,
        body: None,
        message: err.without_url().to_string(),
        kind_hint: Some(kind_hint),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentials;

    fn transport() -> HttpTransport<MemoryCredentials> {
        HttpTransport::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            TokenStore::new(MemoryCredentials::new()),
            Some(Duration::from_secs(2)),
        )
        .unwrap()
    }

    #[test]
    fn test_build_get_request() {
        let transport = transport();
        let request = transport
            .build(&ApiRequest::list("/photos"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:9/api/file-manager/jsonitems?working_dir=%2Fphotos"
        );
    }

    #[test]
    fn test_build_upload_request_is_multipart() {
        let transport = transport();
        let file = fm_protocol::UploadFile::new("menu.pdf", b"%PDF".to_vec())
            .with_mime("application/pdf");
        let request = transport
            .build(&ApiRequest::upload(file, "/menus"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        let content_type = request.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
    }

    #[test]
    fn test_build_rejects_bad_mime() {
        let transport = transport();
        let file = fm_protocol::UploadFile::new("x", b"x".to_vec()).with_mime("not a mime");
        let err = transport.build(&ApiRequest::upload(file, "/")).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Request);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let transport = transport();
        let err = transport.send(ApiRequest::list("/")).await.unwrap_err();
        assert!(matches!(
            err.kind,
            TransportErrorKind::Network | TransportErrorKind::Timeout
        ));
        assert_eq!(err.http_status, None);
    }
}
