//! [`HttpSend`] over `reqwest`.
//!
//! ```no_run
//! use handsign_core::Context;
//! use handsign_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::new(reqwest::Client::new()));
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use handsign_core::{Error, HttpSend, Result};
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// Sends requests with a shared `reqwest::Client`.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let target = format!("{} {}", req.method(), req.uri());

        let req = Request::try_from(req).map_err(|e| {
            Error::request_invalid(format!("failed to convert request {target}")).with_source(e)
        })?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::unexpected(format!("failed to send {target}")).with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| {
                Error::unexpected(format!("failed to read response body of {target}"))
                    .with_source(e)
            })?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
