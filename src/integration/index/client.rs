use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder};
use url::Url;

use crate::config::ClientConfig;
use crate::types::api::ServerError;

use super::transport::{
    HttpTransport, IndexRequest, IndexResponse, ProgressFn, RequestTarget, TransferProgress,
};

/// reqwest-backed transport for the index API.
pub struct ReqwestTransport {
    req_client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<ReqwestTransport, ServerError> {
        let req_client = Client::builder()
            .user_agent(config.user_agent())
            .timeout(config.timeout())
            .build()?;

        Ok(ReqwestTransport {
            req_client,
            base_url: config.base_url().clone(),
        })
    }

    fn build(&self, method: Method, target: &RequestTarget) -> Result<RequestBuilder, ServerError> {
        let (url, accept) = match target {
            RequestTarget::Path(path) => (
                self.base_url
                    .join(path)
                    .map_err(|e| ServerError::Transport(format!("Invalid path {}: {}", path, e)))?,
                Some(HeaderValue::from_static("application/json")),
            ),
            RequestTarget::Absolute(url) => (url.clone(), None),
        };

        let mut request_builder = self.req_client.request(method, url);
        if let Some(accept) = accept {
            request_builder = request_builder.header(ACCEPT, accept);
        }
        Ok(request_builder)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: IndexRequest,
        on_progress: ProgressFn<'_>,
    ) -> Result<IndexResponse, ServerError> {
        let mut builder = self.build(request.method.clone(), &request.target)?;
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        let mut response = builder.send().await.inspect_err(|e| {
            log::error!("{} {:?} failed: {}", request.method, request.target, e)
        })?;
        let status = response.status().as_u16();
        let total = response.content_length();

        let mut body = BytesMut::with_capacity(total.unwrap_or(0).min(16 * 1024 * 1024) as usize);
        on_progress(TransferProgress {
            downloaded: 0,
            total,
        });
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            on_progress(TransferProgress {
                downloaded: body.len() as u64,
                total,
            });
        }

        log::debug!(
            "{} {:?} -> {} ({} bytes)",
            request.method,
            request.target,
            status,
            body.len()
        );
        Ok(IndexResponse {
            status,
            body: body.freeze(),
        })
    }
}
