use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use url::Url;

use crate::types::api::ServerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// Relative to the index base URL, e.g. `v1/mods`.
    Path(String),
    Absolute(Url),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRequest {
    pub method: Method,
    pub target: RequestTarget,
    pub params: Vec<(String, String)>,
}

impl IndexRequest {
    pub fn get(path: impl Into<String>) -> IndexRequest {
        IndexRequest {
            method: Method::GET,
            target: RequestTarget::Path(path.into()),
            params: vec![],
        }
    }

    pub fn get_absolute(url: Url) -> IndexRequest {
        IndexRequest {
            method: Method::GET,
            target: RequestTarget::Absolute(url),
            params: vec![],
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> IndexRequest {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> IndexRequest {
        self.params.extend(params);
        self
    }
}

#[derive(Debug, Clone)]
pub struct IndexResponse {
    pub status: u16,
    pub body: Bytes,
}

impl IndexResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

pub type ProgressFn<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Moves bytes between the client and the index. Any completed exchange is
/// an `Ok`, whatever its status; only transport failures are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: IndexRequest,
        on_progress: ProgressFn<'_>,
    ) -> Result<IndexResponse, ServerError>;
}
