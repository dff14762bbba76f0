//! Client for the Geode mod index: mod search, mod details, logos, tags and
//! update checks, each exposed as a cancellable [`task::Task`] backed by
//! in-memory response caches.

pub mod cache;
pub mod config;
pub mod endpoints;
pub mod integration;
pub mod logging;
pub mod task;
pub mod types;

pub use cache::{CacheConfig, ServerCaches};
pub use config::ClientConfig;
pub use endpoints::ServerClient;
pub use integration::index::{HttpTransport, ReqwestTransport};
pub use task::{Task, TaskEvent, TaskStatus};
pub use types::api::{Progress, ServerError};
