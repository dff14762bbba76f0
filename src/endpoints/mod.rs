use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::cache::{ResponseCache, ServerCaches};
use crate::config::ClientConfig;
use crate::integration::index::transport::{HttpTransport, IndexRequest, TransferProgress};
use crate::task::{Task, TaskHandle};
use crate::types::api::{Progress, ServerError};
use crate::types::models::mod_entity::{ModListResult, ModRecord};
use crate::types::models::mod_update::UpdateRecord;
use crate::types::query::ModsQuery;

pub mod mods;
pub mod tags;

type InFlight<K, V> = Arc<Mutex<HashMap<K, Task<V>>>>;
type ParseFn<V> = fn(Bytes) -> Result<V, ServerError>;

#[derive(Default)]
struct InFlightRequests {
    mods: InFlight<ModsQuery, ModListResult>,
    mod_by_id: InFlight<String, ModRecord>,
    logos: InFlight<String, Bytes>,
    tags: InFlight<(), BTreeSet<String>>,
    updates: InFlight<BTreeSet<String>, Vec<UpdateRecord>>,
}

/// Entry point for everything the index serves. Every call returns a
/// [`Task`] right away; the work runs on the runtime the client was created
/// on.
#[derive(Clone)]
pub struct ServerClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    caches: Arc<ServerCaches>,
    in_flight: Arc<InFlightRequests>,
    runtime: Handle,
}

impl ServerClient {
    /// Must be called from within a tokio runtime. Requests may be issued
    /// from any thread afterwards.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        caches: Arc<ServerCaches>,
    ) -> ServerClient {
        ServerClient {
            config,
            transport,
            caches,
            in_flight: Arc::default(),
            runtime: Handle::current(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn caches(&self) -> &ServerCaches {
        &self.caches
    }

    /// Drops cached responses. Tags are only dropped when `clear_global` is
    /// set.
    pub fn clear_server_caches(&self, clear_global: bool) {
        self.caches.clear(clear_global);
    }

    /// Cache hit, then an identical request already running, then a new
    /// request. With `use_cache` unset only the last applies, and the
    /// response still refreshes the cache.
    fn fetch<K, V>(
        &self,
        cache: &ResponseCache<K, V>,
        in_flight: &InFlight<K, V>,
        key: K,
        use_cache: bool,
        request: IndexRequest,
        parse: ParseFn<V>,
    ) -> Task<V>
    where
        K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        // tasks pick up the client's runtime, whichever thread calls this
        let _guard = self.runtime.enter();
        if use_cache {
            if let Some(value) = cache.get(&key) {
                return Task::resolved(Ok(value));
            }
        }

        let mut pending = in_flight.lock();
        pending.retain(|_, task| !task.is_finished());
        if use_cache {
            if let Some(task) = pending.get(&key).and_then(|t| t.mirror()) {
                log::debug!("Joining in-flight request for {:?}", key);
                return task;
            }
        }

        let source = self.dispatch(cache.clone(), in_flight.clone(), key.clone(), request, parse);
        // callers only ever get mirrors, so the request stops once all of
        // them cancel
        let task = source.mirror().unwrap_or_else(|| source.clone());
        pending.insert(key, source);
        task
    }

    fn dispatch<K, V>(
        &self,
        cache: ResponseCache<K, V>,
        in_flight: InFlight<K, V>,
        key: K,
        request: IndexRequest,
        parse: ParseFn<V>,
    ) -> Task<V>
    where
        K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let transport = self.transport.clone();
        Task::run(move |handle| async move {
            log::info!("Fetching {:?} {:?}", request.target, request.params);
            let result = send(transport.as_ref(), request, &handle)
                .await
                .and_then(parse);
            if let Err(e) = &result {
                log::error!("Request for {:?} failed: {}", key, e);
            }

            let cache_key = key.clone();
            handle.finish_with(result, |value| cache.insert(cache_key, value.clone()));
            in_flight.lock().retain(|_, task| !task.is_finished());
        })
    }
}

/// Sends `request`, relaying transfer progress to `handle`, and returns the
/// body of a successful response.
async fn send<T: Clone + Send + Sync>(
    transport: &dyn HttpTransport,
    request: IndexRequest,
    handle: &TaskHandle<T>,
) -> Result<Bytes, ServerError> {
    let on_progress =
        |p: TransferProgress| handle.progress(Progress::transfer(p.downloaded, p.total));
    let response = transport.send(request, &on_progress).await?;
    if !response.is_success() {
        return Err(ServerError::from_status(response.status, &response.body));
    }
    Ok(response.body)
}
